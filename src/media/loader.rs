use std::path::{Path, PathBuf};

use image::{io::Reader as ImageReader, DynamicImage, RgbImage};
use tracing::{debug, warn};

use crate::error::{ConfigError, MediaError, Result};
use crate::media::types::Image;

/// Reads and writes still images
///
/// Loading tries the decoder implied by the file extension first and falls
/// back to sniffing the format from the file contents, so mislabelled files
/// (a PNG saved as `.jpg`, for instance) still load.
pub struct MediaLoader;

impl MediaLoader {
    /// Load an image file as a BGR [`Image`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Image> {
        let path = path.as_ref();

        let rgb = match Self::decode_by_extension(path) {
            Ok(rgb) => rgb,
            Err(primary) => {
                debug!("Extension decoder failed for {:?} ({}), sniffing content", path, primary);
                Self::decode_by_content(path).map_err(|fallback| {
                    warn!("Could not decode {:?}: {}", path, fallback);
                    MediaError::LoadFailed {
                        path: path.display().to_string(),
                        reason: format!("{}; fallback: {}", primary, fallback),
                    }
                })?
            }
        };

        Ok(Image::from_rgb_image(rgb).to_bgr())
    }

    fn decode_by_extension(path: &Path) -> std::result::Result<RgbImage, image::ImageError> {
        let image = image::open(path)?;
        Ok(match image {
            DynamicImage::ImageRgb8(img) => img,
            other => other.to_rgb8(),
        })
    }

    fn decode_by_content(path: &Path) -> std::result::Result<RgbImage, image::ImageError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(image.to_rgb8())
    }

    /// Write an image to disk; the format follows the file extension
    pub fn save<P: AsRef<Path>>(image: &Image, path: P) -> Result<()> {
        let path = path.as_ref();
        image
            .clone()
            .into_rgb_image()
            .save(path)
            .map_err(|e| MediaError::SaveFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Check a path's extension against an allow-list, ignoring case
    pub fn is_image_file<P: AsRef<Path>>(path: P, extensions: &[String]) -> bool {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) => extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// List image files directly inside `directory`
    ///
    /// Hidden files are ignored. With `sort` the result is ordered by file
    /// name; otherwise it follows the platform's directory order.
    pub fn list_images<P: AsRef<Path>>(
        directory: P,
        extensions: &[String],
        sort: bool,
    ) -> Result<Vec<PathBuf>> {
        let directory = directory.as_ref();

        if !directory.is_dir() {
            return Err(ConfigError::DirectoryNotFound {
                path: directory.display().to_string(),
            }.into());
        }

        let mut images = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            if path.is_file() && !Self::is_hidden_file(&path) && Self::is_image_file(&path, extensions) {
                images.push(path);
            }
        }

        if sort {
            images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        }

        debug!("Found {} image(s) in {:?}", images.len(), directory);
        Ok(images)
    }

    fn is_hidden_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
    }
}
