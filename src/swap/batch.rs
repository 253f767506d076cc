use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::error::{ConfigError, Result};
use crate::face::{composite_faces, FaceEngine, SelectionPolicy, SourceFace};
use crate::media::MediaLoader;

/// What happened to one target file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Swapped { face_count: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

/// Per-file record of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub filename: String,
    pub status: ItemStatus,
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ItemStatus::Swapped { face_count } => write!(f, "{}: swapped {} face(s)", self.filename, face_count),
            ItemStatus::Skipped { reason } => write!(f, "{}: skipped ({})", self.filename, reason),
            ItemStatus::Failed { reason } => write!(f, "{}: failed ({})", self.filename, reason),
        }
    }
}

/// Totals over a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub swapped: usize,
    pub skipped: usize,
    pub failed: usize,
    pub faces_swapped: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            match outcome.status {
                ItemStatus::Swapped { face_count } => {
                    summary.swapped += 1;
                    summary.faces_swapped += face_count;
                }
                ItemStatus::Skipped { .. } => summary.skipped += 1,
                ItemStatus::Failed { .. } => summary.failed += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.swapped + self.skipped + self.failed
    }
}

/// Swaps one source face into every image of a directory
///
/// The source face is the first detection in the first image of the source
/// directory. Each target file is handled independently: a file that cannot
/// be read or swapped is recorded as failed and the run moves on.
pub struct BatchRunner<'a> {
    engine: &'a dyn FaceEngine,
    config: BatchConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a dyn FaceEngine, config: BatchConfig) -> Self {
        Self { engine, config }
    }

    /// Process every image in `input_dir` and write results to `output_dir`
    ///
    /// Only setup problems (no source image, no source face, no input images)
    /// are returned as errors; per-file problems end up in the outcome list.
    pub fn run<P: AsRef<Path>>(
        &self,
        input_dir: P,
        source_dir: P,
        output_dir: P,
    ) -> Result<Vec<BatchOutcome>> {
        let input_dir = input_dir.as_ref();
        let source_dir = source_dir.as_ref();
        let output_dir = output_dir.as_ref();

        info!("Starting batch face swap");
        info!("   Input: {:?}", input_dir);
        info!("   Source: {:?}", source_dir);
        info!("   Output: {:?}", output_dir);

        let source_face = self.load_source_face(source_dir)?;

        let targets = self.list_required(input_dir)?;
        std::fs::create_dir_all(output_dir)?;

        info!("Found {} image(s) to process", targets.len());

        let mut outcomes = Vec::with_capacity(targets.len());
        for (index, path) in targets.iter().enumerate() {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            debug!("[{}/{}] Processing: {}", index + 1, targets.len(), filename);

            let status = match self.process_item(path, &filename, &source_face, output_dir) {
                Ok(status) => status,
                Err(e) => {
                    warn!("Error processing {}: {}", filename, e);
                    ItemStatus::Failed { reason: e.to_string() }
                }
            };

            let outcome = BatchOutcome { filename, status };
            info!("   {}", outcome);
            outcomes.push(outcome);
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            "Batch complete: {} swapped, {} skipped, {} failed ({} faces)",
            summary.swapped, summary.skipped, summary.failed, summary.faces_swapped
        );

        Ok(outcomes)
    }

    fn list_required(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let images = MediaLoader::list_images(directory, &self.config.extensions, self.config.sort_entries)?;
        if images.is_empty() {
            return Err(ConfigError::NoImagesFound {
                path: directory.display().to_string(),
            }.into());
        }
        Ok(images)
    }

    fn load_source_face(&self, source_dir: &Path) -> Result<SourceFace> {
        let candidates = self.list_required(source_dir)?;
        let source_path = &candidates[0];
        info!("Loading source face from: {:?}", source_path);

        let source = MediaLoader::load(source_path)?;
        let detections = self.engine.detect(&source)?;

        SelectionPolicy::FirstDetected
            .select(&detections)
            .ok_or_else(|| ConfigError::NoSourceFace {
                path: source_path.display().to_string(),
            }.into())
    }

    fn process_item(
        &self,
        path: &Path,
        filename: &str,
        source_face: &SourceFace,
        output_dir: &Path,
    ) -> Result<ItemStatus> {
        let target = MediaLoader::load(path)?;

        let faces = self.engine.detect(&target)?;
        if faces.is_empty() {
            return Ok(ItemStatus::Skipped {
                reason: "no faces detected".to_string(),
            });
        }

        let result = composite_faces(self.engine, target, &faces, source_face)?;

        let output_path = output_dir.join(format!("{}{}", self.config.output_prefix, filename));
        MediaLoader::save(&result, &output_path)?;

        Ok(ItemStatus::Swapped { face_count: faces.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaceSwapError;
    use crate::face::testing::{ScriptedEngine, FAIL_DETECTION};
    use tempfile::tempdir;

    fn write_image(dir: &Path, name: &str, faces: u8) {
        ScriptedEngine::image_with_faces(16, 12, faces)
            .into_rgb_image()
            .save(dir.join(name))
            .unwrap();
    }

    struct Dirs {
        _root: tempfile::TempDir,
        input: PathBuf,
        source: PathBuf,
        output: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = tempdir().unwrap();
        let input = root.path().join("input");
        let source = root.path().join("source");
        let output = root.path().join("output");
        std::fs::create_dir(&input).unwrap();
        std::fs::create_dir(&source).unwrap();
        Dirs { _root: root, input, source, output }
    }

    #[test]
    fn test_swapped_and_skipped_counts() {
        let d = dirs();
        write_image(&d.source, "face.png", 1);
        write_image(&d.input, "one.png", 1);
        write_image(&d.input, "two.PNG", 2);
        write_image(&d.input, "empty_a.png", 0);
        write_image(&d.input, "empty_b.png", 0);
        std::fs::write(d.input.join("readme.txt"), b"ignored").unwrap();

        let engine = ScriptedEngine::pixel_coded();
        let runner = BatchRunner::new(&engine, BatchConfig::default());
        let outcomes = runner.run(&d.input, &d.source, &d.output).unwrap();

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.swapped, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.faces_swapped, 3);

        assert!(d.output.join("swapped_one.png").exists());
        assert!(d.output.join("swapped_two.PNG").exists());
        assert!(!d.output.join("swapped_empty_a.png").exists());
    }

    #[test]
    fn test_bad_items_do_not_abort_batch() {
        let d = dirs();
        write_image(&d.source, "face.png", 1);
        write_image(&d.input, "a_good.png", 1);
        std::fs::write(d.input.join("b_corrupt.jpg"), b"not a jpeg").unwrap();
        write_image(&d.input, "c_engine_fails.png", FAIL_DETECTION);
        write_image(&d.input, "d_good.png", 2);

        let engine = ScriptedEngine::pixel_coded();
        let outcomes = BatchRunner::new(&engine, BatchConfig::default())
            .run(&d.input, &d.source, &d.output)
            .unwrap();

        let statuses: Vec<_> = outcomes.iter().map(|o| o.status.clone()).collect();
        assert_eq!(statuses[0], ItemStatus::Swapped { face_count: 1 });
        assert!(matches!(statuses[1], ItemStatus::Failed { .. }));
        assert!(matches!(statuses[2], ItemStatus::Failed { .. }));
        assert_eq!(statuses[3], ItemStatus::Swapped { face_count: 2 });
    }

    #[test]
    fn test_first_sorted_source_image_is_used() {
        let d = dirs();
        // b.png would fail detection; a.png sorts first and has a face.
        write_image(&d.source, "b.png", FAIL_DETECTION);
        write_image(&d.source, "a.png", 1);
        write_image(&d.input, "target.png", 1);

        let engine = ScriptedEngine::pixel_coded();
        let outcomes = BatchRunner::new(&engine, BatchConfig::default())
            .run(&d.input, &d.source, &d.output)
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, ItemStatus::Swapped { face_count: 1 });
    }

    #[test]
    fn test_empty_source_directory() {
        let d = dirs();
        write_image(&d.input, "target.png", 1);

        let engine = ScriptedEngine::pixel_coded();
        let err = BatchRunner::new(&engine, BatchConfig::default())
            .run(&d.input, &d.source, &d.output)
            .unwrap_err();
        assert!(matches!(err, FaceSwapError::Config(ConfigError::NoImagesFound { .. })));
    }

    #[test]
    fn test_source_without_face() {
        let d = dirs();
        write_image(&d.source, "face.png", 0);
        write_image(&d.input, "target.png", 1);

        let engine = ScriptedEngine::pixel_coded();
        let err = BatchRunner::new(&engine, BatchConfig::default())
            .run(&d.input, &d.source, &d.output)
            .unwrap_err();
        assert!(matches!(err, FaceSwapError::Config(ConfigError::NoSourceFace { .. })));
    }

    #[test]
    fn test_empty_input_directory() {
        let d = dirs();
        write_image(&d.source, "face.png", 1);

        let engine = ScriptedEngine::pixel_coded();
        let err = BatchRunner::new(&engine, BatchConfig::default())
            .run(&d.input, &d.source, &d.output)
            .unwrap_err();
        assert!(matches!(err, FaceSwapError::Config(ConfigError::NoImagesFound { .. })));
        assert!(!d.output.exists());
    }

    #[test]
    fn test_batch_uses_first_detection_not_largest() {
        let d = dirs();
        write_image(&d.source, "face.png", 3);
        write_image(&d.input, "target.png", 1);

        let engine = ScriptedEngine::pixel_coded();
        let runner = BatchRunner::new(&engine, BatchConfig::default());
        let source_face = runner.load_source_face(&d.source).unwrap();

        // Scripted detections grow with their index, so the first is the smallest.
        assert_eq!(source_face.detection().bbox.x0, 0.0);
        assert_eq!(source_face.detection().area(), 25.0);
    }
}
