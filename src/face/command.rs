use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, Result};
use crate::face::engine::FaceEngine;
use crate::face::types::{FaceDetection, SourceFace};
use crate::media::{Image, MediaLoader};

/// [`FaceEngine`] backed by an external inference program
///
/// Images travel as PNG files in a private scratch directory and detections
/// as JSON:
///
/// ```text
/// <program> <args..> detect <image.png>                                   -> JSON array on stdout
/// <program> <args..> swap <image.png> <target.json> <source.json> <out.png>
/// ```
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    scratch: TempDir,
    counter: AtomicU64,
}

impl CommandEngine {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>) -> Result<Self> {
        let program = program.into();
        let scratch = tempfile::Builder::new().prefix("face_swap_engine_").tempdir()?;

        info!("Using external face engine {:?}", program);
        Ok(Self {
            program,
            args,
            scratch,
            counter: AtomicU64::new(0),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let program = config.command.clone().ok_or_else(|| ConfigError::InvalidValue {
            key: "engine.command".to_string(),
            value: "<unset>".to_string(),
        })?;
        Self::new(program, config.args.clone())
    }

    fn scratch_path(&self, stem: &str, extension: &str) -> PathBuf {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        self.scratch.path().join(format!("{}_{:06}.{}", stem, id, extension))
    }

    /// Run one engine verb and return its stdout
    fn run(&self, verb: &str, files: &[&Path]) -> std::result::Result<Vec<u8>, String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(verb)
            .args(files)
            .stdin(Stdio::null());

        debug!("Running {:?} {}", self.program, verb);
        let output = cmd
            .output()
            .map_err(|e| format!("failed to start {}: {}", self.program.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} exited with {}: {}", verb, output.status, stderr.trim()));
        }

        Ok(output.stdout)
    }

    fn write_json(&self, stem: &str, face: &FaceDetection) -> std::result::Result<PathBuf, String> {
        let path = self.scratch_path(stem, "json");
        let json = serde_json::to_vec(face).map_err(|e| e.to_string())?;
        std::fs::write(&path, json).map_err(|e| e.to_string())?;
        Ok(path)
    }

    fn swap_via_files(
        &self,
        image: &Image,
        target: &FaceDetection,
        source: &SourceFace,
        scratch_files: &mut Vec<PathBuf>,
    ) -> std::result::Result<Image, String> {
        let input = self.scratch_path("swap_in", "png");
        scratch_files.push(input.clone());
        MediaLoader::save(image, &input).map_err(|e| e.to_string())?;

        let target_json = self.write_json("target", target)?;
        scratch_files.push(target_json.clone());
        let source_json = self.write_json("source", source.detection())?;
        scratch_files.push(source_json.clone());

        let output = self.scratch_path("swap_out", "png");
        scratch_files.push(output.clone());

        self.run("swap", &[&input, &target_json, &source_json, &output])?;
        MediaLoader::load(&output).map_err(|e| e.to_string())
    }

    fn remove_all(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl FaceEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    fn detect(&self, image: &Image) -> std::result::Result<Vec<FaceDetection>, EngineError> {
        let input = self.scratch_path("detect", "png");
        let result = MediaLoader::save(image, &input)
            .map_err(|e| e.to_string())
            .and_then(|_| self.run("detect", &[&input]))
            .and_then(|stdout| serde_json::from_slice::<Vec<FaceDetection>>(&stdout).map_err(|e| e.to_string()));
        Self::remove_all(&[input]);

        result.map_err(|reason| EngineError::DetectionFailed { reason })
    }

    fn swap(
        &self,
        image: Image,
        target: &FaceDetection,
        source: &SourceFace,
    ) -> std::result::Result<Image, EngineError> {
        let mut scratch_files = Vec::with_capacity(4);
        let result = self.swap_via_files(&image, target, source, &mut scratch_files);
        Self::remove_all(&scratch_files);

        result.map_err(|reason| EngineError::SwapFailed { reason })
    }
}
