use std::fmt;

use thiserror::Error;

/// Which side of a swap an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceRole {
    Source,
    Target,
}

impl fmt::Display for FaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Main error type for the face swap pipeline
#[derive(Error, Debug)]
pub enum FaceSwapError {
    #[error("No face detected in {0} image")]
    NoFaceDetected(FaceRole),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("External tool error: {0}")]
    ExternalTool(#[from] ExternalToolError),

    #[error("Face engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Image and video I/O errors
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to load image file: {path} ({reason})")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to save image file: {path} ({reason})")]
    SaveFailed { path: String, reason: String },

    #[error("Cannot open video: {path} ({reason})")]
    VideoOpenFailed { path: String, reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame size mismatch: expected {expected:?}, got {actual:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Invalid pixel buffer: {details}")]
    InvalidBuffer { details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No images found in directory: {path}")]
    NoImagesFound { path: String },

    #[error("No face detected in source image: {path}")]
    NoSourceFace { path: String },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Failures of external helper processes (ffmpeg, inference commands)
#[derive(Error, Debug)]
pub enum ExternalToolError {
    #[error("Failed to start {tool}: {reason}")]
    SpawnFailed { tool: String, reason: String },

    #[error("{tool} exited with {status}: {stderr}")]
    NonZeroExit {
        tool: String,
        status: String,
        stderr: String,
    },
}

/// Errors reported by a [`FaceEngine`](crate::face::FaceEngine)
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Face detection failed: {reason}")]
    DetectionFailed { reason: String },

    #[error("Face swap failed: {reason}")]
    SwapFailed { reason: String },

    #[error("Engine returned {actual:?} image for {expected:?} input")]
    DimensionsChanged {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Convenience type alias for Results using FaceSwapError
pub type Result<T> = std::result::Result<T, FaceSwapError>;

impl FaceSwapError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFaceDetected(FaceRole::Source) => {
                "No face detected in source image. Please use an image with a clear face.".to_string()
            }
            Self::NoFaceDetected(FaceRole::Target) => {
                "No face detected in target image. Please use an image with at least one face.".to_string()
            }
            Self::Media(MediaError::LoadFailed { path, .. }) => {
                format!("Could not load image '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Media(MediaError::VideoOpenFailed { path, .. }) => {
                format!("Could not open video file '{}'.", path)
            }
            Self::Config(ConfigError::NoImagesFound { path }) => {
                format!("No images found in '{}'. Supported: png, jpg, jpeg, bmp, webp.", path)
            }
            Self::ExternalTool(ExternalToolError::SpawnFailed { tool, .. }) => {
                format!("Could not run '{}'. Please check it is installed and on PATH.", tool)
            }
            _ => self.to_string(),
        }
    }
}
