//! # Face Module
//!
//! Face detections, source-face selection policies and the [`FaceEngine`]
//! seam through which the pipeline drives an external face model.

pub mod command;
pub mod engine;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use command::CommandEngine;
pub use engine::{composite_faces, FaceEngine};
pub use types::{BoundingBox, FaceDetection, SelectionPolicy, SourceFace};
