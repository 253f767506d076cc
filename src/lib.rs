//! # Face Swap Pipeline
//!
//! Media plumbing around a face detection and swapping model: swap a source
//! face into a still image, into every image of a directory, or into every
//! frame of a video while keeping its audio.
//!
//! The model itself sits behind the [`FaceEngine`](face::FaceEngine) trait.
//! [`CommandEngine`](face::CommandEngine) drives any external program that
//! speaks its PNG/JSON protocol.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use face_swap_pipeline::{
//!     config::Config,
//!     face::CommandEngine,
//!     swap::SingleImageSwapper,
//! };
//!
//! # fn main() -> face_swap_pipeline::Result<()> {
//! let engine = CommandEngine::new("face-model", Vec::new())?;
//! let swapper = SingleImageSwapper::new(&engine);
//! let result = swapper.swap_files("source.jpg", "target.jpg", "swapped.png")?;
//! println!("{}", result.status());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`media`] - in-memory images, loading and saving
//! - [`face`] - detections, source-face selection and the engine seam
//! - [`swap`] - single-image and batch swapping
//! - [`video`] - streamed video swapping with audio remux
//! - [`config`] - configuration management

pub mod config;
pub mod error;
pub mod face;
pub mod media;
pub mod swap;
pub mod video;

pub use crate::{
    config::Config,
    error::{FaceSwapError, Result},
    face::{FaceEngine, SelectionPolicy},
    media::Image,
};
