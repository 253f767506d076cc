//! # Media Module
//!
//! The canonical in-memory [`Image`] and still-image loading/saving.

pub mod loader;
pub mod types;

pub use loader::MediaLoader;
pub use types::{ColorSpace, Image};
