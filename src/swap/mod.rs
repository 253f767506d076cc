//! # Swap Module
//!
//! Still-image face swapping: a single source/target pair, and batch runs
//! over a directory of targets.

pub mod batch;
pub mod image;

pub use batch::{BatchOutcome, BatchRunner, BatchSummary, ItemStatus};
pub use image::{status_line, SingleImageSwapper, SwappedImage};
