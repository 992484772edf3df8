//! Error types for the wavefront engine.
//!
//! Device execution failures are reported as booleans by queues and collected
//! into a [`RenderReport`](crate::integrator::RenderReport); this type covers
//! configuration, buffer and reporting errors.

use thiserror::Error;

use crate::integrator::WorkTile;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A `RenderConfig` field is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Render buffer full image differs from the device film.
    #[error("Render buffer mismatch: expected {expected} pixels, got {actual}")]
    BufferMismatch { expected: usize, actual: usize },

    /// The tile plan allows batches larger than some queue's path state array.
    #[error("Tile work size {work_size} exceeds queue capacity {capacity}")]
    TileTooLarge { work_size: usize, capacity: usize },

    /// Device offers zero concurrent queues.
    #[error("Device has no execution queues")]
    NoQueues,

    /// At least one tile failed on its queue.
    #[error("Render failed: {} tile(s) failed, {unrendered} tile(s) not rendered", failed.len())]
    RenderFailed {
        failed: Vec<WorkTile>,
        unrendered: usize,
    },

    /// Cancellation left tiles unrendered.
    #[error("Render cancelled with {unrendered} tile(s) not rendered")]
    Cancelled { unrendered: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
