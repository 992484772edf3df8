//! Utility types shared by every layer of the engine.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, plus [`Ray`]

mod error;
mod math;

pub use error::*;
pub use math::*;
