//! Host-side integrator: tiles, scheduling, buffers and the coordinator that
//! drives device queues.

mod buffers;
mod config;
mod path_trace_work_tiled;
mod report;
mod tile;
mod work_scheduler;
mod work_tile;

pub use buffers::{BufferParams, FilmPixel, RenderBuffers, PASS_STRIDE};
pub use config::{CancelPolicy, FailurePolicy, RenderConfig};
pub use path_trace_work_tiled::{schedule_round, CancelToken, PathTraceWorkTiled, RoundKernels};
pub use report::{RenderReport, RenderStatus, TileOutcome};
pub use tile::{tile_calculate_best_size, TileSize};
pub use work_scheduler::WorkScheduler;
pub use work_tile::WorkTile;
