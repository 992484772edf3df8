//! Outcome of a render call.

use std::fmt;

use super::work_tile::WorkTile;
use crate::kernel::PathKernel;
use crate::util::{Error, Result};

/// How one claimed tile ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Drained and accumulated.
    Completed,
    /// A launch or synchronize failed; nothing was accumulated.
    Failed,
    /// Cancelled mid-batch and discarded.
    Abandoned,
    /// Cancelled mid-batch; radiance gathered so far was accumulated.
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderStatus::Completed => "completed",
            RenderStatus::Failed => "failed",
            RenderStatus::Cancelled => "cancelled",
        })
    }
}

/// Which tiles rendered, which did not, and how much work it took.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub status: RenderStatus,
    pub total_tiles: usize,
    pub completed: Vec<WorkTile>,
    pub failed: Vec<WorkTile>,
    pub abandoned: Vec<WorkTile>,
    pub partial: Vec<WorkTile>,
    /// Tiles never claimed because the scheduler was stopped.
    pub unclaimed_tiles: usize,
    /// Kernel rounds (synchronize calls) summed over queues.
    pub num_rounds: u64,
    /// Path kernel launches per kind, indexed by [`PathKernel::index`].
    pub kernel_launches: [u64; PathKernel::COUNT],
}

impl RenderReport {
    pub(crate) fn new(total_tiles: usize) -> Self {
        Self {
            status: RenderStatus::Completed,
            total_tiles,
            completed: Vec::new(),
            failed: Vec::new(),
            abandoned: Vec::new(),
            partial: Vec::new(),
            unclaimed_tiles: 0,
            num_rounds: 0,
            kernel_launches: [0; PathKernel::COUNT],
        }
    }

    pub(crate) fn record(&mut self, tile: WorkTile, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Completed => self.completed.push(tile),
            TileOutcome::Failed => self.failed.push(tile),
            TileOutcome::Abandoned => self.abandoned.push(tile),
            TileOutcome::Partial => self.partial.push(tile),
        }
    }

    /// Sort tile lists and settle the status.
    pub(crate) fn finish(&mut self, cancelled: bool, unclaimed_tiles: usize) {
        for list in [&mut self.completed, &mut self.failed, &mut self.abandoned, &mut self.partial] {
            list.sort_by_key(|t| t.index);
        }
        self.unclaimed_tiles = unclaimed_tiles;
        self.status = if !self.failed.is_empty() {
            RenderStatus::Failed
        } else if cancelled || !self.abandoned.is_empty() || !self.partial.is_empty() {
            RenderStatus::Cancelled
        } else {
            RenderStatus::Completed
        };
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Completed
    }

    /// Tiles whose samples are not fully in the buffer.
    pub fn num_unrendered(&self) -> usize {
        self.total_tiles - self.completed.len()
    }

    pub fn launches(&self, kernel: PathKernel) -> u64 {
        self.kernel_launches[kernel.index()]
    }

    pub fn total_launches(&self) -> u64 {
        self.kernel_launches.iter().sum()
    }

    /// `Ok` for a completed render, the matching [`Error`] otherwise.
    pub fn into_result(self) -> Result<RenderReport> {
        match self.status {
            RenderStatus::Completed => Ok(self),
            RenderStatus::Failed => {
                let unrendered = self.num_unrendered() - self.failed.len();
                Err(Error::RenderFailed { failed: self.failed, unrendered })
            }
            RenderStatus::Cancelled => Err(Error::Cancelled { unrendered: self.num_unrendered() }),
        }
    }
}

impl fmt::Display for RenderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} tiles completed ({} failed, {} abandoned, {} partial, {} unclaimed), {} rounds, {} launches",
            self.status,
            self.completed.len(),
            self.total_tiles,
            self.failed.len(),
            self.abandoned.len(),
            self.partial.len(),
            self.unclaimed_tiles,
            self.num_rounds,
            self.total_launches()
        )
    }
}
