//! Lock-free tile hand-out.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::buffers::BufferParams;
use super::tile::{tile_calculate_best_size, TileSize};
use super::work_tile::WorkTile;
use crate::util::UVec2;

/// Splits pixels x samples into tiles and hands each out exactly once.
///
/// Claiming is a single atomic fetch-add, so callers never wait on each
/// other. Tile order is sample-range major, then row-major within a range.
#[derive(Debug)]
pub struct WorkScheduler {
    max_num_path_states: usize,

    image_size: UVec2,
    offset: UVec2,
    start_sample: u32,
    num_samples: u32,

    tile_size: TileSize,
    num_tiles_x: usize,
    num_tiles_per_sample_range: usize,
    num_tiles: usize,

    next_work_index: AtomicUsize,
    stopped: AtomicBool,
}

impl WorkScheduler {
    /// Empty scheduler sized for queues holding `max_num_path_states` paths.
    pub fn new(max_num_path_states: usize) -> Self {
        Self {
            max_num_path_states: max_num_path_states.max(1),
            image_size: UVec2::ZERO,
            offset: UVec2::ZERO,
            start_sample: 0,
            num_samples: 0,
            tile_size: TileSize::new(1, 1, 1),
            num_tiles_x: 0,
            num_tiles_per_sample_range: 0,
            num_tiles: 0,
            next_work_index: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    /// Takes effect on the next [`reset`](Self::reset).
    pub fn set_max_num_path_states(&mut self, max_num_path_states: usize) {
        self.max_num_path_states = max_num_path_states.max(1);
    }

    /// Plan tiles for a new sample range.
    ///
    /// The range is cut off at `u32::MAX`, the first sample index that cannot
    /// be represented. Taking `&mut self` guarantees no `next_tile` call of
    /// the previous epoch is still running.
    pub fn reset(&mut self, params: &BufferParams, start_sample: u32, num_samples: u32) {
        let end_sample = start_sample.saturating_add(num_samples);
        if end_sample - start_sample < num_samples {
            tracing::warn!(start_sample, num_samples, "sample range truncated at u32::MAX");
        }
        let num_samples = end_sample - start_sample;

        self.image_size = params.size();
        self.offset = params.offset();
        self.start_sample = start_sample;
        self.num_samples = num_samples;

        self.tile_size = tile_calculate_best_size(self.image_size, num_samples, self.max_num_path_states);

        let tw = self.tile_size.width as usize;
        let th = self.tile_size.height as usize;
        let ts = self.tile_size.num_samples as usize;
        self.num_tiles_x = (self.image_size.x as usize).div_ceil(tw);
        let num_tiles_y = (self.image_size.y as usize).div_ceil(th);
        self.num_tiles_per_sample_range = self.num_tiles_x * num_tiles_y;
        let num_sample_ranges = (num_samples as usize).div_ceil(ts);
        self.num_tiles = self.num_tiles_per_sample_range * num_sample_ranges;

        *self.next_work_index.get_mut() = 0;
        *self.stopped.get_mut() = false;

        tracing::debug!(
            tile_size = %self.tile_size,
            num_tiles = self.num_tiles,
            start_sample,
            num_samples,
            "work scheduler reset"
        );
    }

    /// Claim the next tile; `None` once exhausted or stopped.
    pub fn next_tile(&self) -> Option<WorkTile> {
        if self.stopped.load(Ordering::Acquire) {
            return None;
        }
        let index = self.next_work_index.fetch_add(1, Ordering::Relaxed);
        self.tile_at(index)
    }

    /// Tile with position `index` in the plan, without claiming it.
    pub fn tile_at(&self, index: usize) -> Option<WorkTile> {
        if index >= self.num_tiles {
            return None;
        }
        let sample_range = index / self.num_tiles_per_sample_range;
        let tile_in_range = index % self.num_tiles_per_sample_range;
        let tile_x = (tile_in_range % self.num_tiles_x) as u32;
        let tile_y = (tile_in_range / self.num_tiles_x) as u32;

        let x = tile_x * self.tile_size.width;
        let y = tile_y * self.tile_size.height;
        let start_sample = self.start_sample + sample_range as u32 * self.tile_size.num_samples;
        let end_sample = self.start_sample + self.num_samples;

        Some(WorkTile {
            index,
            x,
            y,
            w: self.tile_size.width.min(self.image_size.x - x),
            h: self.tile_size.height.min(self.image_size.y - y),
            start_sample,
            num_samples: self.tile_size.num_samples.min(end_sample - start_sample),
            offset: self.offset,
        })
    }

    /// Make every further `next_tile` return `None`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn num_tiles(&self) -> usize {
        self.num_tiles
    }

    /// Tiles handed out so far in this epoch.
    pub fn num_claimed(&self) -> usize {
        self.next_work_index.load(Ordering::Relaxed).min(self.num_tiles)
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn max_num_path_states(&self) -> usize {
        self.max_num_path_states
    }
}
