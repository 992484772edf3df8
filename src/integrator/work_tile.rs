//! Claimed unit of pixel/sample work.

use crate::util::UVec2;

/// Rectangular pixel range times a sample range.
///
/// `x`/`y` are in buffer pixels; `offset` maps buffer pixels to camera pixels
/// (the buffer's `full_x`/`full_y`). Immutable once handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorkTile {
    /// Position in the scheduler's tile order.
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub start_sample: u32,
    pub num_samples: u32,
    pub offset: UVec2,
}

impl WorkTile {
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.w as usize * self.h as usize
    }

    /// Number of paths the tile generates: one per pixel-sample.
    #[inline]
    pub fn work_size(&self) -> usize {
        self.num_pixels() * self.num_samples as usize
    }

    /// Buffer pixel and sample index of work item `work_index`.
    ///
    /// Items are sample-major: all pixels of the first sample come first.
    pub fn work_pixel(&self, work_index: usize) -> (UVec2, u32) {
        let num_pixels = self.num_pixels();
        debug_assert!(work_index < self.work_size());
        let sample = self.start_sample + (work_index / num_pixels) as u32;
        let pixel = (work_index % num_pixels) as u32;
        (UVec2::new(self.x + pixel % self.w, self.y + pixel / self.w), sample)
    }

    pub fn contains_pixel(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}
