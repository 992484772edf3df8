//! Tile size selection.

use std::fmt;

use crate::util::UVec2;

/// Tile extent in pixels and samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
    pub num_samples: u32,
}

impl TileSize {
    pub const fn new(width: u32, height: u32, num_samples: u32) -> Self {
        Self { width, height, num_samples }
    }

    /// Paths generated by a full tile of this size.
    #[inline]
    pub fn work_size(&self) -> usize {
        self.width as usize * self.height as usize * self.num_samples as usize
    }
}

impl fmt::Display for TileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.num_samples)
    }
}

/// Largest power of two not above `x` (0 for 0).
#[inline]
fn pow2_floor(x: usize) -> usize {
    if x == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - x.leading_zeros())
    }
}

#[inline]
fn isqrt(x: usize) -> usize {
    let mut r = (x as f64).sqrt() as usize;
    while r * r > x {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= x {
        r += 1;
    }
    r
}

/// Pick a tile size whose path count fills `max_path_states` as closely as a
/// power-of-two square allows.
///
/// Pixels come first: the side is the largest power of two whose square fits
/// the per-sample share of states, clipped to the image. Remaining capacity is
/// spent on samples. The result always satisfies
/// `width * height * num_samples <= max_path_states`.
pub fn tile_calculate_best_size(image_size: UVec2, num_samples: u32, max_path_states: usize) -> TileSize {
    if max_path_states <= 1 || num_samples == 0 {
        return TileSize::new(1, 1, 1);
    }

    let per_sample = max_path_states / num_samples as usize;
    let side = if per_sample > 0 { pow2_floor(isqrt(per_sample)).max(1) } else { 1 };
    let side = side.min(u32::MAX as usize) as u32;

    let width = side.min(image_size.x).max(1);
    let height = side.min(image_size.y).max(1);

    let tile_samples = if num_samples == 1 {
        1
    } else {
        let per_tile = max_path_states / (width as usize * height as usize);
        (pow2_floor(per_tile).min(num_samples as usize) as u32).max(1)
    };

    TileSize::new(width, height, tile_samples)
}
