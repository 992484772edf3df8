//! Deterministic per-path random numbers.
//!
//! Every number is a pure hash of (seed, pixel, sample, dimension), so the
//! image does not depend on which queue renders a tile or in which round a
//! kernel runs.

use path_hash::{hash_u32x3, to_unit_float};

use crate::util::Vec2;

/// Dimensions used by the camera kernel.
pub const PRNG_FILTER_U: u32 = 0;
pub const PRNG_FILTER_V: u32 = 1;
/// First dimension of bounce 0.
pub const PRNG_BASE_NUM: u32 = 2;
/// Dimensions reserved per bounce.
pub const PRNG_BOUNCE_NUM: u32 = 16;
/// Russian roulette, relative to the bounce offset.
pub const PRNG_TERMINATE: u32 = 0;
/// First dimension handed to shaders, relative to the bounce offset.
pub const PRNG_SHADER_BASE: u32 = 1;

/// Random number source for one camera sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathRng {
    hash: u32,
    sample: u32,
}

impl PathRng {
    /// Seed for pixel `(x, y)` and sample index `sample`.
    pub fn new(seed: u32, x: u32, y: u32, sample: u32) -> Self {
        Self { hash: hash_u32x3(seed, x, y), sample }
    }

    /// Value in `[0, 1)` for an absolute dimension.
    #[inline]
    pub fn get(&self, dimension: u32) -> f32 {
        to_unit_float(hash_u32x3(self.hash, self.sample, dimension))
    }

    #[inline]
    pub fn get_2d(&self, dimension: u32) -> Vec2 {
        Vec2::new(self.get(dimension), self.get(dimension + 1))
    }

    /// First dimension of `bounce`.
    #[inline]
    pub fn bounce_offset(bounce: u32) -> u32 {
        PRNG_BASE_NUM + bounce * PRNG_BOUNCE_NUM
    }

    /// Sequential source for shaders at `bounce`.
    pub fn bounce(&self, bounce: u32) -> BounceRng {
        BounceRng {
            rng: *self,
            next: Self::bounce_offset(bounce) + PRNG_SHADER_BASE,
            end: Self::bounce_offset(bounce + 1),
        }
    }
}

/// Hands out consecutive dimensions of one bounce.
///
/// Dimensions past the bounce's reserved range wrap into fresh hashes of the
/// same bounce, so shaders drawing many numbers still stay deterministic.
#[derive(Debug, Clone)]
pub struct BounceRng {
    rng: PathRng,
    next: u32,
    end: u32,
}

impl BounceRng {
    #[inline]
    pub fn next_1d(&mut self) -> f32 {
        let dim = self.next;
        self.next += 1;
        if dim < self.end {
            self.rng.get(dim)
        } else {
            // Out of reserved range: mix the bounce end into the dimension.
            self.rng.get(dim ^ (self.end << 16) ^ 0x8000_0000)
        }
    }

    #[inline]
    pub fn next_2d(&mut self) -> Vec2 {
        let u = self.next_1d();
        let v = self.next_1d();
        Vec2::new(u, v)
    }
}
