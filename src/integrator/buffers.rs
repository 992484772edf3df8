//! Output accumulation buffer.
//!
//! Pixel-major layout with four `f32` channels per pixel: summed RGB radiance
//! and the number of samples accumulated. Writes are atomic float adds, so
//! workers never lock, even when tiles from different sample ranges land on
//! the same pixel.

use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};

use crate::util::{Error, Result, UVec2, Vec3};

/// Channels stored per pixel.
pub const PASS_STRIDE: usize = 4;

/// Region of the camera image covered by a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferParams {
    pub width: u32,
    pub height: u32,
    /// Offset of the buffer inside the full camera image.
    pub full_x: u32,
    pub full_y: u32,
    pub full_width: u32,
    pub full_height: u32,
}

impl BufferParams {
    /// Buffer covering a whole `width` x `height` image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            full_x: 0,
            full_y: 0,
            full_width: width,
            full_height: height,
        }
    }

    /// Buffer covering a window of a larger image.
    pub fn window(full_width: u32, full_height: u32, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            full_x: x,
            full_y: y,
            full_width,
            full_height,
        }
    }

    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    pub fn offset(&self) -> UVec2 {
        UVec2::new(self.full_x, self.full_y)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!("empty buffer {}x{}", self.width, self.height)));
        }
        if self.full_x as u64 + self.width as u64 > self.full_width as u64
            || self.full_y as u64 + self.height as u64 > self.full_height as u64
        {
            return Err(Error::invalid(format!(
                "buffer window {}x{}+{}+{} outside image {}x{}",
                self.width, self.height, self.full_x, self.full_y, self.full_width, self.full_height
            )));
        }
        Ok(())
    }
}

/// One accumulated pixel as stored in the buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FilmPixel {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub num_samples: f32,
}

impl FilmPixel {
    /// Average radiance; black when nothing was accumulated.
    pub fn mean(&self) -> Vec3 {
        if self.num_samples > 0.0 {
            Vec3::new(self.r, self.g, self.b) / self.num_samples
        } else {
            Vec3::ZERO
        }
    }
}

#[inline]
fn atomic_add_f32(cell: &AtomicU32, value: f32) {
    if value == 0.0 {
        return;
    }
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

/// Shared accumulation buffer.
#[derive(Debug)]
pub struct RenderBuffers {
    params: BufferParams,
    data: Vec<AtomicU32>,
}

impl RenderBuffers {
    pub fn new(params: BufferParams) -> Result<Self> {
        params.validate()?;
        let len = params.num_pixels() * PASS_STRIDE;
        let data = (0..len).map(|_| AtomicU32::new(0)).collect();
        Ok(Self { params, data })
    }

    #[inline]
    pub fn params(&self) -> &BufferParams {
        &self.params
    }

    #[inline]
    fn base(&self, pixel: UVec2) -> usize {
        debug_assert!(pixel.x < self.params.width && pixel.y < self.params.height);
        (pixel.y as usize * self.params.width as usize + pixel.x as usize) * PASS_STRIDE
    }

    /// Add one sample's radiance to `pixel` (buffer coordinates).
    pub fn accumulate_sample(&self, pixel: UVec2, radiance: Vec3) {
        self.accumulate(pixel, radiance, 1.0);
    }

    /// Add `radiance` summed over `num_samples` samples to `pixel`.
    pub fn accumulate(&self, pixel: UVec2, radiance: Vec3, num_samples: f32) {
        let base = self.base(pixel);
        atomic_add_f32(&self.data[base], radiance.x);
        atomic_add_f32(&self.data[base + 1], radiance.y);
        atomic_add_f32(&self.data[base + 2], radiance.z);
        atomic_add_f32(&self.data[base + 3], num_samples);
    }

    pub fn pixel(&self, x: u32, y: u32) -> FilmPixel {
        let base = self.base(UVec2::new(x, y));
        let load = |i: usize| f32::from_bits(self.data[base + i].load(Ordering::Relaxed));
        FilmPixel {
            r: load(0),
            g: load(1),
            b: load(2),
            num_samples: load(3),
        }
    }

    #[inline]
    pub fn pixel_mean(&self, x: u32, y: u32) -> Vec3 {
        self.pixel(x, y).mean()
    }

    /// Zero every pixel. Callers must not render concurrently.
    pub fn reset(&self) {
        for cell in &self.data {
            cell.store(0, Ordering::Relaxed);
        }
    }

    /// Copy of the whole buffer, row-major.
    pub fn snapshot(&self) -> Vec<FilmPixel> {
        let raw: Vec<u32> = self.data.iter().map(|c| c.load(Ordering::Relaxed)).collect();
        bytemuck::cast_slice::<u32, FilmPixel>(&raw).to_vec()
    }

    /// Per-pixel mean radiance as packed RGB floats, row-major.
    pub fn mean_rgb(&self) -> Vec<f32> {
        self.snapshot()
            .iter()
            .flat_map(|p| p.mean().to_array())
            .collect()
    }
}
