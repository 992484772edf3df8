//! Image output.

use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{Rgb32FImage, RgbImage};
use wavefront::integrator::RenderBuffers;

/// Write the mean radiance of `buffers`; format follows the extension.
///
/// `.hdr` and `.exr` keep linear floats, `.png` is clamped and gamma encoded.
pub fn write_image(path: &Path, buffers: &RenderBuffers) -> Result<()> {
    let params = buffers.params();
    let (width, height) = (params.width, params.height);
    let rgb = buffers.mean_rgb();

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "hdr" | "exr" => {
            let img = Rgb32FImage::from_raw(width, height, rgb).context("pixel count does not match image size")?;
            img.save(path).with_context(|| format!("writing {}", path.display()))?;
        }
        "png" => {
            let bytes: Vec<u8> = rgb.iter().map(|&v| to_srgb8(v)).collect();
            let img = RgbImage::from_raw(width, height, bytes).context("pixel count does not match image size")?;
            img.save(path).with_context(|| format!("writing {}", path.display()))?;
        }
        other => bail!("unsupported output format '{other}' (use .hdr, .exr or .png)"),
    }
    Ok(())
}

fn to_srgb8(linear: f32) -> u8 {
    let v = linear.clamp(0.0, 1.0);
    let s = if v <= 0.003_130_8 { v * 12.92 } else { 1.055 * v.powf(1.0 / 2.4) - 0.055 };
    (s * 255.0 + 0.5) as u8
}
