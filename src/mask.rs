//! Geometric alpha masks for the clipped styles.
//!
//! Masks are computed analytically from the signed distance of each pixel
//! center to the shape edge, giving a ~1px antialiased band. Pixels clearly
//! inside are 255, pixels clearly outside are 0.

use image::RgbaImage;

use crate::{
    error::{BandeiraError, BandeiraResult},
    style::CornerShape,
};

/// Mask shape at a concrete pixel size.
#[derive(Clone, Copy, Debug)]
pub enum MaskShape {
    /// Rounded rectangle; `radius` in output pixels.
    RoundedRect { radius: f32 },
    /// Centered circle of radius `min(width, height) / 2`.
    Circle,
}

impl MaskShape {
    /// Map a style's corner treatment to a mask at `target_w` pixels wide,
    /// scaling the base-size radius proportionally.
    ///
    /// Returns `None` for `CornerShape::None` (no mask required).
    pub fn for_corner(corner: CornerShape, base_w: u32, target_w: u32) -> Option<MaskShape> {
        match corner {
            CornerShape::None => None,
            CornerShape::Circle => Some(MaskShape::Circle),
            CornerShape::Rounded { radius } => Some(MaskShape::RoundedRect {
                radius: radius * target_w as f32 / base_w as f32,
            }),
        }
    }
}

/// Produce a row-major alpha mask (one byte per pixel) of `width`×`height`.
///
/// Zero dimensions are a programmer error, not input data.
pub fn mask(width: u32, height: u32, shape: MaskShape) -> Vec<u8> {
    assert!(width > 0 && height > 0, "mask dimensions must be non-zero");

    let w = width as f32;
    let h = height as f32;
    let mut out = Vec::with_capacity((width * height) as usize);

    match shape {
        MaskShape::RoundedRect { radius } => {
            // Clamp so opposing corners never overlap.
            let r = radius.clamp(0.0, w.min(h) / 2.0);
            let half_w = w / 2.0 - r;
            let half_h = h / 2.0 - r;
            let (cx, cy) = (w / 2.0, h / 2.0);
            for y in 0..height {
                let py = y as f32 + 0.5 - cy;
                for x in 0..width {
                    let px = x as f32 + 0.5 - cx;
                    let dx = (px.abs() - half_w).max(0.0);
                    let dy = (py.abs() - half_h).max(0.0);
                    let dist = (dx * dx + dy * dy).sqrt() - r;
                    out.push(coverage(dist));
                }
            }
        }
        MaskShape::Circle => {
            let r = w.min(h) / 2.0;
            let (cx, cy) = (w / 2.0, h / 2.0);
            for y in 0..height {
                let py = y as f32 + 0.5 - cy;
                for x in 0..width {
                    let px = x as f32 + 0.5 - cx;
                    let dist = (px * px + py * py).sqrt() - r;
                    out.push(coverage(dist));
                }
            }
        }
    }

    out
}

/// Multiply the image's alpha channel by the mask, in place.
pub fn apply_alpha_mask(img: &mut RgbaImage, mask: &[u8]) -> BandeiraResult<()> {
    let expected = (img.width() * img.height()) as usize;
    if mask.len() != expected {
        return Err(BandeiraError::render(format!(
            "mask size mismatch: {} alpha bytes for a {}x{} image",
            mask.len(),
            img.width(),
            img.height()
        )));
    }

    for (px, &m) in img.chunks_exact_mut(4).zip(mask.iter()) {
        px[3] = mul_div255(px[3], m);
    }

    Ok(())
}

fn coverage(dist: f32) -> u8 {
    let cov = (0.5 - dist).clamp(0.0, 1.0);
    (cov * 255.0 + 0.5) as u8
}

pub(crate) fn mul_div255(x: u8, y: u8) -> u8 {
    (((u16::from(x) * u16::from(y)) + 127) / 255) as u8
}
