//! Source normalization: one heterogeneous flag file in, exact-size RGBA
//! buffers out.
//!
//! Vector sources go through the configured [`VectorRasterizer`]; if that
//! fails (missing tool, timeout, corrupt file) the same bytes are retried as
//! raster content, since some catalogued "SVG" files are mislabeled raster
//! images. Raster sources are decoded once per entity and resized per target.

use std::{
    io::Read as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::{DynamicImage, RgbaImage, imageops};

use crate::{
    error::{BandeiraError, BandeiraResult},
    rasterize::VectorRasterizer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Raster,
}

/// Magic bytes of raster formats that show up mislabeled as `.svg` in the
/// wild catalogue data.
fn looks_like_raster(header: &[u8]) -> bool {
    const MAGICS: [&[u8]; 6] = [
        b"\x89PNG",
        b"\xff\xd8\xff",
        b"GIF87a",
        b"GIF89a",
        b"RIFF",
        b"BM",
    ];
    MAGICS.iter().any(|magic| header.starts_with(magic))
}

/// Classify a source file by extension, corrected by content sniffing.
pub fn classify_source(path: &Path) -> BandeiraResult<SourceKind> {
    let svg_ext = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    if !svg_ext {
        return Ok(SourceKind::Raster);
    }

    let mut header = [0u8; 16];
    let mut f = std::fs::File::open(path)
        .with_context(|| format!("open source '{}'", path.display()))?;
    let n = f
        .read(&mut header)
        .with_context(|| format!("read source header '{}'", path.display()))?;

    if looks_like_raster(&header[..n]) {
        tracing::warn!(
            source = %path.display(),
            "declared-svg source contains raster bytes, treating as raster"
        );
        return Ok(SourceKind::Raster);
    }

    Ok(SourceKind::Vector)
}

#[derive(Debug)]
enum Decoded {
    Vector,
    Raster(DynamicImage),
}

/// One entity's source image, opened and classified once, normalized at as
/// many target sizes as the style matrix needs.
#[derive(Debug)]
pub struct SourceImage {
    path: PathBuf,
    decoded: Decoded,
}

impl SourceImage {
    pub fn open(path: impl Into<PathBuf>) -> BandeiraResult<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(BandeiraError::SourceMissing(path));
        }

        let decoded = match classify_source(&path)? {
            SourceKind::Vector => Decoded::Vector,
            SourceKind::Raster => Decoded::Raster(decode_raster(&path)?),
        };

        Ok(Self { path, decoded })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        match self.decoded {
            Decoded::Vector => SourceKind::Vector,
            Decoded::Raster(_) => SourceKind::Raster,
        }
    }

    /// Produce an exact `target_w`×`target_h` RGBA buffer, filling the frame
    /// and cropping overflow.
    pub fn normalize(
        &self,
        target_w: u32,
        target_h: u32,
        rasterizer: &dyn VectorRasterizer,
    ) -> BandeiraResult<RgbaImage> {
        match &self.decoded {
            Decoded::Raster(img) => Ok(resize_to_cover(&img.to_rgba8(), target_w, target_h)),
            Decoded::Vector => match rasterizer.rasterize(&self.path, target_w, target_h) {
                Ok(img) => Ok(img),
                Err(raster_err) => {
                    tracing::warn!(
                        source = %self.path.display(),
                        error = %raster_err,
                        "vector rasterization failed, retrying source as raster"
                    );
                    let img = decode_raster(&self.path).map_err(|fallback_err| {
                        BandeiraError::normalization(
                            &self.path,
                            format!(
                                "vector rasterization failed ({raster_err}); raster fallback failed ({fallback_err})"
                            ),
                        )
                    })?;
                    Ok(resize_to_cover(&img.to_rgba8(), target_w, target_h))
                }
            },
        }
    }
}

/// Decode by content, not extension, so mislabeled files still load.
fn decode_raster(path: &Path) -> BandeiraResult<DynamicImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read source '{}'", path.display()))?;
    image::load_from_memory(&bytes)
        .map_err(|e| BandeiraError::normalization(path, format!("decode raster content: {e}")))
}

/// Resize so the source covers the full target frame, then center-crop.
pub(crate) fn resize_to_cover(src: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    assert!(target_w > 0 && target_h > 0, "target size must be non-zero");
    let (src_w, src_h) = src.dimensions();

    if (src_w, src_h) == (target_w, target_h) {
        return src.clone();
    }

    let scale = (target_w as f64 / src_w as f64).max(target_h as f64 / src_h as f64);
    let resized_w = ((src_w as f64 * scale).round() as u32).max(target_w);
    let resized_h = ((src_h as f64 * scale).round() as u32).max(target_h);

    let resized = if (resized_w, resized_h) == (src_w, src_h) {
        src.clone()
    } else {
        imageops::resize(src, resized_w, resized_h, imageops::FilterType::Lanczos3)
    };
    let x = (resized_w - target_w) / 2;
    let y = (resized_h - target_h) / 2;
    imageops::crop_imm(&resized, x, y, target_w, target_h).to_image()
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> BandeiraResult<Vec<u8>> {
    use image::{ExtendedColorType, ImageEncoder as _, codecs::png::PngEncoder};

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .context("encode png")?;
    Ok(buf)
}
