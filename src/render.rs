//! Style rendering: one normalized source into the full artifact matrix.
//!
//! SVG artifacts wrap a canonical buffer (base64 PNG data URI) in the
//! style's fixed template; PNG artifacts re-run normalization at the exact
//! output size so the 4× variant is rendered, not pixel-stretched, then take
//! the style's alpha mask.

use base64::Engine as _;
use image::RgbaImage;

use crate::{
    artifact::{ArtifactFormat, OutputLayout, RASTER_FORMATS},
    catalog::Municipality,
    error::BandeiraResult,
    mask::{MaskShape, apply_alpha_mask, mask},
    normalize::{SourceImage, encode_png},
    rasterize::VectorRasterizer,
    style::{Aspect, STYLES, StyleSpec},
    writer::{WriteOutcome, artifact_exists, write_artifact},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOpts {
    pub skip_svg: bool,
    pub skip_png: bool,
}

/// One failed (style, format) combination; the rest of the matrix proceeds.
#[derive(Clone, Debug)]
pub struct StyleFailure {
    pub style: &'static str,
    pub format: ArtifactFormat,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct EntityArtifacts {
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<StyleFailure>,
}

impl EntityArtifacts {
    fn record(
        &mut self,
        style: &StyleSpec,
        format: ArtifactFormat,
        res: BandeiraResult<WriteOutcome>,
    ) {
        match res {
            Ok(WriteOutcome::Written) => self.written += 1,
            Ok(WriteOutcome::Skipped) => self.skipped += 1,
            Err(e) => self.failures.push(StyleFailure {
                style: style.name,
                format,
                error: e.to_string(),
            }),
        }
    }
}

/// Render every artifact for one entity.
///
/// Returns `Err` only when normalization of the canonical buffers fails
/// outright; per-style failures are collected in the result instead.
#[tracing::instrument(skip_all, fields(ibge = mun.ibge_code))]
pub fn render_entity(
    mun: &Municipality,
    source: &SourceImage,
    layout: &OutputLayout,
    rasterizer: &dyn VectorRasterizer,
    opts: RenderOpts,
) -> BandeiraResult<EntityArtifacts> {
    let mut out = EntityArtifacts::default();

    if !opts.skip_svg {
        let mut pending = Vec::new();
        for style in &STYLES {
            let path =
                layout.artifact_path(style, ArtifactFormat::Svg, &mun.uf, mun.ibge_code, &mun.slug);
            if artifact_exists(&path) {
                out.skipped += 1;
            } else {
                pending.push((style, path));
            }
        }

        // The canonical buffers are only worth producing when at least one
        // svg artifact is actually missing; a resumed run skips them whole.
        if !pending.is_empty() {
            let wide = source.normalize(300, 200, rasterizer)?;
            let square = source.normalize(200, 200, rasterizer)?;
            let uri_wide = data_uri(&encode_png(&wide)?);
            let uri_square = data_uri(&encode_png(&square)?);

            for (style, path) in pending {
                let uri = match style.aspect {
                    Aspect::Wide => &uri_wide,
                    Aspect::Square => &uri_square,
                };
                let svg = style.svg_template.replace("{data_uri}", uri);
                out.record(
                    style,
                    ArtifactFormat::Svg,
                    write_artifact(&path, svg.as_bytes()),
                );
            }
        }
    }

    if !opts.skip_png {
        for style in &STYLES {
            for (format, scale) in RASTER_FORMATS {
                let path = layout.artifact_path(style, format, &mun.uf, mun.ibge_code, &mun.slug);
                if artifact_exists(&path) {
                    out.skipped += 1;
                    continue;
                }

                let res = render_raster(source, style, scale, rasterizer)
                    .and_then(|bytes| write_artifact(&path, &bytes));
                out.record(style, format, res);
            }
        }
    }

    tracing::debug!(
        written = out.written,
        skipped = out.skipped,
        failures = out.failures.len(),
        "entity rendered"
    );
    Ok(out)
}

fn render_raster(
    source: &SourceImage,
    style: &StyleSpec,
    scale: u32,
    rasterizer: &dyn VectorRasterizer,
) -> BandeiraResult<Vec<u8>> {
    let (width, height) = style.scaled_size(scale);
    let mut img: RgbaImage = source.normalize(width, height, rasterizer)?;

    if let Some(shape) = MaskShape::for_corner(style.corner, style.width, width) {
        let alpha = mask(width, height, shape);
        apply_alpha_mask(&mut img, &alpha)?;
    }

    encode_png(&img)
}

fn data_uri(png_bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes)
    )
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::{error::BandeiraError, rasterize::ResvgRasterizer};

    struct TempDirGuard(PathBuf);

    impl TempDirGuard {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "bandeiras_render_test_{}_{name}",
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn municipality() -> Municipality {
        Municipality {
            ibge_code: 3550308,
            name: "São Paulo".to_string(),
            slug: "sao-paulo".to_string(),
            uf: "SP".to_string(),
            uf_name: String::new(),
            region: String::new(),
            region_name: String::new(),
            flag_local: Some("flag.png".to_string()),
            flag_source: String::new(),
        }
    }

    fn write_raster_source(dir: &Path) -> PathBuf {
        let path = dir.join("flag.png");
        let img = RgbaImage::from_pixel(60, 40, image::Rgba([200, 0, 0, 255]));
        std::fs::write(&path, encode_png(&img).unwrap()).unwrap();
        path
    }

    #[test]
    fn full_matrix_is_written_once_then_skipped() {
        let dir = TempDirGuard::new("matrix");
        let source = SourceImage::open(write_raster_source(&dir.0)).unwrap();
        let layout = OutputLayout::new(dir.0.join("dist"));
        let mun = municipality();

        let first = render_entity(&mun, &source, &layout, &ResvgRasterizer, RenderOpts::default())
            .unwrap();
        assert_eq!(first.written, 12);
        assert_eq!(first.skipped, 0);
        assert!(first.failures.is_empty());

        for path in layout.expected_paths(&mun.uf, mun.ibge_code, &mun.slug) {
            assert!(artifact_exists(&path), "missing {}", path.display());
        }

        let second = render_entity(&mun, &source, &layout, &ResvgRasterizer, RenderOpts::default())
            .unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 12);
    }

    #[test]
    fn circle_png_has_masked_corners() {
        let dir = TempDirGuard::new("circle");
        let source = SourceImage::open(write_raster_source(&dir.0)).unwrap();
        let layout = OutputLayout::new(dir.0.join("dist"));
        let mun = municipality();

        render_entity(
            &mun,
            &source,
            &layout,
            &ResvgRasterizer,
            RenderOpts {
                skip_svg: true,
                skip_png: false,
            },
        )
        .unwrap();

        let circle = StyleSpec::by_name("circle").unwrap();
        let path = layout.artifact_path(
            circle,
            ArtifactFormat::Png200,
            &mun.uf,
            mun.ibge_code,
            &mun.slug,
        );
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (200, 200));
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(199, 0).0[3], 0);
        assert_eq!(img.get_pixel(100, 100).0[3], 255);
    }

    #[test]
    fn svg_artifacts_embed_data_uri_per_aspect() {
        let dir = TempDirGuard::new("svg");
        let source = SourceImage::open(write_raster_source(&dir.0)).unwrap();
        let layout = OutputLayout::new(dir.0.join("dist"));
        let mun = municipality();

        render_entity(
            &mun,
            &source,
            &layout,
            &ResvgRasterizer,
            RenderOpts {
                skip_svg: false,
                skip_png: true,
            },
        )
        .unwrap();

        let full = StyleSpec::by_name("full").unwrap();
        let svg_path =
            layout.artifact_path(full, ArtifactFormat::Svg, &mun.uf, mun.ibge_code, &mun.slug);
        let content = std::fs::read_to_string(svg_path).unwrap();
        assert!(content.contains("data:image/png;base64,"));
        assert!(!content.contains("{data_uri}"));
        assert!(content.contains("viewBox=\"0 0 300 200\""));
    }

    /// Rasterizer that only handles base-size output, to exercise partial
    /// failure isolation at the 4× resolution.
    struct SmallOnlyRasterizer;

    impl VectorRasterizer for SmallOnlyRasterizer {
        fn label(&self) -> &'static str {
            "small-only"
        }

        fn rasterize(&self, source: &Path, w: u32, h: u32) -> BandeiraResult<RgbaImage> {
            if w > 400 {
                return Err(BandeiraError::render("simulated failure at large size"));
            }
            ResvgRasterizer.rasterize(source, w, h)
        }
    }

    #[test]
    fn large_size_failures_do_not_block_other_artifacts() {
        let dir = TempDirGuard::new("partial");
        let svg_source = dir.0.join("flag.svg");
        std::fs::write(
            &svg_source,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="30" height="20">
                <rect width="30" height="20" fill="#00aa00"/></svg>"##,
        )
        .unwrap();
        let source = SourceImage::open(&svg_source).unwrap();
        let layout = OutputLayout::new(dir.0.join("dist"));
        let mun = municipality();

        let result = render_entity(
            &mun,
            &source,
            &layout,
            &SmallOnlyRasterizer,
            RenderOpts::default(),
        )
        .unwrap();

        // All four png-800 variants fail (the svg source has no raster
        // fallback), everything else lands.
        assert_eq!(result.written, 8);
        assert_eq!(result.failures.len(), 4);
        assert!(
            result
                .failures
                .iter()
                .all(|f| f.format == ArtifactFormat::Png800)
        );
    }
}
