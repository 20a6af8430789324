//! Vector-to-raster conversion backends.
//!
//! The primary backend shells out to `rsvg-convert`, matching the external
//! collaborator contract: (source, width, height, output path) in, a raster
//! file or a non-zero status out. A hung subprocess is bounded by a
//! kill-after-deadline wait loop so one bad SVG cannot stall a worker.
//!
//! The in-process backend rasterizes through `usvg`/`resvg` and needs no
//! external tooling; tests use it, and `Auto` selects it when `rsvg-convert`
//! is not installed.

use std::{
    io::Read as _,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    error::{BandeiraError, BandeiraResult},
    normalize::resize_to_cover,
};

pub const DEFAULT_RASTERIZE_TIMEOUT: Duration = Duration::from_secs(30);

/// One vector rasterization step: source SVG to an exact-size RGBA buffer,
/// aspect preserved, cropped to fill (never letterboxed).
pub trait VectorRasterizer: Send + Sync {
    fn label(&self) -> &'static str;

    fn rasterize(&self, source: &Path, width: u32, height: u32) -> BandeiraResult<RgbaImage>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterizerKind {
    /// `rsvg-convert` when on PATH, otherwise the in-process backend.
    Auto,
    RsvgConvert,
    Resvg,
}

pub fn create_rasterizer(kind: RasterizerKind) -> Box<dyn VectorRasterizer> {
    match kind {
        RasterizerKind::Auto => {
            if is_rsvg_convert_on_path() {
                Box::new(RsvgConvertRasterizer::default())
            } else {
                tracing::debug!("rsvg-convert not found on PATH, using in-process rasterizer");
                Box::new(ResvgRasterizer)
            }
        }
        RasterizerKind::RsvgConvert => Box::new(RsvgConvertRasterizer::default()),
        RasterizerKind::Resvg => Box::new(ResvgRasterizer),
    }
}

pub fn is_rsvg_convert_on_path() -> bool {
    Command::new("rsvg-convert")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// External `rsvg-convert` subprocess backend.
#[derive(Clone, Debug)]
pub struct RsvgConvertRasterizer {
    pub binary: String,
    pub timeout: Duration,
}

impl Default for RsvgConvertRasterizer {
    fn default() -> Self {
        Self {
            binary: "rsvg-convert".to_string(),
            timeout: DEFAULT_RASTERIZE_TIMEOUT,
        }
    }
}

impl VectorRasterizer for RsvgConvertRasterizer {
    fn label(&self) -> &'static str {
        "rsvg-convert"
    }

    fn rasterize(&self, source: &Path, width: u32, height: u32) -> BandeiraResult<RgbaImage> {
        let tmp = TempFileGuard::new("png");

        let mut child = Command::new(&self.binary)
            .args(["-w", &width.to_string(), "-h", &height.to_string()])
            .arg("--keep-aspect-ratio")
            .arg("-o")
            .arg(tmp.path())
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BandeiraError::render(format!("failed to spawn {}: {e}", self.binary))
            })?;

        // Drain stderr on a helper thread so a chatty child can never block
        // on a full pipe while we wait on it.
        let stderr = child.stderr.take();
        let drain = stderr.map(|mut pipe| {
            std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf)?;
                Ok(buf)
            })
        });

        let status = wait_with_deadline(&mut child, self.timeout, &self.binary)?;

        let stderr_out = drain
            .and_then(|handle| handle.join().ok())
            .and_then(|res| res.ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(BandeiraError::render(format!(
                "{} exited with status {} for '{}': {}",
                self.binary,
                status,
                source.display(),
                String::from_utf8_lossy(&stderr_out).trim()
            )));
        }

        let bytes = std::fs::read(tmp.path()).map_err(|e| {
            BandeiraError::render(format!(
                "{} produced no readable output for '{}': {e}",
                self.binary,
                source.display()
            ))
        })?;
        if bytes.is_empty() {
            return Err(BandeiraError::render(format!(
                "{} produced an empty output file for '{}'",
                self.binary,
                source.display()
            )));
        }

        // `--keep-aspect-ratio` may yield an image smaller than the requested
        // box on one axis; cover-crop brings it to the exact target size.
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("decode {} output for '{}'", self.binary, source.display()))?;
        Ok(resize_to_cover(&decoded.to_rgba8(), width, height))
    }
}

/// In-process backend rasterizing through `usvg`/`resvg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResvgRasterizer;

impl VectorRasterizer for ResvgRasterizer {
    fn label(&self) -> &'static str {
        "resvg"
    }

    fn rasterize(&self, source: &Path, width: u32, height: u32) -> BandeiraResult<RgbaImage> {
        let bytes = std::fs::read(source)
            .with_context(|| format!("read svg source '{}'", source.display()))?;
        let tree = usvg::Tree::from_data(&bytes, &usvg::Options::default())
            .with_context(|| format!("parse svg tree '{}'", source.display()))?;

        let size = tree.size();
        let (src_w, src_h) = (size.width(), size.height());
        if !src_w.is_finite() || !src_h.is_finite() || src_w <= 0.0 || src_h <= 0.0 {
            return Err(BandeiraError::render(format!(
                "svg '{}' has invalid intrinsic size",
                source.display()
            )));
        }

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| BandeiraError::render("failed to allocate svg pixmap"))?;

        // Uniform cover scale, centered; overflow on one axis is cropped by
        // the pixmap bounds.
        let scale = (width as f32 / src_w).max(height as f32 / src_h);
        let tx = (width as f32 - src_w * scale) / 2.0;
        let ty = (height as f32 - src_h * scale) / 2.0;
        let xform = resvg::tiny_skia::Transform::from_scale(scale, scale).post_translate(tx, ty);

        resvg::render(&tree, xform, &mut pixmap.as_mut());

        pixmap_to_rgba(pixmap)
    }
}

fn pixmap_to_rgba(pixmap: resvg::tiny_skia::Pixmap) -> BandeiraResult<RgbaImage> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| BandeiraError::render("pixmap to rgba buffer size mismatch"))
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    binary: &str,
) -> BandeiraResult<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BandeiraError::render(format!(
                        "{binary} timed out after {}s",
                        timeout.as_secs()
                    )));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                return Err(BandeiraError::render(format!(
                    "failed to wait for {binary}: {e}"
                )));
            }
        }
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique temp file path, removed on drop.
struct TempFileGuard(PathBuf);

impl TempFileGuard {
    fn new(ext: &str) -> Self {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(std::env::temp_dir().join(format!(
            "bandeiras_raster_{}_{n}.{ext}",
            std::process::id()
        )))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
