//! Batch scheduling: one independent task per municipality over a bounded
//! worker pool.
//!
//! A task's failure is captured in the run report and never aborts sibling
//! tasks or the pool; the batch always runs to completion. Cancellation is
//! cooperative between units: in-flight tasks finish, queued ones are not
//! started.

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use rayon::prelude::*;

use crate::{
    artifact::OutputLayout,
    catalog::Municipality,
    error::{BandeiraError, BandeiraResult},
    normalize::SourceImage,
    rasterize::VectorRasterizer,
    render::{EntityArtifacts, RenderOpts, StyleFailure, render_entity},
};

#[derive(Clone, Copy, Debug)]
pub struct RunOpts {
    /// Worker pool size; must be >= 1.
    pub workers: usize,
    pub render: RenderOpts,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            workers: 4,
            render: RenderOpts::default(),
        }
    }
}

/// Shared cancellation flag, checked before each unit starts.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
enum EntityOutcome {
    Rendered(EntityArtifacts),
    /// No catalogued source, or the source file is absent on disk.
    Skipped,
    Failed(String),
    NotStarted,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Entities whose task actually ran (everything but cancelled).
    pub processed: usize,
    pub succeeded: usize,
    /// Entities with at least one style failure but not a total loss.
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub artifacts_written: usize,
    pub artifacts_skipped: usize,
    /// Entity-level failures: (ibge_code, cause).
    pub failures: Vec<(u32, String)>,
    /// Per-style failures of partially-rendered entities.
    pub style_failures: Vec<(u32, StyleFailure)>,
}

impl RunReport {
    fn absorb(&mut self, ibge_code: u32, outcome: EntityOutcome) {
        match outcome {
            EntityOutcome::NotStarted => {
                self.cancelled += 1;
                return;
            }
            EntityOutcome::Skipped => {
                self.skipped += 1;
            }
            EntityOutcome::Failed(cause) => {
                self.failed += 1;
                self.failures.push((ibge_code, cause));
            }
            EntityOutcome::Rendered(art) => {
                self.artifacts_written += art.written;
                self.artifacts_skipped += art.skipped;
                if art.failures.is_empty() {
                    self.succeeded += 1;
                } else {
                    self.partial += 1;
                    self.style_failures
                        .extend(art.failures.into_iter().map(|f| (ibge_code, f)));
                }
            }
        }
        self.processed += 1;
    }
}

/// Render all catalogued municipalities over `opts.workers` threads.
pub fn run(
    municipios: &[Municipality],
    data_dir: &Path,
    layout: &OutputLayout,
    rasterizer: &dyn VectorRasterizer,
    opts: RunOpts,
    cancel: &CancelFlag,
) -> BandeiraResult<RunReport> {
    let pool = build_worker_pool(opts.workers)?;
    tracing::debug!(
        entities = municipios.len(),
        workers = opts.workers,
        rasterizer = rasterizer.label(),
        "starting batch"
    );

    let outcomes: Vec<(u32, EntityOutcome)> = pool.install(|| {
        municipios
            .par_iter()
            .map(|mun| {
                let outcome =
                    process_entity(mun, data_dir, layout, rasterizer, opts.render, cancel);
                (mun.ibge_code, outcome)
            })
            .collect()
    });

    let mut report = RunReport::default();
    for (ibge_code, outcome) in outcomes {
        report.absorb(ibge_code, outcome);
    }

    tracing::debug!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        "batch finished"
    );
    Ok(report)
}

fn process_entity(
    mun: &Municipality,
    data_dir: &Path,
    layout: &OutputLayout,
    rasterizer: &dyn VectorRasterizer,
    render_opts: RenderOpts,
    cancel: &CancelFlag,
) -> EntityOutcome {
    if cancel.is_cancelled() {
        return EntityOutcome::NotStarted;
    }

    let Some(source_path) = mun.source_path(data_dir) else {
        return EntityOutcome::Skipped;
    };

    let source = match SourceImage::open(&source_path) {
        Ok(source) => source,
        Err(BandeiraError::SourceMissing(path)) => {
            tracing::warn!(
                ibge = mun.ibge_code,
                source = %path.display(),
                "catalogued source file is missing, skipping"
            );
            return EntityOutcome::Skipped;
        }
        Err(e) => return EntityOutcome::Failed(e.to_string()),
    };

    match render_entity(mun, &source, layout, rasterizer, render_opts) {
        Ok(artifacts) => EntityOutcome::Rendered(artifacts),
        Err(e) => EntityOutcome::Failed(e.to_string()),
    }
}

fn build_worker_pool(workers: usize) -> BandeiraResult<rayon::ThreadPool> {
    if workers == 0 {
        return Err(BandeiraError::validation("workers must be >= 1"));
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| BandeiraError::validation(format!("failed to build worker pool: {e}")))
}
