//! Idempotent artifact writes.
//!
//! A non-empty file at the target path short-circuits to `Skipped`, which is
//! what makes interrupted runs safely resumable. Writes land in a temp file
//! in the destination directory and are renamed into place, so readers never
//! observe partial content.

use std::path::Path;

use crate::error::{BandeiraError, BandeiraResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
}

/// True when a non-empty artifact already exists at `path`.
///
/// Callers use this to skip the render step entirely, not just the write.
pub fn artifact_exists(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

pub fn write_artifact(path: &Path, bytes: &[u8]) -> BandeiraResult<WriteOutcome> {
    if artifact_exists(path) {
        return Ok(WriteOutcome::Skipped);
    }

    ensure_parent_dir(path)?;

    let tmp = path.with_extension(format!(
        "{}.tmp{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or("bin"),
        std::process::id()
    ));
    std::fs::write(&tmp, bytes).map_err(|e| BandeiraError::write(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        BandeiraError::write(path, e)
    })?;

    Ok(WriteOutcome::Written)
}

pub fn ensure_parent_dir(path: &Path) -> BandeiraResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BandeiraError::write(parent, e))?;
    }
    Ok(())
}
