//! Coverage aggregation: reconcile the catalogue against the artifact tree.
//!
//! Rebuilt from scratch on every pass — records are a pure function of the
//! catalogue and the filesystem, so there is no incremental state to go
//! stale.

use std::{collections::BTreeMap, fs::File, io::BufWriter, path::Path};

use anyhow::Context as _;

use crate::{
    artifact::{ArtifactFormat, OutputLayout, artifact_key},
    catalog::Municipality,
    error::BandeiraResult,
    style::STYLES,
};

/// Per-entity derived coverage fact.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CoverageRecord {
    pub ibge_code: u32,
    pub name: String,
    pub slug: String,
    pub uf: String,
    #[serde(default)]
    pub uf_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub region_name: String,
    pub has_flag: bool,
    pub has_icons: bool,
    #[serde(default)]
    pub flag_source: String,
    /// Artifact kind (`{style}_{format}`) to tree-relative path, existing
    /// artifacts only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub icons: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct GroupStats {
    pub total: usize,
    pub with_flag: usize,
    pub with_icons: usize,
    pub coverage_pct: f64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub total_municipios: usize,
    pub total_with_raw_flag: usize,
    pub total_with_icons: usize,
    pub raw_coverage_pct: f64,
    pub icon_coverage_pct: f64,
    pub total_ufs: usize,
    pub styles: Vec<String>,
    pub formats: BTreeMap<String, Vec<String>>,
    pub by_uf: BTreeMap<String, GroupStats>,
    pub by_region: BTreeMap<String, GroupStats>,
}

/// The full reconciled database: flat records, the per-state grouping, and
/// the statistics document.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Database {
    pub municipios: Vec<CoverageRecord>,
    pub by_uf: BTreeMap<String, Vec<CoverageRecord>>,
    pub stats: Stats,
}

/// Probe the output tree for every catalogued municipality.
pub fn aggregate(catalogue: &[Municipality], layout: &OutputLayout) -> Database {
    let mut municipios = Vec::with_capacity(catalogue.len());
    let mut by_uf: BTreeMap<String, Vec<CoverageRecord>> = BTreeMap::new();
    let mut uf_groups: BTreeMap<String, GroupStats> = BTreeMap::new();
    let mut region_groups: BTreeMap<String, GroupStats> = BTreeMap::new();

    let mut total_with_flag = 0usize;
    let mut total_with_icons = 0usize;

    for mun in catalogue {
        let icons = existing_artifacts(mun, layout);
        let has_flag = mun
            .flag_local
            .as_deref()
            .is_some_and(|rel| !rel.is_empty());
        let has_icons = !icons.is_empty();

        if has_flag {
            total_with_flag += 1;
        }
        if has_icons {
            total_with_icons += 1;
        }

        let record = CoverageRecord {
            ibge_code: mun.ibge_code,
            name: mun.name.clone(),
            slug: mun.slug.clone(),
            uf: mun.uf.clone(),
            uf_name: mun.uf_name.clone(),
            region: mun.region.clone(),
            region_name: mun.region_name.clone(),
            has_flag,
            has_icons,
            flag_source: mun.flag_source.clone(),
            icons,
        };

        bump(uf_groups.entry(mun.uf.clone()).or_default(), has_flag, has_icons);
        bump(
            region_groups.entry(region_key(mun)).or_default(),
            has_flag,
            has_icons,
        );

        by_uf.entry(mun.uf.clone()).or_default().push(record.clone());
        municipios.push(record);
    }

    municipios.sort_by_key(|r| r.ibge_code);
    for records in by_uf.values_mut() {
        records.sort_by_key(|r| r.ibge_code);
    }
    for group in uf_groups.values_mut().chain(region_groups.values_mut()) {
        group.coverage_pct = percentage(group.with_icons, group.total);
    }

    let total = catalogue.len();
    let stats = Stats {
        total_municipios: total,
        total_with_raw_flag: total_with_flag,
        total_with_icons,
        raw_coverage_pct: percentage(total_with_flag, total),
        icon_coverage_pct: percentage(total_with_icons, total),
        total_ufs: uf_groups.len(),
        styles: STYLES.iter().map(|s| s.name.to_string()).collect(),
        formats: format_inventory(),
        by_uf: uf_groups,
        by_region: region_groups,
    };

    Database {
        municipios,
        by_uf,
        stats,
    }
}

/// Write the three database files into `out_dir`.
pub fn write_database(db: &Database, out_dir: &Path) -> BandeiraResult<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create database dir '{}'", out_dir.display()))?;

    write_json(&out_dir.join("municipios.json"), &db.municipios)?;
    write_json(&out_dir.join("municipios-by-uf.json"), &db.by_uf)?;
    write_json(&out_dir.join("stats.json"), &db.stats)?;
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> BandeiraResult<()> {
    let f = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), value)
        .with_context(|| format!("serialize '{}'", path.display()))?;
    Ok(())
}

fn existing_artifacts(mun: &Municipality, layout: &OutputLayout) -> BTreeMap<String, String> {
    let mut icons = BTreeMap::new();
    for style in &STYLES {
        for format in ArtifactFormat::ALL {
            let path = layout.artifact_path(style, format, &mun.uf, mun.ibge_code, &mun.slug);
            if path.is_file() {
                icons.insert(
                    artifact_key(style, format),
                    crate::artifact::artifact_rel_path(
                        style,
                        format,
                        &mun.uf,
                        mun.ibge_code,
                        &mun.slug,
                    ),
                );
            }
        }
    }
    icons
}

fn region_key(mun: &Municipality) -> String {
    if mun.region_name.is_empty() {
        mun.region.clone()
    } else {
        mun.region_name.clone()
    }
}

fn bump(group: &mut GroupStats, has_flag: bool, has_icons: bool) {
    group.total += 1;
    if has_flag {
        group.with_flag += 1;
    }
    if has_icons {
        group.with_icons += 1;
    }
}

fn format_inventory() -> BTreeMap<String, Vec<String>> {
    let mut formats = BTreeMap::new();
    for format in ArtifactFormat::ALL {
        formats.insert(
            format.dir_name().to_string(),
            STYLES
                .iter()
                .map(|s| format!("{}/{}", s.name, format.dir_name()))
                .collect(),
        );
    }
    formats
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
