//! The aggregator must agree with the writer's path scheme: whatever the
//! pipeline writes, a following aggregation pass must find.

use std::path::{Path, PathBuf};

use bandeiras::{
    CancelFlag, Municipality, OutputLayout, RunOpts, aggregate, rasterize::ResvgRasterizer, run,
    write_database,
};

struct TempDirGuard(PathBuf);

impl TempDirGuard {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "bandeiras_coverage_e2e_{}_{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn mun(ibge_code: u32, slug: &str, uf: &str, flag_local: Option<&str>) -> Municipality {
    Municipality {
        ibge_code,
        name: slug.to_string(),
        slug: slug.to_string(),
        uf: uf.to_string(),
        uf_name: String::new(),
        region: "SE".to_string(),
        region_name: "Sudeste".to_string(),
        flag_local: flag_local.map(str::to_string),
        flag_source: String::new(),
    }
}

fn write_flag(data_dir: &Path, rel: &str) {
    let path = data_dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="30" height="20">
            <rect width="30" height="20" fill="#009c3b"/></svg>"##,
    )
    .unwrap();
}

#[test]
fn aggregation_matches_what_the_pipeline_wrote() {
    let dir = TempDirGuard::new("roundtrip");
    write_flag(dir.path(), "raw-flags/SP/3550308.svg");
    write_flag(dir.path(), "raw-flags/RJ/3304557.svg");

    let catalogue = vec![
        mun(3550308, "sao-paulo", "SP", Some("raw-flags/SP/3550308.svg")),
        mun(3304557, "rio-de-janeiro", "RJ", Some("raw-flags/RJ/3304557.svg")),
        // Catalogued but never acquired: no source, no artifacts.
        mun(3106200, "belo-horizonte", "MG", None),
    ];
    let layout = OutputLayout::new(dir.path().join("dist"));

    let report = run(
        &catalogue,
        dir.path(),
        &layout,
        &ResvgRasterizer,
        RunOpts {
            workers: 2,
            render: Default::default(),
        },
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 1);

    let db = aggregate(&catalogue, &layout);

    assert_eq!(db.stats.total_municipios, 3);
    assert_eq!(db.stats.total_with_raw_flag, 2);
    assert_eq!(db.stats.total_with_icons, 2);
    assert_eq!(db.stats.raw_coverage_pct, 66.7);
    assert_eq!(db.stats.total_ufs, 3);

    // Rendered entities carry the full 12-entry icon map.
    let sp = db
        .municipios
        .iter()
        .find(|r| r.ibge_code == 3550308)
        .unwrap();
    assert!(sp.has_flag && sp.has_icons);
    assert_eq!(sp.icons.len(), 12);
    assert_eq!(
        sp.icons["circle_png-800"],
        "circle/png-800/SP/3550308-sao-paulo-circle.png"
    );
    assert_eq!(sp.icons["full_svg"], "full/svg/SP/3550308-sao-paulo-full.svg");

    // The never-acquired entity reports both facts false.
    let mg = db
        .municipios
        .iter()
        .find(|r| r.ibge_code == 3106200)
        .unwrap();
    assert!(!mg.has_flag && !mg.has_icons);
    assert!(mg.icons.is_empty());

    // Records are grouped and ordered for the by-uf variant.
    assert_eq!(db.by_uf["SP"].len(), 1);
    assert_eq!(db.by_uf["MG"][0].ibge_code, 3106200);
}

#[test]
fn database_files_land_on_disk() {
    let dir = TempDirGuard::new("files");
    write_flag(dir.path(), "raw-flags/SP/1.svg");
    let catalogue = vec![mun(1, "alpha", "SP", Some("raw-flags/SP/1.svg"))];
    let layout = OutputLayout::new(dir.path().join("dist"));

    run(
        &catalogue,
        dir.path(),
        &layout,
        &ResvgRasterizer,
        RunOpts {
            workers: 1,
            render: Default::default(),
        },
        &CancelFlag::new(),
    )
    .unwrap();

    let db = aggregate(&catalogue, &layout);
    let out = dir.path().join("database");
    write_database(&db, &out).unwrap();

    for file in ["municipios.json", "municipios-by-uf.json", "stats.json"] {
        let path = out.join(file);
        assert!(path.is_file(), "missing {file}");
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    // The flat record list parses back and matches the aggregation.
    let raw = std::fs::read_to_string(out.join("municipios.json")).unwrap();
    let records: Vec<bandeiras::coverage::CoverageRecord> = serde_json::from_str(&raw).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].has_icons);
}
