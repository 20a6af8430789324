use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::error::{BandeiraError, BandeiraResult};

/// One catalogued municipality, as produced by the upstream database build.
///
/// The pipeline consumes these read-only. `flag_local` is the data-dir
/// relative path of the raw source flag, when one was acquired.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Municipality {
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
    #[serde(default)]
    pub flag_local: Option<String>,
    #[serde(default)]
    pub flag_source: String,
}

impl Municipality {
    /// Resolve the raw flag path against the data directory, if catalogued.
    pub fn source_path(&self, data_dir: &Path) -> Option<PathBuf> {
        self.flag_local
            .as_deref()
            .filter(|rel| !rel.is_empty())
            .map(|rel| data_dir.join(rel))
    }

    pub fn validate(&self) -> BandeiraResult<()> {
        if self.ibge_code == 0 {
            return Err(BandeiraError::validation("ibge_code must be non-zero"));
        }
        if self.slug.is_empty() {
            return Err(BandeiraError::validation(format!(
                "municipality {} has an empty slug",
                self.ibge_code
            )));
        }
        if self.uf.is_empty() {
            return Err(BandeiraError::validation(format!(
                "municipality {} has an empty uf",
                self.ibge_code
            )));
        }
        Ok(())
    }
}

/// Load the municipality catalogue from a JSON array file.
pub fn load_catalog(path: &Path) -> BandeiraResult<Vec<Municipality>> {
    let f = File::open(path).with_context(|| format!("open catalogue '{}'", path.display()))?;
    let r = BufReader::new(f);
    let municipios: Vec<Municipality> =
        serde_json::from_reader(r).with_context(|| "parse catalogue JSON")?;

    for mun in &municipios {
        mun.validate()?;
    }

    Ok(municipios)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sao_paulo() -> Municipality {
        Municipality {
            ibge_code: 3550308,
            name: "São Paulo".to_string(),
            slug: "sao-paulo".to_string(),
            uf: "SP".to_string(),
            uf_name: "São Paulo".to_string(),
            region: "SE".to_string(),
            region_name: "Sudeste".to_string(),
            flag_local: Some("raw-flags/SP/3550308-sao-paulo.svg".to_string()),
            flag_source: "wikipedia".to_string(),
        }
    }

    #[test]
    fn json_roundtrip_keeps_identity() {
        let mun = sao_paulo();
        let s = serde_json::to_string(&mun).unwrap();
        let de: Municipality = serde_json::from_str(&s).unwrap();
        assert_eq!(de.ibge_code, 3550308);
        assert_eq!(de.slug, "sao-paulo");
        assert_eq!(de.flag_local.as_deref(), Some("raw-flags/SP/3550308-sao-paulo.svg"));
    }

    #[test]
    fn optional_fields_default() {
        let de: Municipality = serde_json::from_str(
            r#"{"ibge_code": 1200013, "name": "Acrelândia", "slug": "acrelandia", "uf": "AC"}"#,
        )
        .unwrap();
        assert!(de.flag_local.is_none());
        assert!(de.uf_name.is_empty());
        assert!(de.flag_source.is_empty());
    }

    #[test]
    fn source_path_joins_data_dir() {
        let mun = sao_paulo();
        let p = mun.source_path(Path::new("/data")).unwrap();
        assert_eq!(p, Path::new("/data/raw-flags/SP/3550308-sao-paulo.svg"));

        let mut no_flag = mun;
        no_flag.flag_local = None;
        assert!(no_flag.source_path(Path::new("/data")).is_none());
    }

    #[test]
    fn validate_rejects_empty_slug() {
        let mut mun = sao_paulo();
        mun.slug = String::new();
        assert!(mun.validate().is_err());
    }
}
