use std::path::{Path, PathBuf};

use crate::style::{STYLES, StyleSpec};

/// Output format / resolution of one artifact.
///
/// The label doubles as the directory segment between the style and the
/// state code in the output tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Svg,
    Png200,
    Png800,
}

impl ArtifactFormat {
    pub const ALL: [ArtifactFormat; 3] = [
        ArtifactFormat::Svg,
        ArtifactFormat::Png200,
        ArtifactFormat::Png800,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "svg",
            ArtifactFormat::Png200 => "png-200",
            ArtifactFormat::Png800 => "png-800",
        }
    }

    pub fn ext(&self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "svg",
            ArtifactFormat::Png200 | ArtifactFormat::Png800 => "png",
        }
    }
}

/// The two raster outputs and their scale over a style's base size.
pub const RASTER_FORMATS: [(ArtifactFormat, u32); 2] =
    [(ArtifactFormat::Png200, 1), (ArtifactFormat::Png800, 4)];

/// Relative path of one artifact, as a forward-slash string.
///
/// This is a pure function of its inputs; the coverage aggregator and the
/// output writer must agree on it exactly, so it lives here and nowhere else.
pub fn artifact_rel_path(
    style: &StyleSpec,
    format: ArtifactFormat,
    uf: &str,
    ibge_code: u32,
    slug: &str,
) -> String {
    format!(
        "{}/{}/{}/{}-{}-{}.{}",
        style.name,
        format.dir_name(),
        uf,
        ibge_code,
        slug,
        style.suffix,
        format.ext()
    )
}

/// Coverage-database key for one artifact kind, e.g. `circle_png-800`.
pub fn artifact_key(style: &StyleSpec, format: ArtifactFormat) -> String {
    format!("{}_{}", style.name, format.dir_name())
}

/// Root of the generated artifact tree.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(
        &self,
        style: &StyleSpec,
        format: ArtifactFormat,
        uf: &str,
        ibge_code: u32,
        slug: &str,
    ) -> PathBuf {
        self.root
            .join(artifact_rel_path(style, format, uf, ibge_code, slug))
    }

    /// All 12 expected (style × format) paths for one entity.
    pub fn expected_paths(&self, uf: &str, ibge_code: u32, slug: &str) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(STYLES.len() * ArtifactFormat::ALL.len());
        for style in &STYLES {
            for format in ArtifactFormat::ALL {
                out.push(self.artifact_path(style, format, uf, ibge_code, slug));
            }
        }
        out
    }
}
