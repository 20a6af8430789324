//! Rendering pipeline for Brazilian municipality flag icons.
//!
//! One raw flag per municipality in, a deterministic artifact matrix out:
//! four styles (`full`, `rounded`, `circle`, `square-rounded`), each as an
//! SVG wrapper plus PNG at base and 4× resolution, laid out as
//! `{style}/{svg|png-200|png-800}/{UF}/{ibge}-{slug}-{suffix}.{ext}`.
#![forbid(unsafe_code)]

pub mod artifact;
pub mod catalog;
pub mod coverage;
pub mod error;
pub mod mask;
pub mod normalize;
pub mod rasterize;
pub mod render;
pub mod scheduler;
pub mod style;
pub mod writer;

pub use artifact::{ArtifactFormat, OutputLayout, artifact_rel_path};
pub use catalog::{Municipality, load_catalog};
pub use coverage::{Database, aggregate, write_database};
pub use error::{BandeiraError, BandeiraResult};
pub use rasterize::{RasterizerKind, VectorRasterizer, create_rasterizer};
pub use render::RenderOpts;
pub use scheduler::{CancelFlag, RunOpts, RunReport, run};
pub use style::{STYLES, StyleSpec};
