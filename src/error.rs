use std::path::PathBuf;

pub type BandeiraResult<T> = Result<T, BandeiraError>;

#[derive(thiserror::Error, Debug)]
pub enum BandeiraError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("source missing: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("normalization failed for '{}': {msg}", path.display())]
    Normalization { path: PathBuf, msg: String },

    #[error("render error: {0}")]
    Render(String),

    #[error("write failed for '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BandeiraError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn normalization(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Normalization {
            path: path.into(),
            msg: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
