use std::path::PathBuf;
use thiserror::Error;

/// Failures while rendering. Everything but [`RenderError::Discovery`] is
/// scoped to a single file and never stops the batch.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot list diagram sources in {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("could not extract encoded part from URL: {0}")]
    UnrecognizedEncoding(String),

    #[error("no valid image after retry: {0}")]
    Exhausted(String),
}

impl RenderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }
}
