use std::path::PathBuf;

use thiserror::Error;

/// Failures outside the respondent flow: loading documents, recovery I/O and
/// template rendering. Validation problems are reported as data instead.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("failed to parse form document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("recovery snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_cbor::Error),
    #[error("recovery storage error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

pub type Result<T> = std::result::Result<T, FormError>;
