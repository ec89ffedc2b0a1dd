use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("unsupported emit format: {0}")]
    UnsupportedFormat(String),
    #[error("source directory was not found at {0}")]
    MissingSourceDir(PathBuf),
    #[error("compilation failed:\n{summary}")]
    Compilation { summary: String },
    #[error("failed to encode compile response: {0}")]
    Encode(#[from] serde_json::Error),
}
