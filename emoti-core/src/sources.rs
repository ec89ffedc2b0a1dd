//! Discovery of EmotiLang source files for batch compilation.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CoreError;

pub const SOURCE_EXTENSION: &str = "emoti";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the directory that was searched.
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    /// Where the generated JavaScript for this file goes, relative to the same root.
    pub fn output_path(&self) -> PathBuf {
        self.path.with_extension("js")
    }
}

/// Load every `.emoti` file below `root`, sorted by path.
pub fn load_source_files(root: impl AsRef<Path>) -> Result<Vec<SourceFile>, CoreError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(CoreError::MissingSourceDir(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| CoreError::SourceIo(err.into()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            let contents = fs::read_to_string(path)?;
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push(SourceFile {
                path: relative,
                contents,
            });
        }
    }
    Ok(files)
}
