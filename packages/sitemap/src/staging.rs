//! On-disk staging layout: `<root>/xml` and `<root>/ndjson`.

use std::path::{Path, PathBuf};

use crate::error::{Result, SitemapError};

pub const NDJSON_EXTENSION: &str = "ndjson";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDirs {
    pub root: PathBuf,
    pub xml: PathBuf,
    pub ndjson: PathBuf,
}

impl StagingDirs {
    /// Paths only; nothing is created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            xml: root.join("xml"),
            ndjson: root.join("ndjson"),
            root,
        }
    }

    /// Create both directories. Failure here is fatal for a run.
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let dirs = Self::new(root);
        for dir in [&dirs.xml, &dirs.ndjson] {
            std::fs::create_dir_all(dir).map_err(|e| SitemapError::io(dir, e))?;
        }
        Ok(dirs)
    }

    /// Staged NDJSON files in lexicographic order. A missing directory
    /// means nothing has been staged yet.
    pub fn ndjson_files(&self) -> Result<Vec<PathBuf>> {
        list_with_extension(&self.ndjson, NDJSON_EXTENSION)
    }
}

fn list_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SitemapError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in read_dir {
        let path = entry.map_err(|e| SitemapError::io(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
