//! NDJSON staging of parsed sitemap records.
//!
//! Each source XML file maps to exactly one `<ndjson_dir>/<stem>.ndjson`. The
//! output is rebuilt from scratch on every run and swapped in by rename, so
//! re-materializing the same file never appends duplicates.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::{Result, SitemapError};
use crate::staging::NDJSON_EXTENSION;
use crate::stream::SitemapRecords;

#[derive(Debug, Clone)]
pub struct Materializer {
    ndjson_dir: PathBuf,
}

impl Materializer {
    pub fn new(ndjson_dir: impl Into<PathBuf>) -> Self {
        Self {
            ndjson_dir: ndjson_dir.into(),
        }
    }

    /// Output path for a source file: its stem plus `.ndjson`.
    pub fn ndjson_path_for(&self, xml_path: &Path) -> PathBuf {
        let stem = xml_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ndjson_dir
            .join(format!("{}.{}", stem, NDJSON_EXTENSION))
    }

    /// Stream `xml_path` into its NDJSON file and return the output path.
    ///
    /// Blocking; run it on a blocking thread from async code. A file that
    /// fails to parse leaves any previous NDJSON output untouched.
    pub fn materialize(&self, xml_path: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.ndjson_dir)
            .map_err(|e| SitemapError::io(&self.ndjson_dir, e))?;

        let out_path = self.ndjson_path_for(xml_path);
        let tmp_path = out_path.with_file_name(format!(
            ".{}.part",
            out_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        let written = write_records(xml_path, &tmp_path);
        let count = match written {
            Ok(count) => count,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        std::fs::rename(&tmp_path, &out_path).map_err(|e| SitemapError::io(&out_path, e))?;

        info!(count, path = %out_path.display(), "Exported sitemap entries to NDJSON");
        Ok(out_path)
    }

    /// Materialize every file with at most `workers` parses running.
    ///
    /// Results come back in input order; failures are logged and returned
    /// alongside their source path.
    pub async fn materialize_all(
        &self,
        xml_paths: Vec<PathBuf>,
        workers: usize,
    ) -> Vec<(PathBuf, Result<PathBuf>)> {
        stream::iter(xml_paths)
            .map(|xml_path| {
                let materializer = self.clone();
                async move {
                    let source = xml_path.clone();
                    let result =
                        tokio::task::spawn_blocking(move || materializer.materialize(&xml_path))
                            .await
                            .map_err(SitemapError::from)
                            .and_then(|inner| inner);
                    if let Err(e) = &result {
                        warn!(path = %source.display(), error = %e, "NDJSON export failed");
                    }
                    (source, result)
                }
            })
            .buffered(workers.max(1))
            .collect()
            .await
    }
}

fn write_records(xml_path: &Path, tmp_path: &Path) -> Result<usize> {
    let mut records = SitemapRecords::open(xml_path)?;
    let file = File::create(tmp_path).map_err(|e| SitemapError::io(tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0usize;

    for record in records.by_ref() {
        serde_json::to_writer(&mut writer, &record)?;
        writer
            .write_all(b"\n")
            .map_err(|e| SitemapError::io(tmp_path, e))?;
        count += 1;
    }

    if let Some(message) = records.error() {
        return Err(SitemapError::Xml {
            source_name: xml_path.display().to_string(),
            message: message.to_string(),
        });
    }

    writer.flush().map_err(|e| SitemapError::io(tmp_path, e))?;
    Ok(count)
}
