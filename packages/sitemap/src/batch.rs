//! Fixed-width batching over one staged NDJSON file.
//!
//! Only full batches are produced: a trailing group smaller than the group
//! size is dropped, so every downstream crawl sees the same width. Iteration
//! also stops once `max_batches` have been produced, bounding the work of a
//! single scheduled run. Batches never span two files because each iterator
//! reads exactly one.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SitemapError};
use crate::types::Batch;

/// The only field batching reads; lines without a usable `loc` are skipped.
#[derive(Deserialize)]
struct StagedLine {
    #[serde(default)]
    loc: Option<String>,
}

pub struct Batches {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    group_size: usize,
    max_batches: usize,
    produced: usize,
    finished: bool,
}

impl Batches {
    /// A `group_size` of zero is coerced to one so iteration always advances.
    pub fn open(ndjson_path: &Path, group_size: usize, max_batches: usize) -> Result<Self> {
        let file = File::open(ndjson_path).map_err(|e| SitemapError::io(ndjson_path, e))?;

        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: ndjson_path.to_path_buf(),
            group_size: group_size.max(1),
            max_batches,
            produced: 0,
            finished: false,
        })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let mut urls = Vec::with_capacity(self.group_size);

        for line in self.lines.by_ref() {
            let line = line.map_err(|e| SitemapError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let staged: StagedLine = serde_json::from_str(&line)?;
            let Some(loc) = staged.loc.filter(|loc| !loc.is_empty()) else {
                continue;
            };

            urls.push(loc);
            if urls.len() == self.group_size {
                return Ok(Some(Batch { urls }));
            }
        }

        Ok(None)
    }
}

impl Iterator for Batches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.produced >= self.max_batches {
            return None;
        }

        match self.next_batch() {
            Ok(Some(batch)) => {
                self.produced += 1;
                Some(Ok(batch))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Convenience wrapper for [`Batches::open`].
pub fn iterate(ndjson_path: &Path, group_size: usize, max_batches: usize) -> Result<Batches> {
    Batches::open(ndjson_path, group_size, max_batches)
}
