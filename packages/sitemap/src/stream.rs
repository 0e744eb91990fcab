//! Streaming `<urlset>` parser.
//!
//! Reads one event at a time from a buffered file handle and yields a
//! [`SitemapRecord`] for each completed `<url>` element. Nothing from earlier
//! records is retained, so memory stays flat no matter how many entries the
//! file holds (sitemaps routinely carry hundreds of thousands of URLs).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::error::{Result, SitemapError};
use crate::types::SitemapRecord;

/// Scratch buffer capacity above which it is released after an event.
const SCRATCH_COMPACT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Url,
    Loc,
    Lastmod,
    Changefreq,
    Other,
}

impl Tag {
    fn from_local_name(name: &[u8]) -> Self {
        match name {
            b"url" => Tag::Url,
            b"loc" => Tag::Loc,
            b"lastmod" => Tag::Lastmod,
            b"changefreq" => Tag::Changefreq,
            _ => Tag::Other,
        }
    }

    fn is_field(self) -> bool {
        matches!(self, Tag::Loc | Tag::Lastmod | Tag::Changefreq)
    }
}

/// One parser step, detached from the reader's scratch buffer.
enum Step {
    Open(Tag),
    Close(Tag),
    Text(String),
    Skip,
    Eof,
    Fail(String),
}

/// Fields collected for the `<url>` currently open.
#[derive(Default)]
struct PendingUrl {
    depth: usize,
    field: Option<Tag>,
    text: String,
    loc: Option<String>,
    lastmod: Option<String>,
    changefreq: Option<String>,
}

impl PendingUrl {
    fn commit_field(&mut self) {
        let Some(field) = self.field.take() else {
            return;
        };
        let value = self.text.trim();
        if value.is_empty() {
            self.text.clear();
            return;
        }
        let value = value.to_string();
        self.text.clear();
        match field {
            Tag::Loc => self.loc = Some(value),
            Tag::Lastmod => self.lastmod = Some(value),
            Tag::Changefreq => self.changefreq = Some(value),
            Tag::Url | Tag::Other => {}
        }
    }

    fn into_record(self) -> Option<SitemapRecord> {
        self.loc.map(|loc| SitemapRecord {
            loc,
            lastmod: self.lastmod,
            changefreq: self.changefreq,
        })
    }
}

/// Lazy, finite, non-restartable sequence of records from one sitemap.
///
/// A parse error ends the sequence; it is logged and kept in [`error`].
///
/// [`error`]: SitemapRecords::error
pub struct SitemapRecords<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    source_name: String,
    depth: usize,
    pending: Option<PendingUrl>,
    yielded: usize,
    error: Option<String>,
    finished: bool,
}

impl SitemapRecords<Box<dyn BufRead + Send>> {
    /// Open a plain `.xml` file or a gzip `.gz` file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SitemapError::io(path, e))?;

        let reader: Box<dyn BufRead + Send> =
            if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
                Box::new(BufReader::new(MultiGzDecoder::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };

        Ok(Self::from_reader(reader, path.display().to_string()))
    }
}

impl<R: BufRead> SitemapRecords<R> {
    pub fn from_reader(reader: R, source_name: impl Into<String>) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            source_name: source_name.into(),
            depth: 0,
            pending: None,
            yielded: 0,
            error: None,
            finished: false,
        }
    }

    /// Parse error that ended the sequence early, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Records yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    fn read_step(&mut self) -> Step {
        self.buf.clear();
        let step = match self.reader.read_event_into(&mut self.buf) {
            Ok(Event::Start(e)) => Step::Open(Tag::from_local_name(e.local_name().as_ref())),
            Ok(Event::End(e)) => Step::Close(Tag::from_local_name(e.local_name().as_ref())),
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(text) => Step::Text(text.into_owned()),
                Err(e) => Step::Fail(e.to_string()),
            },
            Ok(Event::CData(c)) => Step::Text(String::from_utf8_lossy(&c).into_owned()),
            Ok(Event::Eof) => Step::Eof,
            Ok(_) => Step::Skip,
            Err(e) => Step::Fail(e.to_string()),
        };

        if self.buf.capacity() > SCRATCH_COMPACT_BYTES {
            self.buf = Vec::new();
        }

        step
    }

    fn fail(&mut self, message: String) {
        warn!(
            source = %self.source_name,
            records = self.yielded,
            error = %message,
            "Sitemap XML parse failed"
        );
        self.error = Some(message);
        self.finished = true;
    }
}

impl<R: BufRead> Iterator for SitemapRecords<R> {
    type Item = SitemapRecord;

    fn next(&mut self) -> Option<SitemapRecord> {
        if self.finished {
            return None;
        }

        loop {
            match self.read_step() {
                Step::Open(tag) => {
                    self.depth += 1;
                    match self.pending.as_mut() {
                        None if tag == Tag::Url => {
                            self.pending = Some(PendingUrl {
                                depth: self.depth,
                                ..Default::default()
                            });
                        }
                        Some(url) if tag.is_field() && self.depth == url.depth + 1 => {
                            url.field = Some(tag);
                            url.text.clear();
                        }
                        _ => {}
                    }
                }
                Step::Text(text) => {
                    if let Some(url) = self.pending.as_mut() {
                        if url.field.is_some() && self.depth == url.depth + 1 {
                            url.text.push_str(&text);
                        }
                    }
                }
                Step::Close(tag) => {
                    let depth = self.depth;
                    self.depth = self.depth.saturating_sub(1);

                    let Some(url) = self.pending.as_mut() else {
                        continue;
                    };

                    if depth == url.depth + 1 {
                        url.commit_field();
                    } else if depth == url.depth && tag == Tag::Url {
                        let record = self.pending.take().and_then(PendingUrl::into_record);
                        if let Some(record) = record {
                            self.yielded += 1;
                            return Some(record);
                        }
                    }
                }
                Step::Skip => {}
                Step::Eof if self.depth > 0 || self.pending.is_some() => {
                    self.fail("unexpected end of document".to_string());
                    return None;
                }
                Step::Eof => {
                    self.finished = true;
                    return None;
                }
                Step::Fail(message) => {
                    self.fail(message);
                    return None;
                }
            }
        }
    }
}
