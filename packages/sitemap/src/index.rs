//! Sitemap index document parsing.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::{info, warn};

use crate::error::{Result, SitemapError};
use crate::gzip::{decompress_if_gzip, is_gzip};
use crate::http::ResilientClient;
use crate::types::SitemapIndexEntry;

/// The sitemaps.org protocol namespace.
pub const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

/// Locale the ingest targets by default.
pub const DEFAULT_LOCALE: &str = "en-us";

const INDEX_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
enum IndexField {
    Loc,
    Lastmod,
}

/// Parse `<sitemapindex>` XML into its `<sitemap>` children.
///
/// Only elements in the sitemaps.org namespace count. Children without a
/// non-empty `<loc>` are skipped.
pub fn parse_index_xml(xml: &[u8], source_name: &str) -> Result<Vec<SitemapIndexEntry>> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut in_sitemap = false;
    let mut field: Option<IndexField> = None;
    let mut loc = String::new();
    let mut lastmod = String::new();

    let xml_error = |message: String| SitemapError::Xml {
        source_name: source_name.to_string(),
        message,
    };

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                depth += 1;
                let in_ns = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == SITEMAP_NS);
                match (depth, in_ns, e.local_name().as_ref()) {
                    (2, true, b"sitemap") => {
                        in_sitemap = true;
                        loc.clear();
                        lastmod.clear();
                    }
                    (3, true, b"loc") if in_sitemap => field = Some(IndexField::Loc),
                    (3, true, b"lastmod") if in_sitemap => field = Some(IndexField::Lastmod),
                    _ => {}
                }
            }
            Ok((_, Event::End(_))) => {
                match depth {
                    3 => field = None,
                    2 if in_sitemap => {
                        in_sitemap = false;
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            let lastmod = lastmod.trim();
                            entries.push(SitemapIndexEntry {
                                loc: loc.to_string(),
                                lastmod: (!lastmod.is_empty()).then(|| lastmod.to_string()),
                            });
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok((_, Event::Text(t))) if depth == 3 => {
                if let Some(field) = field {
                    let text = t.unescape().map_err(|e| xml_error(e.to_string()))?;
                    match field {
                        IndexField::Loc => loc.push_str(&text),
                        IndexField::Lastmod => lastmod.push_str(&text),
                    }
                }
            }
            Ok((_, Event::CData(c))) if depth == 3 => {
                let text = String::from_utf8_lossy(&c);
                match field {
                    Some(IndexField::Loc) => loc.push_str(&text),
                    Some(IndexField::Lastmod) => lastmod.push_str(&text),
                    None => {}
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(e.to_string())),
        }
        buf.clear();
    }

    Ok(entries)
}

/// Keep entries whose `loc` contains the locale marker.
pub fn filter_locale(entries: Vec<SitemapIndexEntry>, locale: &str) -> Vec<SitemapIndexEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.loc.contains(locale))
        .collect()
}

/// Fetches an index document and lists its locale-matching children.
#[derive(Debug, Clone)]
pub struct IndexParser {
    client: ResilientClient,
    locale: String,
}

impl IndexParser {
    pub fn new(client: ResilientClient) -> Self {
        Self {
            client,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Fetch failures propagate; malformed XML is logged and yields no entries.
    pub async fn list_entries(&self, index_url: &str) -> Result<Vec<SitemapIndexEntry>> {
        let response = self
            .client
            .fetch(index_url, INDEX_TIMEOUT)
            .await?
            .error_for_status()?;

        let gzip = is_gzip(index_url, response.content_type());
        let body = decompress_if_gzip(response.body, gzip);

        let entries = match parse_index_xml(&body, index_url) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(index_url = %index_url, error = %e, "Sitemap index parse failed");
                return Ok(Vec::new());
            }
        };

        let total = entries.len();
        let matching = filter_locale(entries, &self.locale);
        info!(
            index_url = %index_url,
            locale = %self.locale,
            total,
            matching = matching.len(),
            "Listed sitemap index entries"
        );

        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap>
    <loc>https://example.com/sitembk-hotel-en-us.0000.xml.gz</loc>
    <lastmod>2024-05-01</lastmod>
  </sitemap>
  <sitemap>
    <loc>https://example.com/sitembk-hotel-de-de.0000.xml.gz</loc>
  </sitemap>
  <sitemap>
    <loc>   </loc>
  </sitemap>
  <sitemap>
    <lastmod>2024-05-02</lastmod>
  </sitemap>
</sitemapindex>"#;

    #[test]
    fn parses_children_with_optional_lastmod() {
        let entries = parse_index_xml(INDEX.as_bytes(), "test").unwrap();

        assert_eq!(
            entries,
            vec![
                SitemapIndexEntry::new("https://example.com/sitembk-hotel-en-us.0000.xml.gz")
                    .with_lastmod("2024-05-01"),
                SitemapIndexEntry::new("https://example.com/sitembk-hotel-de-de.0000.xml.gz"),
            ]
        );
    }

    #[test]
    fn filters_to_locale() {
        let entries = parse_index_xml(INDEX.as_bytes(), "test").unwrap();
        let en = filter_locale(entries, DEFAULT_LOCALE);

        assert_eq!(en.len(), 1);
        assert!(en[0].loc.contains("en-us"));
    }

    #[test]
    fn ignores_elements_outside_sitemap_namespace() {
        let xml = r#"<sitemapindex xmlns="http://example.com/other">
  <sitemap><loc>https://example.com/a-en-us.xml</loc></sitemap>
</sitemapindex>"#;

        assert!(parse_index_xml(xml.as_bytes(), "test").unwrap().is_empty());
    }

    #[test]
    fn accepts_prefixed_namespace() {
        let xml = r#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sm:sitemap><sm:loc>https://example.com/a-en-us.xml</sm:loc></sm:sitemap>
</sm:sitemapindex>"#;

        let entries = parse_index_xml(xml.as_bytes(), "test").unwrap();
        assert_eq!(entries, vec![SitemapIndexEntry::new("https://example.com/a-en-us.xml")]);
    }

    #[test]
    fn unescapes_entities_in_loc() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/s?a=1&amp;b=en-us</loc></sitemap>
</sitemapindex>"#;

        let entries = parse_index_xml(xml.as_bytes(), "test").unwrap();
        assert_eq!(entries[0].loc, "https://example.com/s?a=1&b=en-us");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/a.xml</wrong></sitemap>
</sitemapindex>"#;

        assert!(matches!(
            parse_index_xml(xml.as_bytes(), "test"),
            Err(SitemapError::Xml { .. })
        ));
    }
}
