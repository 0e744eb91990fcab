//! Gzip detection and lenient decompression.

use std::io::Read;

use flate2::read::MultiGzDecoder;
use tracing::debug;

/// A payload is treated as gzip when the URL ends in `.gz` or the
/// content type mentions gzip.
pub fn is_gzip(url: &str, content_type: Option<&str>) -> bool {
    url.ends_with(".gz")
        || content_type
            .map(|ct| ct.to_ascii_lowercase().contains("gzip"))
            .unwrap_or(false)
}

/// Decompress `payload` when `gzip` is set. A payload that fails to
/// decompress is returned unchanged (servers often send already-inflated
/// bodies under a `.gz` name).
pub fn decompress_if_gzip(payload: Vec<u8>, gzip: bool) -> Vec<u8> {
    if !gzip {
        return payload;
    }

    let mut inflated = Vec::with_capacity(payload.len().saturating_mul(4));
    match MultiGzDecoder::new(payload.as_slice()).read_to_end(&mut inflated) {
        Ok(_) => inflated,
        Err(e) => {
            debug!(error = %e, bytes = payload.len(), "Gzip decode failed, using payload as plain XML");
            payload
        }
    }
}
