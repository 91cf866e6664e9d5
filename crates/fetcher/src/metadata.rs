//! Parsing of the storage backend's skylink-metadata response header.

use reqwest::header::HeaderMap;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ParsedMetadata {
    pub filename: String,
    pub length: i64,
}

const METADATA_HEADER: &str = "skynet-skylink-metadata";

/// Extract and decode `{filename, length}` from the storage backend's
/// metadata response header. Returns `None` if the header is absent or
/// doesn't parse, which the caller treats as a fetch failure to retry.
pub fn parse_headers(headers: &HeaderMap) -> Option<ParsedMetadata> {
    let raw = headers.get(METADATA_HEADER)?.to_str().ok()?;
    let parsed: ParsedMetadata = serde_json::from_str(raw).ok()?;
    (parsed.length >= 0).then_some(parsed)
}
