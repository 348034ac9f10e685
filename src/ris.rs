//! RIS import: turn a reference-manager export into a collection document
//! that can be registered as a local source.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::collection::types::{RawCategory, RawCollection, RawSourceDocument};
use crate::text::decode_bytes;

pub const RIS_COLLECTION_NAME: &str = "Local RMS";
pub const RIS_DESIGNATOR: &str = "LOC";
pub const RIS_CATEGORY_NAME: &str = "Imported References";
pub const DEFAULT_OUTPUT_FILE: &str = "localrms.json";

#[derive(Debug, thiserror::Error)]
pub enum RisError {
    #[error("no RIS entries found")]
    NoEntries,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tags of one RIS record. A repeated tag keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RisEntry {
    pub tags: BTreeMap<String, String>,
}

impl RisEntry {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    /// Map to a collection item, defaulting the fields a note always shows.
    pub fn to_item(&self) -> Map<String, Value> {
        let field = |tag: &str, default: &str| self.get(tag).unwrap_or(default).to_string();
        let ris = serde_json::to_string_pretty(&self.tags).unwrap_or_default();

        let mut item = Map::new();
        item.insert("title".into(), json!(field("TI", "Untitled")));
        item.insert("author".into(), json!(field("AU", "Unknown Author")));
        item.insert("publisher".into(), json!(field("PB", "Unknown Publisher")));
        item.insert("date".into(), json!(field("PY", "No Date")));
        item.insert("url".into(), json!(field("UR", "")));
        item.insert("description".into(), json!(field("ST", "")));
        item.insert("ris".into(), json!(ris));
        item
    }
}

/// Parse RIS text. Lines look like `TI  - Title`; `TY` opens a new record.
pub fn parse_ris(text: &str) -> Vec<RisEntry> {
    let mut entries = Vec::new();
    let mut current = RisEntry::default();

    for line in text.lines() {
        let Some((tag, value)) = parse_line(line) else {
            continue;
        };
        if tag == "TY" && !current.tags.is_empty() {
            entries.push(std::mem::take(&mut current));
        }
        current.tags.insert(tag.to_string(), value.to_string());
    }

    if !current.tags.is_empty() {
        entries.push(current);
    }
    debug!(entries = entries.len(), "RIS parsed");
    entries
}

/// `^[A-Z0-9]{2}  - (.*)$`
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let tag = line.get(..2)?;
    if !tag.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return None;
    }
    let value = line.get(2..)?.strip_prefix("  - ")?;
    Some((tag, value))
}

pub fn ris_to_document(entries: &[RisEntry]) -> Result<RawSourceDocument, RisError> {
    if entries.is_empty() {
        return Err(RisError::NoEntries);
    }
    Ok(RawSourceDocument {
        collection: Some(RawCollection {
            name: Some(RIS_COLLECTION_NAME.into()),
            designator: Some(RIS_DESIGNATOR.into()),
            url: None,
            categories: Some(vec![RawCategory {
                name: Some(RIS_CATEGORY_NAME.into()),
                items: Some(entries.iter().map(|e| Value::Object(e.to_item())).collect()),
            }]),
        }),
    })
}

/// Convert a RIS file into a collection JSON file and return the entry count.
pub fn import_file(input: &Path, output: &Path) -> Result<usize, RisError> {
    let bytes = std::fs::read(input)?;
    let entries = parse_ris(&decode_bytes(&bytes));
    let document = ris_to_document(&entries)?;
    std::fs::write(output, serde_json::to_string_pretty(&document)?)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        entries = entries.len(),
        "RIS imported"
    );
    Ok(entries.len())
}
