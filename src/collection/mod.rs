//! Normalized collection model: raw source documents flattened into items
//! stamped with their provenance.

pub mod types;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use types::{RawCollection, RawItem, RawSourceDocument, scalar_to_string};

pub const DEFAULT_COLLECTION_NAME: &str = "Unknown Collection";
pub const DEFAULT_DESIGNATOR: &str = "MISC";
pub const DEFAULT_CATEGORY_NAME: &str = "Uncategorized";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document root must be a JSON object")]
    NotAnObject,
}

/// One bibliographic record with provenance.
///
/// The well-known fields are typed; everything else the source sent is kept
/// verbatim in `extra` so newer source formats survive a round trip.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Verbatim source record (e.g. the RIS tags an item was imported from).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ris: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub collection_name: String,
    pub designator: String,
    pub category_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an item came from. Stamped onto every item at load time.
#[derive(Debug, Clone)]
pub struct Provenance<'a> {
    pub collection_name: &'a str,
    pub designator: &'a str,
    pub category_name: &'a str,
}

impl Item {
    pub fn from_raw(mut raw: RawItem, provenance: &Provenance<'_>) -> Self {
        // Provenance always wins over same-named keys in the source record.
        for key in ["collectionName", "designator", "categoryName"] {
            raw.remove(key);
        }

        let mut take = |key: &str| take_scalar(&mut raw, key);
        let title = take("title");
        let author = take("author");
        let publisher = take("publisher");
        let date = take("date");
        let url = take("url");
        let description = take("description");
        let ris = take("ris");
        let tags = take_tags(&mut raw);

        Self {
            title,
            author,
            publisher,
            date,
            url,
            description,
            ris,
            tags,
            collection_name: provenance.collection_name.to_string(),
            designator: provenance.designator.to_string(),
            category_name: provenance.category_name.to_string(),
            extra: raw,
        }
    }
}

/// Remove `key` when it holds a scalar. Non-scalar values stay in the map.
fn take_scalar(raw: &mut RawItem, key: &str) -> Option<String> {
    let text = raw.get(key).and_then(scalar_to_string)?;
    raw.remove(key);
    Some(text)
}

fn take_tags(raw: &mut RawItem) -> Vec<String> {
    match raw.get("tags") {
        Some(Value::Array(values)) => {
            let tags = values.iter().filter_map(scalar_to_string).collect();
            raw.remove("tags");
            tags
        }
        Some(value) => match scalar_to_string(value) {
            Some(tag) => {
                raw.remove("tags");
                vec![tag]
            }
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

/// One normalized metadata source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub collection_name: String,
    pub designator: String,
    pub homepage_url: Option<String>,
    pub items: Vec<Item>,
}

impl Collection {
    /// Parse a source body into a collection.
    ///
    /// The root must be a JSON object; a missing `Collection` key yields an
    /// empty, fully defaulted collection.
    pub fn parse(body: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(DocumentError::NotAnObject);
        }
        let doc: RawSourceDocument = serde_json::from_value(value)?;
        Ok(Self::from_document(doc))
    }

    /// Flatten categories into one item list, category order then item order.
    pub fn from_document(doc: RawSourceDocument) -> Self {
        let RawCollection {
            name,
            designator,
            url,
            categories,
        } = doc.collection.unwrap_or_default();

        let collection_name = non_empty_or(name, DEFAULT_COLLECTION_NAME);
        let designator = non_empty_or(designator, DEFAULT_DESIGNATOR);
        let homepage_url = url.filter(|u| !u.trim().is_empty());

        let mut items = Vec::new();
        for category in categories.unwrap_or_default() {
            let category_name = non_empty_or(category.name, DEFAULT_CATEGORY_NAME);
            let provenance = Provenance {
                collection_name: &collection_name,
                designator: &designator,
                category_name: &category_name,
            };
            items.extend(
                category
                    .items
                    .unwrap_or_default()
                    .into_iter()
                    .map(|raw| Item::from_raw(into_record(raw), &provenance)),
            );
        }

        debug!(
            collection = %collection_name,
            designator = %designator,
            items = items.len(),
            "collection normalized"
        );

        Self {
            collection_name,
            designator,
            homepage_url,
            items,
        }
    }
}

/// An item entry that is not a JSON object becomes an empty record.
fn into_record(entry: Value) -> RawItem {
    match entry {
        Value::Object(map) => map,
        other => {
            debug!(entry = %other, "non-object item entry, keeping as empty record");
            RawItem::new()
        }
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Stable-sort `collections` so the one named `pinned` comes first.
pub fn pin_collection(collections: &mut [Collection], pinned: &str) {
    collections.sort_by_key(|c| c.collection_name != pinned);
}
