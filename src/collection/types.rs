use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A source document as served by a metadata endpoint or stored on disk.
///
/// Every field is optional; absent or empty values are defaulted during
/// normalization, not here.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct RawSourceDocument {
    #[serde(rename = "Collection", default)]
    pub collection: Option<RawCollection>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct RawCollection {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub designator: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(rename = "Categories", default)]
    pub categories: Option<Vec<RawCategory>>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct RawCategory {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Entries are kept as raw JSON; non-object entries are tolerated here
    /// and normalized later.
    #[serde(default)]
    pub items: Option<Vec<Value>>,
}

/// Free-form bibliographic record. No key is required.
pub type RawItem = Map<String, Value>;

/// Accept strings, numbers and booleans as text; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
