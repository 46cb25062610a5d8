//! The DataCard record type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::attribute::AttributeValue;
use super::page::PageAnnotation;
use crate::types::DataCardId;

/// A single DataCard as returned by the listing endpoint.
///
/// Only the fields the engine reasons about are typed; everything else the
/// server sends is kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCard {
    /// The DataCard identifier, absent on malformed entries.
    #[serde(
        rename = "dataCardId",
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<DataCardId>,

    /// Whether the DataCard is hidden.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub hidden: bool,

    /// The folder the DataCard lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_code: Option<String>,

    /// Attribute code to wire value object.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,

    /// Page metadata attached by capped listings.
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageAnnotation>,

    /// Any other fields the server returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataCard {
    /// Returns the numeric identifier used as the `filterId` cursor.
    pub fn filter_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(DataCardId::filter_id)
    }

    /// Decode the values of one attribute.
    ///
    /// Returns an empty vector when the attribute is absent.
    pub fn attribute(&self, code: &str) -> Vec<AttributeValue> {
        self.data
            .get(code)
            .map(AttributeValue::decode_all)
            .unwrap_or_default()
    }

    /// Decode every attribute.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, Vec<AttributeValue>)> + '_ {
        self.data
            .iter()
            .map(|(code, raw)| (code.as_str(), AttributeValue::decode_all(raw)))
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<DataCardId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => DataCardId::new(s).ok(),
        Some(Value::Number(n)) => DataCardId::new(n.to_string()).ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    })
}
