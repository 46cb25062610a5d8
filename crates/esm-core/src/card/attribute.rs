//! Typed field codec.
//!
//! Converts user-supplied `(name, type, raw value)` triples into the nested
//! value objects the API expects, and decodes value objects read back from
//! a DataCard. The wire shape is always `{"values": [payload, ...]}`, an
//! array even for single-valued fields.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::debug;

use crate::error::ValidationError;

/// The declared type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Number,
    Date,
    Reference,
    ExternalReference,
    StaticValue,
}

impl FieldType {
    /// Parse a type name as used in field specifications.
    ///
    /// Returns `None` for names the codec does not know.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "date" => Some(FieldType::Date),
            "reference" => Some(FieldType::Reference),
            "external-reference" => Some(FieldType::ExternalReference),
            "static-value" => Some(FieldType::StaticValue),
            _ => None,
        }
    }

    /// Returns the type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Reference => "reference",
            FieldType::ExternalReference => "external-reference",
            FieldType::StaticValue => "static-value",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed attribute value.
///
/// Serializes to the wire shape `{"values": [payload]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Number(String),
    Date(String),
    Reference { data_card_id: String },
    ExternalReference { name: String, location: String },
    StaticValue { value: String, code: Option<String> },
}

impl AttributeValue {
    /// Returns the type tag of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            AttributeValue::String(_) => FieldType::String,
            AttributeValue::Number(_) => FieldType::Number,
            AttributeValue::Date(_) => FieldType::Date,
            AttributeValue::Reference { .. } => FieldType::Reference,
            AttributeValue::ExternalReference { .. } => FieldType::ExternalReference,
            AttributeValue::StaticValue { .. } => FieldType::StaticValue,
        }
    }

    /// Returns the payload object placed inside the `values` array.
    pub fn payload(&self) -> Value {
        match self {
            AttributeValue::String(v) | AttributeValue::Number(v) | AttributeValue::Date(v) => {
                json!({ "value": v })
            }
            AttributeValue::Reference { data_card_id } => json!({ "dataCardId": data_card_id }),
            AttributeValue::ExternalReference { name, location } => {
                json!({ "name": name, "location": location })
            }
            AttributeValue::StaticValue { value, code: Some(code) } => {
                json!({ "value": value, "code": code })
            }
            AttributeValue::StaticValue { value, code: None } => json!({ "value": value }),
        }
    }

    /// Returns the full wire object `{"values": [payload]}`.
    pub fn to_wire(&self) -> Value {
        json!({ "values": [self.payload()] })
    }

    /// Decode a single payload object.
    ///
    /// `type_hint` is the attribute's declared `type`, when the server sent
    /// one; it only disambiguates plain `{"value": ...}` payloads.
    pub fn decode(type_hint: Option<&str>, payload: &Value) -> Option<Self> {
        let obj = payload.as_object()?;

        if let Some(id) = obj.get("dataCardId") {
            return Some(AttributeValue::Reference {
                data_card_id: scalar_to_string(id)?,
            });
        }

        if let (Some(name), Some(location)) = (obj.get("name"), obj.get("location")) {
            return Some(AttributeValue::ExternalReference {
                name: scalar_to_string(name)?,
                location: scalar_to_string(location)?,
            });
        }

        let value = scalar_to_string(obj.get("value")?)?;

        if let Some(code) = obj.get("code") {
            return Some(AttributeValue::StaticValue {
                value,
                code: scalar_to_string(code),
            });
        }

        Some(match type_hint.and_then(FieldType::parse) {
            Some(FieldType::Number) => AttributeValue::Number(value),
            Some(FieldType::Date) => AttributeValue::Date(value),
            _ => AttributeValue::String(value),
        })
    }

    /// Decode every value of a wire attribute object.
    ///
    /// Payloads that match no known shape are skipped.
    pub fn decode_all(attribute: &Value) -> Vec<Self> {
        let type_hint = attribute.get("type").and_then(Value::as_str);
        attribute
            .get("values")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|payload| Self::decode(type_hint, payload))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Serialize for AttributeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AttributeValue", 1)?;
        state.serialize_field("values", &[self.payload()])?;
        state.end()
    }
}

/// A user-supplied field: name, type name and raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub value: String,
}

impl FieldSpec {
    /// Create a new field specification.
    pub fn new(
        name: impl Into<String>,
        field_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            value: value.into(),
        }
    }
}

/// Encode one field.
///
/// Returns `Ok(None)` for a type name the codec does not know: such fields
/// are omitted rather than rejected.
///
/// # Errors
///
/// An `external-reference` value must have both a name and a location
/// separated by `|`.
///
/// # Example
///
/// ```
/// use esm_core::card::{AttributeValue, encode};
///
/// let (name, value) = encode("customer", "reference", "123").unwrap().unwrap();
/// assert_eq!(name, "customer");
/// assert_eq!(value, AttributeValue::Reference { data_card_id: "123".into() });
/// ```
pub fn encode(
    name: &str,
    field_type: &str,
    raw: &str,
) -> Result<Option<(String, AttributeValue)>, ValidationError> {
    let Some(kind) = FieldType::parse(field_type) else {
        debug!(field = name, field_type, "Omitting field with unrecognized type");
        return Ok(None);
    };

    let value = match kind {
        FieldType::String => AttributeValue::String(raw.to_string()),
        FieldType::Number => AttributeValue::Number(raw.to_string()),
        FieldType::Date => AttributeValue::Date(raw.to_string()),
        FieldType::Reference => AttributeValue::Reference {
            data_card_id: raw.to_string(),
        },
        FieldType::ExternalReference => match raw.split_once('|') {
            Some((name_part, location)) if !name_part.is_empty() && !location.is_empty() => {
                AttributeValue::ExternalReference {
                    name: name_part.to_string(),
                    location: location.to_string(),
                }
            }
            _ => {
                return Err(ValidationError::MalformedCompositeValue {
                    field: name.to_string(),
                    field_type: kind.as_str(),
                    value: raw.to_string(),
                });
            }
        },
        FieldType::StaticValue => match raw.split_once('|') {
            Some((value, code)) => AttributeValue::StaticValue {
                value: value.to_string(),
                code: Some(code.to_string()),
            },
            None => AttributeValue::StaticValue {
                value: raw.to_string(),
                code: None,
            },
        },
    };

    Ok(Some((name.to_string(), value)))
}

/// Encode a list of fields into the `data` object of a create or update body.
///
/// Later fields with the same name replace earlier ones.
pub fn encode_fields(fields: &[FieldSpec]) -> Result<Map<String, Value>, ValidationError> {
    let mut data = Map::new();
    for field in fields {
        if let Some((name, value)) = encode(&field.name, &field.field_type, &field.value)? {
            data.insert(name, value.to_wire());
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(name: &str, field_type: &str, raw: &str) -> Value {
        let (name, value) = encode(name, field_type, raw).unwrap().unwrap();
        json!({ name: value })
    }

    #[test]
    fn encodes_reference() {
        assert_eq!(
            encoded("f", "reference", "123"),
            json!({"f": {"values": [{"dataCardId": "123"}]}})
        );
    }

    #[test]
    fn encodes_external_reference() {
        assert_eq!(
            encoded("f", "external-reference", "Acme|http://x"),
            json!({"f": {"values": [{"name": "Acme", "location": "http://x"}]}})
        );
    }

    #[test]
    fn external_reference_splits_on_first_pipe() {
        assert_eq!(
            encoded("f", "external-reference", "Acme|http://x?a=1|2"),
            json!({"f": {"values": [{"name": "Acme", "location": "http://x?a=1|2"}]}})
        );
    }

    #[test]
    fn external_reference_requires_both_parts() {
        assert!(encode("f", "external-reference", "Acme").is_err());
        assert!(encode("f", "external-reference", "|http://x").is_err());
        assert!(encode("f", "external-reference", "Acme|").is_err());
    }

    #[test]
    fn encodes_static_value() {
        assert_eq!(
            encoded("f", "static-value", "A|C1"),
            json!({"f": {"values": [{"value": "A", "code": "C1"}]}})
        );
    }

    #[test]
    fn static_value_without_code() {
        assert_eq!(
            encoded("f", "static-value", "Open"),
            json!({"f": {"values": [{"value": "Open"}]}})
        );
    }

    #[test]
    fn encodes_plain_types() {
        assert_eq!(
            encoded("f", "string", "hi"),
            json!({"f": {"values": [{"value": "hi"}]}})
        );
        assert_eq!(
            encoded("n", "number", "42"),
            json!({"n": {"values": [{"value": "42"}]}})
        );
        assert_eq!(
            encoded("d", "date", "2024-05-01"),
            json!({"d": {"values": [{"value": "2024-05-01"}]}})
        );
    }

    #[test]
    fn unknown_type_is_omitted() {
        assert_eq!(encode("f", "blob", "x").unwrap(), None);

        let data = encode_fields(&[
            FieldSpec::new("subject", "string", "Printer on fire"),
            FieldSpec::new("attachment", "blob", "x"),
        ])
        .unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.contains_key("subject"));
    }

    #[test]
    fn decodes_payload_shapes() {
        let attribute = json!({
            "type": "number",
            "values": [{"value": 7}]
        });
        assert_eq!(
            AttributeValue::decode_all(&attribute),
            vec![AttributeValue::Number("7".to_string())]
        );

        assert_eq!(
            AttributeValue::decode(None, &json!({"dataCardId": 55})),
            Some(AttributeValue::Reference {
                data_card_id: "55".to_string()
            })
        );
        assert_eq!(
            AttributeValue::decode(None, &json!({"value": "High", "code": "P1"})),
            Some(AttributeValue::StaticValue {
                value: "High".to_string(),
                code: Some("P1".to_string())
            })
        );
        assert_eq!(AttributeValue::decode(None, &json!({"other": 1})), None);
    }

    #[test]
    fn decode_inverts_encode() {
        for (field_type, raw) in [
            ("reference", "9"),
            ("external-reference", "Acme|http://x"),
            ("static-value", "A|C1"),
            ("date", "2024-05-01"),
        ] {
            let (_, value) = encode("f", field_type, raw).unwrap().unwrap();
            let mut wire = value.to_wire();
            wire["type"] = json!(field_type);
            assert_eq!(AttributeValue::decode_all(&wire), vec![value]);
        }
    }
}
