//! `name:type=value` field arguments, parsed and printed.

use anyhow::{Context, Result, bail};

use esm_core::card::{AttributeValue, encode};
use esm_core::{DataCard, FieldSpec};

/// Parse `name:type=value`. The value may itself contain `:` and `=`.
pub fn parse_field(arg: &str) -> Result<FieldSpec> {
    let (name, rest) = arg
        .split_once(':')
        .with_context(|| format!("Field '{}' must look like name:type=value", arg))?;
    let (field_type, value) = rest
        .split_once('=')
        .with_context(|| format!("Field '{}' must look like name:type=value", arg))?;

    if name.trim().is_empty() {
        bail!("Field '{}' has an empty name", arg);
    }

    Ok(FieldSpec::new(name.trim(), field_type.trim(), value))
}

/// Parse every field argument.
pub fn parse_fields(args: &[String]) -> Result<Vec<FieldSpec>> {
    args.iter().map(|arg| parse_field(arg)).collect()
}

/// Encode raw values of one attribute. Unknown types are an error here.
pub fn attribute_values(
    attribute: &str,
    field_type: &str,
    raw_values: &[String],
) -> Result<Vec<AttributeValue>> {
    raw_values
        .iter()
        .map(|raw| {
            encode(attribute, field_type, raw)?
                .map(|(_, value)| value)
                .with_context(|| format!("Unknown field type '{}'", field_type))
        })
        .collect()
}

/// Format one decoded value in the form `parse_field` accepts.
pub fn format_field(name: &str, value: &AttributeValue) -> String {
    let raw = match value {
        AttributeValue::String(v) | AttributeValue::Number(v) | AttributeValue::Date(v) => {
            v.clone()
        }
        AttributeValue::Reference { data_card_id } => data_card_id.clone(),
        AttributeValue::ExternalReference { name, location } => format!("{}|{}", name, location),
        AttributeValue::StaticValue { value, code: Some(code) } => format!("{}|{}", value, code),
        AttributeValue::StaticValue { value, code: None } => value.clone(),
    };
    format!("{}:{}={}", name, value.field_type(), raw)
}

/// Every attribute value of a DataCard as field arguments.
pub fn card_fields(card: &DataCard) -> Vec<String> {
    card.attributes()
        .flat_map(|(code, values)| {
            values
                .into_iter()
                .map(|value| format_field(code, &value))
                .collect::<Vec<_>>()
        })
        .collect()
}
