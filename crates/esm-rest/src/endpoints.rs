//! REST endpoint paths and request/response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use esm_core::{AttributeCode, DataCard, DataCardId, PageRequest, TemplateCode};

/// `users/login`
pub const LOGIN: [&str; 2] = ["users", "login"];

/// An empty query string.
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Path segments of `dc/{template}`.
pub fn template_path(template: &TemplateCode) -> Vec<&str> {
    vec!["dc", template.as_str()]
}

/// Path segments of `dc/{template}/data`.
pub fn data_path(template: &TemplateCode) -> Vec<&str> {
    vec!["dc", template.as_str(), "data"]
}

/// Path segments of `dc/{template}/data/{id}`.
pub fn card_path<'a>(template: &'a TemplateCode, id: &'a DataCardId) -> Vec<&'a str> {
    vec!["dc", template.as_str(), "data", id.as_str()]
}

/// Path segments of `dc/{template}/data/{id}/{attribute}`.
pub fn attribute_path<'a>(
    template: &'a TemplateCode,
    id: &'a DataCardId,
    attribute: &'a AttributeCode,
) -> Vec<&'a str> {
    vec![
        "dc",
        template.as_str(),
        "data",
        id.as_str(),
        attribute.as_str(),
    ]
}

/// Path segments of `dc/{template}/data/{id}/{attribute}/file[/{file_id}]`.
pub fn file_path<'a>(
    template: &'a TemplateCode,
    id: &'a DataCardId,
    attribute: &'a AttributeCode,
    file_id: Option<&'a str>,
) -> Vec<&'a str> {
    let mut segments = attribute_path(template, id, attribute);
    segments.push("file");
    segments.extend(file_id);
    segments
}

/// Form body of the login call.
#[derive(Serialize)]
pub struct LoginForm<'a> {
    pub login: &'a str,
    pub password: &'a str,
}

/// Query string of the listing endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_attributes: Option<&'a str>,
    pub limit: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub data_cards: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<&'a str>,
}

impl<'a> From<&'a PageRequest> for ListQuery<'a> {
    fn from(request: &'a PageRequest) -> Self {
        Self {
            filter: request.filter.as_deref(),
            folder_code: request.folder_code.as_deref(),
            selected_attributes: request.selected_attributes.as_deref(),
            limit: request.wire_limit(),
            data_cards: request.data_cards,
            filter_id: request.filter_id,
            sort: request.sort.as_deref(),
        }
    }
}

/// Response of the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub data: Vec<DataCard>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub links: ListLinks,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLinks {
    #[serde(default)]
    pub next: Option<String>,
}

/// Response of the template metadata endpoint.
#[derive(Debug, Deserialize)]
pub struct TemplateResponse {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Query flags of create and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteQuery {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub create_empty_references: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub data_cards: bool,
}

/// Body of create and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest<'a> {
    pub data: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_code: Option<&'a str>,
}

/// Error body returned by the API.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_omits_unset_parameters() {
        let request = PageRequest {
            limit: 500,
            filter_id: Some(42),
            ..Default::default()
        };
        let value = serde_json::to_value(ListQuery::from(&request)).unwrap();
        assert_eq!(value, serde_json::json!({ "limit": 200, "filterId": 42 }));
    }

    #[test]
    fn list_response_tolerates_missing_meta() {
        let response: ListResponse =
            serde_json::from_value(serde_json::json!({ "data": [{ "dataCardId": "7" }] }))
                .unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.meta.count, 0);
        assert!(response.meta.links.next.is_none());
    }

    #[test]
    fn file_path_appends_optional_id() {
        let template = TemplateCode::new("Incidents").unwrap();
        let id = DataCardId::new("12").unwrap();
        let attribute = AttributeCode::new("attachments").unwrap();

        assert_eq!(
            file_path(&template, &id, &attribute, None),
            vec!["dc", "Incidents", "data", "12", "attachments", "file"]
        );
        assert_eq!(
            file_path(&template, &id, &attribute, Some("f1")).last(),
            Some(&"f1")
        );
    }
}
