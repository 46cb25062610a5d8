//! Authenticated session for DataCard operations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::Method;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use esm_core::card::{AttributeValue, encode_fields};
use esm_core::error::{TransportError, ValidationError};
use esm_core::{
    AttributeCode, BaseUrl, BearerToken, CappedPager, Credentials, DataCard, DataCardId,
    DataCardSource, Error, FieldSpec, Operation, OperationFamily, Page, PageRequest, Pager,
    PollConfig, PollCursor, PollOutcome, Result, Session, Template, TemplateCode, poll_cycle,
};

use crate::auth::Authenticator;
use crate::client::{RestClient, transport_error};
use crate::endpoints::{
    ListQuery, ListResponse, NO_QUERY, TemplateResponse, WriteQuery, WriteRequest,
    attribute_path, card_path, data_path, file_path, template_path,
};
use crate::options::{DeleteOptions, DeleteResult, ListOptions, WriteOptions};

/// An authenticated session against one ESM instance.
///
/// Holds the credentials it was created with so [`refresh`](Self::refresh)
/// can log in again. Cloning shares the session.
#[derive(Clone)]
pub struct EsmSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    auth: Authenticator,
    credentials: Credentials,
    session: RwLock<Session>,
}

/// A file written by [`EsmSession::download_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Bytes written.
    pub size: u64,
    /// File name from `Content-Disposition`, if the server sent one.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl EsmSession {
    /// Log in and return an authenticated session.
    pub async fn login(base: BaseUrl, credentials: Credentials) -> Result<Self> {
        let auth = Authenticator::new(RestClient::new(base)?);
        let session = auth.login(&credentials).await?;

        info!(base = %auth.client().base(), login = credentials.login(), "Logged in");

        Ok(Self {
            inner: Arc::new(SessionInner {
                auth,
                credentials,
                session: RwLock::new(session),
            }),
        })
    }

    /// Returns the instance URL.
    pub fn base_url(&self) -> &BaseUrl {
        self.client().base()
    }

    /// Returns when the current token was obtained.
    pub async fn obtained_at(&self) -> DateTime<Utc> {
        self.inner.session.read().await.obtained_at()
    }

    /// Log in again with the retained credentials and swap the token.
    #[instrument(skip(self), fields(base = %self.base_url()))]
    pub async fn refresh(&self) -> Result<()> {
        info!("Refreshing session");
        let fresh = self.inner.auth.login(&self.inner.credentials).await?;
        *self.inner.session.write().await = fresh;
        debug!("Session refreshed successfully");
        Ok(())
    }

    fn client(&self) -> &RestClient {
        self.inner.auth.client()
    }

    async fn token(&self) -> BearerToken {
        self.inner.session.read().await.token().clone()
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// List DataCards of a template, up to `options.limit`.
    #[instrument(skip(self, options), fields(%template))]
    pub async fn list(
        &self,
        template: &TemplateCode,
        options: &ListOptions,
    ) -> Result<Vec<DataCard>> {
        debug!("Listing DataCards");
        let op = Operation::new(OperationFamily::List, template.as_str());
        self.collect_capped(template, options, &op).await
    }

    /// List DataCards matching a filter query.
    #[instrument(skip(self, options), fields(%template))]
    pub async fn search(
        &self,
        template: &TemplateCode,
        query: &str,
        options: &ListOptions,
    ) -> Result<Vec<DataCard>> {
        debug!("Searching DataCards");
        let options = ListOptions {
            filter: Some(query.to_string()),
            ..options.clone()
        };
        let op = Operation::new(OperationFamily::Search, template.as_str())
            .filter_supplied(!query.trim().is_empty());
        self.collect_capped(template, &options, &op).await
    }

    async fn collect_capped(
        &self,
        template: &TemplateCode,
        options: &ListOptions,
        op: &Operation,
    ) -> Result<Vec<DataCard>> {
        let mut pager = CappedPager::new(options.limit).with_annotations();
        let records = pager
            .collect(self, template, &options.page_request())
            .await
            .map_err(|e| e.classify(op))?;
        debug!(
            records = records.len(),
            pages = pager.pages_fetched(),
            "Collected DataCards"
        );
        Ok(records)
    }

    /// Run one poll cycle against this session.
    pub async fn poll(&self, config: &PollConfig, cursor: &mut PollCursor) -> Result<PollOutcome> {
        poll_cycle(self, config, cursor).await
    }

    // ========================================================================
    // DataCard Operations
    // ========================================================================

    /// Fetch one DataCard.
    #[instrument(skip(self), fields(%template, %id))]
    pub async fn get(&self, template: &TemplateCode, id: &DataCardId) -> Result<DataCard> {
        debug!("Getting DataCard");
        let op = Operation::new(OperationFamily::Get, template.as_str()).data_card(id.as_str());
        let token = self.token().await;
        self.client()
            .send_empty(Method::GET, &card_path(template, id), &token)
            .await
            .map_err(|e| e.classify(&op))
    }

    /// Create a DataCard. A folder code is required.
    ///
    /// Returns the server's response body unchanged.
    #[instrument(skip(self, fields, options), fields(%template, fields = fields.len()))]
    pub async fn create(
        &self,
        template: &TemplateCode,
        fields: &[FieldSpec],
        options: &WriteOptions,
    ) -> Result<Value> {
        debug!("Creating DataCard");
        let folder_code = options
            .folder_code
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or(ValidationError::MissingFolderCode)?;
        let data = encode_fields(fields)?;

        let op = Operation::new(OperationFamily::Create, template.as_str());
        let token = self.token().await;
        self.client()
            .send_json(
                Method::POST,
                &data_path(template),
                &write_query(options),
                &WriteRequest {
                    data: &data,
                    folder_code: Some(folder_code),
                },
                &token,
            )
            .await
            .map_err(|e| e.classify(&op))
    }

    /// Update a DataCard's fields.
    #[instrument(skip(self, fields, options), fields(%template, %id, fields = fields.len()))]
    pub async fn update(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        fields: &[FieldSpec],
        options: &WriteOptions,
    ) -> Result<Value> {
        debug!("Updating DataCard");
        let data = encode_fields(fields)?;

        let op =
            Operation::new(OperationFamily::Update, template.as_str()).data_card(id.as_str());
        let token = self.token().await;
        self.client()
            .send_json(
                Method::PATCH,
                &card_path(template, id),
                &write_query(options),
                &WriteRequest {
                    data: &data,
                    folder_code: options.folder_code.as_deref().filter(|f| !f.is_empty()),
                },
                &token,
            )
            .await
            .map_err(|e| e.classify(&op))
    }

    /// Delete a DataCard, checking visibility and folder first when asked to.
    #[instrument(skip(self, options), fields(%template, %id))]
    pub async fn delete(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        options: &DeleteOptions,
    ) -> Result<DeleteResult> {
        let op = Operation::new(OperationFamily::Delete, template.as_str()).data_card(id.as_str());
        let token = self.token().await;

        if options.needs_precheck() {
            let card: DataCard = self
                .client()
                .send_empty(Method::GET, &card_path(template, id), &token)
                .await
                .map_err(|e| e.classify(&op))?;
            precheck_delete(&card, options)?;
        }

        debug!("Deleting DataCard");
        let _: Value = self
            .client()
            .send_empty(Method::DELETE, &card_path(template, id), &token)
            .await
            .map_err(|e| e.classify(&op))?;

        Ok(DeleteResult {
            success: true,
            data_card_id: id.clone(),
        })
    }

    // ========================================================================
    // Attribute Operations
    // ========================================================================

    /// Read one attribute of a DataCard.
    #[instrument(skip(self), fields(%template, %id, %attribute))]
    pub async fn get_attribute(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
    ) -> Result<Value> {
        self.attribute_call(Method::GET, template, id, attribute, None)
            .await
    }

    /// Replace the values of one attribute.
    #[instrument(skip(self, values), fields(%template, %id, %attribute))]
    pub async fn set_attribute(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
        values: &[AttributeValue],
    ) -> Result<Value> {
        self.attribute_call(Method::PUT, template, id, attribute, Some(values))
            .await
    }

    /// Append values to one attribute.
    #[instrument(skip(self, values), fields(%template, %id, %attribute))]
    pub async fn add_attribute(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
        values: &[AttributeValue],
    ) -> Result<Value> {
        self.attribute_call(Method::POST, template, id, attribute, Some(values))
            .await
    }

    /// Clear one attribute.
    #[instrument(skip(self), fields(%template, %id, %attribute))]
    pub async fn remove_attribute(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
    ) -> Result<Value> {
        self.attribute_call(Method::DELETE, template, id, attribute, None)
            .await
    }

    async fn attribute_call(
        &self,
        method: Method,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
        values: Option<&[AttributeValue]>,
    ) -> Result<Value> {
        debug!(%method, "Attribute call");
        let op = Operation::new(OperationFamily::Attribute, template.as_str())
            .data_card(id.as_str())
            .attribute(attribute.as_str());
        let token = self.token().await;
        let segments = attribute_path(template, id, attribute);

        let result = match values {
            Some(values) => {
                let body = json!({
                    "values": values.iter().map(AttributeValue::payload).collect::<Vec<_>>()
                });
                self.client()
                    .send_json(method, &segments, NO_QUERY, &body, &token)
                    .await
            }
            None => self.client().send_empty(method, &segments, &token).await,
        };
        result.map_err(|e| e.classify(&op))
    }

    // ========================================================================
    // File Transfer
    // ========================================================================

    /// Upload a file into a file attribute.
    #[instrument(skip(self, contents), fields(%template, %id, %attribute, size = contents.len()))]
    pub async fn upload_file(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
        file_name: &str,
        contents: Vec<u8>,
        mime: Option<&str>,
    ) -> Result<Value> {
        debug!(file_name, "Uploading file");
        let op = Operation::new(OperationFamily::File, template.as_str())
            .data_card(id.as_str())
            .attribute(attribute.as_str());

        let mut part = Part::bytes(contents).file_name(file_name.to_string());
        if let Some(mime) = mime {
            part = part.mime_str(mime).map_err(|e| ValidationError::Other {
                message: format!("invalid MIME type '{}': {}", mime, e),
            })?;
        }
        let form = Form::new().part("file", part);

        let token = self.token().await;
        self.client()
            .send_multipart(&file_path(template, id, attribute, None), form, &token)
            .await
            .map_err(|e| e.classify(&op))
    }

    /// Stream a file attribute into `writer`.
    ///
    /// Without `file_id` the server returns the attribute's only or first file.
    #[instrument(skip(self, writer), fields(%template, %id, %attribute))]
    pub async fn download_file<W>(
        &self,
        template: &TemplateCode,
        id: &DataCardId,
        attribute: &AttributeCode,
        file_id: Option<&str>,
        writer: &mut W,
    ) -> Result<DownloadedFile>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let op = Operation::new(OperationFamily::File, template.as_str())
            .data_card(id.as_str())
            .attribute(attribute.as_str());
        let token = self.token().await;

        let response = self
            .client()
            .get_stream(&file_path(template, id, attribute, file_id), &token)
            .await
            .map_err(|e| e.classify(&op))?;

        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut size = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport_error)?;
            writer.write_all(&chunk).await.map_err(io_error)?;
            size += chunk.len() as u64;
        }
        writer.flush().await.map_err(io_error)?;

        debug!(size, "Downloaded file");
        Ok(DownloadedFile {
            size,
            file_name,
            content_type,
        })
    }
}

#[async_trait]
impl DataCardSource for EsmSession {
    async fn fetch_page(&self, template: &TemplateCode, request: &PageRequest) -> Result<Page> {
        let token = self.token().await;
        let response: ListResponse = self
            .client()
            .get_json(&data_path(template), &ListQuery::from(request), &token)
            .await?;

        Ok(Page {
            records: response.data,
            total_count: response.meta.count,
            next_link: response.meta.links.next.unwrap_or_default(),
        })
    }

    async fn fetch_template(&self, template: &TemplateCode) -> Result<Template> {
        let token = self.token().await;
        let response: TemplateResponse = self
            .client()
            .get_json(&template_path(template), NO_QUERY, &token)
            .await?;

        Ok(Template {
            code: template.clone(),
            attributes: response.attributes,
        })
    }
}

fn write_query(options: &WriteOptions) -> WriteQuery {
    WriteQuery {
        create_empty_references: options.create_empty_references,
        data_cards: options.return_full_data_card,
    }
}

fn precheck_delete(card: &DataCard, options: &DeleteOptions) -> Result<()> {
    if !options.visibility.matches(card.hidden) {
        return Err(ValidationError::VisibilityMismatch {
            expected: options.visibility.as_str(),
            actual: if card.hidden { "hidden" } else { "visible" },
        }
        .into());
    }

    if let Some(ref expected) = options.folder_code
        && card.folder_code.as_deref() != Some(expected.as_str())
    {
        return Err(ValidationError::FolderMismatch {
            expected: expected.clone(),
            actual: card.folder_code.clone().unwrap_or_default(),
        }
        .into());
    }

    Ok(())
}

fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

fn io_error(err: std::io::Error) -> Error {
    Error::Transport(TransportError::from(err))
}

// Custom Debug impl that hides sensitive data
impl std::fmt::Debug for EsmSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsmSession")
            .field("base", self.base_url())
            .field("login", &self.inner.credentials.login())
            .field("token", &"[REDACTED]")
            .finish()
    }
}
