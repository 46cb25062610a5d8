//! REST HTTP client.

use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use esm_core::error::{Error, ProtocolError, TransportError};
use esm_core::{BaseUrl, BearerToken, Result};

use crate::endpoints::ErrorResponse;

/// HTTP client for the ESM REST API.
///
/// Non-success responses come back as [`Error::Protocol`]; callers classify
/// them for the operation they perform.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base: BaseUrl,
}

impl RestClient {
    /// Create a new client for the given instance.
    pub fn new(base: BaseUrl) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("esm-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;

        Ok(Self { client, base })
    }

    /// Returns the instance this client talks to.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }

    /// Start a request to the endpoint under the REST prefix.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.base.endpoint(segments);
        debug!(%method, %url, "REST request");
        self.client.request(method, url)
    }

    /// Start an authenticated request.
    pub(crate) fn authed(
        &self,
        method: Method,
        segments: &[&str],
        token: &BearerToken,
    ) -> RequestBuilder {
        self.request(method, segments)
            .bearer_auth(token.as_str())
            .header(ACCEPT, "application/json")
    }

    /// Authenticated GET decoding a JSON body.
    #[instrument(skip(self, query, token), fields(base = %self.base))]
    pub async fn get_json<Q, R>(
        &self,
        segments: &[&str],
        query: &Q,
        token: &BearerToken,
    ) -> Result<R>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .authed(Method::GET, segments, token)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    /// Authenticated request with a JSON body, decoding a JSON response.
    #[instrument(skip(self, query, body, token), fields(base = %self.base))]
    pub async fn send_json<Q, B, R>(
        &self,
        method: Method,
        segments: &[&str],
        query: &Q,
        body: &B,
        token: &BearerToken,
    ) -> Result<R>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .authed(method, segments, token)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    /// Authenticated request without a body, decoding a JSON response.
    #[instrument(skip(self, token), fields(base = %self.base))]
    pub async fn send_empty<R>(
        &self,
        method: Method,
        segments: &[&str],
        token: &BearerToken,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .authed(method, segments, token)
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    /// Authenticated multipart upload.
    #[instrument(skip(self, form, token), fields(base = %self.base))]
    pub async fn send_multipart<R>(
        &self,
        segments: &[&str],
        form: reqwest::multipart::Form,
        token: &BearerToken,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .authed(Method::POST, segments, token)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    /// Authenticated GET returning the raw successful response for streaming.
    #[instrument(skip(self, token), fields(base = %self.base))]
    pub async fn get_stream(&self, segments: &[&str], token: &BearerToken) -> Result<Response> {
        let response = self
            .authed(Method::GET, segments, token)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await
    }
}

/// Return the response if it succeeded, its parsed error otherwise.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    trace!(status = %status, "REST response");

    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Protocol(parse_error_response(response).await))
    }
}

/// Decode a JSON body. An empty body decodes as `null`.
async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await.map_err(transport_error)?;
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &bytes
    };
    serde_json::from_slice(body).map_err(|e| Error::Transport(e.into()))
}

/// Parse an error response into a protocol error.
async fn parse_error_response(response: Response) -> ProtocolError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => ProtocolError {
            status,
            message: body.message.or(body.error),
            url: body.url,
            timestamp: body.timestamp,
        },
        Err(_) => {
            let text = text.trim();
            let mut error = ProtocolError::new(status);
            if !text.is_empty() {
                error = error.with_message(text);
            }
            error
        }
    }
}

/// Map a reqwest failure into the transport error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let message = err.to_string();
    let kind = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection { message }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode { message }
    } else {
        TransportError::Http { message }
    };
    Error::Transport(kind)
}
