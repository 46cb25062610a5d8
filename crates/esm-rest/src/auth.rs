//! Session Authenticator: exchanges credentials for a bearer token.

use std::collections::BTreeMap;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use tracing::{debug, instrument};

use esm_core::error::AuthError;
use esm_core::{BearerToken, Credentials, Result, Session};

use crate::client::{RestClient, check_status, transport_error};
use crate::endpoints::{LOGIN, LoginForm};

/// Performs the login call. Holds no token; every `login` is one request.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: RestClient,
}

impl Authenticator {
    /// Create an authenticator on top of a client.
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Log in once. No retry.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`](esm_core::Error::Validation) for a blank login or password
    /// - [`Error::Protocol`](esm_core::Error::Protocol) for a non-success status
    /// - [`Error::Authentication`](esm_core::Error::Authentication) when the
    ///   response carries no usable `Authorization` header
    #[instrument(skip(self, credentials), fields(base = %self.client.base(), login = credentials.login()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;

        let response = self
            .client
            .request(Method::POST, &LOGIN)
            .form(&LoginForm {
                login: credentials.login(),
                password: credentials.password(),
            })
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let token = extract_token(response.headers())?;

        debug!("Login succeeded");
        Ok(Session::new(token))
    }
}

/// Pull the bearer token out of the login response headers.
fn extract_token(headers: &HeaderMap) -> std::result::Result<BearerToken, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(BearerToken::from_header_value)
        .ok_or_else(|| AuthError::MissingToken {
            headers: collect_headers(headers),
        })
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
