//! ESM login name and password.

use std::fmt;

use crate::error::{Error, ValidationError};

/// The login name and password exchanged for a bearer token.
///
/// `Debug` prints the login name only.
///
/// ```
/// use esm_core::Credentials;
///
/// let creds = Credentials::new("integration.user", "secret");
/// assert_eq!(creds.login(), "integration.user");
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Only the login form should read this.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Reject blank credentials before they are sent anywhere.
    pub fn validate(&self) -> Result<(), Error> {
        let blank = if self.login.trim().is_empty() {
            "login name"
        } else if self.password.is_empty() {
            "password"
        } else {
            return Ok(());
        };
        Err(ValidationError::Other {
            message: format!("{} cannot be empty", blank),
        }
        .into())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}
