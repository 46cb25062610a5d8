//! Connection settings shared by every command.

use std::fmt;

use anyhow::{Context, Result};
use clap::Args;

use esm_core::{BaseUrl, Credentials};
use esm_rest::EsmSession;

#[derive(Args, Clone, Default)]
pub struct ConnectionArgs {
    /// ESM instance URL (https:// is assumed when no scheme is given)
    #[arg(long, env = "ESM_URL", global = true)]
    pub url: Option<String>,

    /// Login name
    #[arg(long, env = "ESM_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password
    #[arg(long, env = "ESM_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

impl ConnectionArgs {
    /// Returns the normalised instance URL.
    pub fn base_url(&self) -> Result<BaseUrl> {
        let url = self
            .url
            .as_deref()
            .context("No instance URL. Pass --url or set ESM_URL.")?;
        BaseUrl::new(url).context("Invalid instance URL")
    }

    /// Log in with the configured credentials.
    pub async fn connect(&self) -> Result<EsmSession> {
        let base = self.base_url()?;
        let username = self
            .username
            .as_deref()
            .context("No username. Pass --username or set ESM_USERNAME.")?;
        let password = self
            .password
            .as_deref()
            .context("No password. Pass --password or set ESM_PASSWORD.")?;

        EsmSession::login(base, Credentials::new(username, password))
            .await
            .context("Failed to login")
    }
}

// Custom Debug impl that hides the password
impl fmt::Debug for ConnectionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionArgs")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
