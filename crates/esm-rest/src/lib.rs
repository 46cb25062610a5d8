//! esm-rest - REST transport for the Efecte ESM DataCard API.
//!
//! # Example
//!
//! ```no_run
//! use esm_core::{BaseUrl, Credentials, TemplateCode};
//! use esm_rest::{EsmSession, ListOptions};
//!
//! # async fn example() -> esm_core::Result<()> {
//! let base = BaseUrl::new("acme.efectecloud.com")?;
//! let session = EsmSession::login(base, Credentials::new("integration", "secret")).await?;
//!
//! let template = TemplateCode::new("Incidents")?;
//! let cards = session.list(&template, &ListOptions::default()).await?;
//! println!("{} DataCards", cards.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
pub mod client;
pub mod endpoints;
pub mod options;
pub mod session;

pub use auth::Authenticator;
pub use batch::{BatchAborted, BatchPolicy, ErrorRecord, ItemOutcome, import, run_batch};
pub use client::RestClient;
pub use options::{
    DEFAULT_LIST_LIMIT, DeleteOptions, DeleteResult, ListOptions, Sort, SortDirection,
    WriteOptions,
};
pub use session::{DownloadedFile, EsmSession};
