//! Poll command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use esm_core::{PollConfig, PollOutcome};

use crate::connection::ConnectionArgs;
use crate::output;
use crate::state::storage::StateStore;

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Template code
    pub template: String,

    /// Filter expression
    #[arg(long)]
    pub filter: Option<String>,

    /// Comma-separated attribute codes to return (validated against the template)
    #[arg(long)]
    pub attributes: Option<String>,

    /// DataCards wanted per cycle
    #[arg(long, default_value_t = esm_core::poll::DEFAULT_POLL_LIMIT)]
    pub limit: usize,

    /// Name of the poll state (defaults to the template code)
    #[arg(long)]
    pub trigger: Option<String>,

    /// Directory holding poll state files
    #[arg(long, env = "ESM_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

pub async fn run(args: PollArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let trigger = args.trigger.clone().unwrap_or_else(|| template.to_string());
    let base = connection.base_url()?;

    let store = StateStore::open(args.state_dir.clone())?;
    let lock = store.lock(&trigger)?;
    let loaded = store
        .load(&lock, base.as_str(), template.as_str())
        .context("Failed to load poll state")?;
    let mut cursor = loaded.cursor;
    let version = cursor.version();

    let session = connection.connect().await?;
    let config = PollConfig {
        filter: args.filter,
        selected_attributes: args.attributes,
        limit: args.limit,
        ..PollConfig::new(template.clone())
    };

    let outcome = session
        .poll(&config, &mut cursor)
        .await
        .context("Poll failed")?;

    // Records are printed only once the cursor that commits them is stored.
    if cursor.version() != version {
        store
            .save(
                &lock,
                base.as_str(),
                template.as_str(),
                &cursor,
                loaded.read_version,
            )
            .context("Failed to save poll state")?;
    }
    drop(lock);

    match outcome {
        PollOutcome::NoNewData => output::note("No new data."),
        PollOutcome::Records(records) => {
            output::ndjson(&records)?;
        }
    }

    Ok(())
}
