//! Delete command implementation.

use anyhow::{Context, Result};
use clap::Args;

use esm_core::Visibility;
use esm_rest::DeleteOptions;

use crate::connection::ConnectionArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Template code
    pub template: String,

    /// DataCard id
    pub id: String,

    /// Only delete a DataCard with this visibility: all, visible or hidden
    #[arg(long, default_value = "visible")]
    pub visibility: Visibility,

    /// Only delete a DataCard in this folder
    #[arg(long)]
    pub folder: Option<String>,
}

pub async fn run(args: DeleteArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let id = super::data_card_id(&args.id)?;
    let session = connection.connect().await?;

    let options = DeleteOptions {
        visibility: args.visibility,
        folder_code: args.folder,
    };
    let result = session
        .delete(&template, &id, &options)
        .await
        .context("Failed to delete DataCard")?;

    output::json(&result)?;
    output::success(&format!("Deleted DataCard {}", id));
    Ok(())
}
