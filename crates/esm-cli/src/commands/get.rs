//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::connection::ConnectionArgs;
use crate::fields::card_fields;
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Template code
    pub template: String,

    /// DataCard id
    pub id: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Print attributes as name:type=value lines instead of JSON
    #[arg(long, conflicts_with = "pretty")]
    pub fields: bool,
}

pub async fn run(args: GetArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let id = super::data_card_id(&args.id)?;
    let session = connection.connect().await?;

    let card = session
        .get(&template, &id)
        .await
        .context("Failed to get DataCard")?;

    if args.fields {
        for line in card_fields(&card) {
            println!("{}", line);
        }
        return Ok(());
    }

    output::value(&card, args.pretty)
}
