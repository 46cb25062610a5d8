//! Create and update command implementations.

use anyhow::{Context, Result};
use clap::Args;

use esm_rest::WriteOptions;

use crate::connection::ConnectionArgs;
use crate::fields::parse_fields;
use crate::output;

#[derive(Args, Debug)]
pub struct WriteFlags {
    /// Field as name:type=value (repeatable). Types: string, number, date,
    /// reference, external-reference (name|location), static-value (value|code)
    #[arg(long = "field", short = 'f')]
    pub fields: Vec<String>,

    /// Create empty references
    #[arg(long)]
    pub create_empty_references: bool,

    /// Return the full DataCard
    #[arg(long)]
    pub full: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Template code
    pub template: String,

    /// Folder to create the DataCard in
    #[arg(long)]
    pub folder: String,

    #[command(flatten)]
    pub flags: WriteFlags,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Template code
    pub template: String,

    /// DataCard id
    pub id: String,

    /// Move the DataCard to this folder
    #[arg(long)]
    pub folder: Option<String>,

    #[command(flatten)]
    pub flags: WriteFlags,
}

fn write_options(folder: Option<String>, flags: &WriteFlags) -> WriteOptions {
    WriteOptions {
        folder_code: folder,
        create_empty_references: flags.create_empty_references,
        return_full_data_card: flags.full,
    }
}

pub async fn run_create(args: CreateArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let fields = parse_fields(&args.flags.fields)?;
    let session = connection.connect().await?;

    let response = session
        .create(
            &template,
            &fields,
            &write_options(Some(args.folder), &args.flags),
        )
        .await
        .context("Failed to create DataCard")?;

    output::value(&response, args.flags.pretty)?;
    output::success("Created DataCard");
    Ok(())
}

pub async fn run_update(args: UpdateArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let id = super::data_card_id(&args.id)?;
    let fields = parse_fields(&args.flags.fields)?;
    let session = connection.connect().await?;

    let response = session
        .update(
            &template,
            &id,
            &fields,
            &write_options(args.folder, &args.flags),
        )
        .await
        .context("Failed to update DataCard")?;

    output::value(&response, args.flags.pretty)?;
    output::success(&format!("Updated DataCard {}", id));
    Ok(())
}
