//! Upload command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use esm_core::AttributeCode;

use crate::connection::ConnectionArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Template code
    pub template: String,

    /// DataCard id
    pub id: String,

    /// File attribute code
    pub attribute: String,

    /// File to upload
    pub file: PathBuf,

    /// File name to send (defaults to the file's name)
    #[arg(long)]
    pub name: Option<String>,

    /// MIME type of the file
    #[arg(long)]
    pub mime: Option<String>,
}

pub async fn run(args: UploadArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let id = super::data_card_id(&args.id)?;
    let attribute = AttributeCode::new(&args.attribute).context("Invalid attribute code")?;

    let file_name = match args.name {
        Some(name) => name,
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .context("Cannot derive a file name; pass --name")?,
    };
    let contents = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let size = contents.len();

    let session = connection.connect().await?;
    let response = session
        .upload_file(
            &template,
            &id,
            &attribute,
            &file_name,
            contents,
            args.mime.as_deref(),
        )
        .await
        .context("Failed to upload file")?;

    output::json(&response)?;
    output::success(&format!("Uploaded {} ({} bytes)", file_name, size));
    Ok(())
}
