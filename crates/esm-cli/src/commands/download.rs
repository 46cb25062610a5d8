//! Download command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use esm_core::AttributeCode;

use crate::connection::ConnectionArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Template code
    pub template: String,

    /// DataCard id
    pub id: String,

    /// File attribute code
    pub attribute: String,

    /// Id of one file within the attribute
    #[arg(long)]
    pub file_id: Option<String>,

    /// Where to write the file (use - for stdout)
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

pub async fn run(args: DownloadArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let id = super::data_card_id(&args.id)?;
    let attribute = AttributeCode::new(&args.attribute).context("Invalid attribute code")?;
    let session = connection.connect().await?;

    let file = if args.output.as_os_str() == "-" {
        let mut stdout = tokio::io::stdout();
        session
            .download_file(&template, &id, &attribute, args.file_id.as_deref(), &mut stdout)
            .await
    } else {
        let mut out = tokio::fs::File::create(&args.output)
            .await
            .with_context(|| format!("Failed to create {}", args.output.display()))?;
        session
            .download_file(&template, &id, &attribute, args.file_id.as_deref(), &mut out)
            .await
    }
    .context("Failed to download file")?;

    output::success(&format!(
        "Downloaded {} ({} bytes)",
        file.file_name.as_deref().unwrap_or("file"),
        file.size
    ));
    Ok(())
}
