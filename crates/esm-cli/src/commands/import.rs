//! Import command implementation.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use esm_core::FieldSpec;
use esm_rest::{BatchPolicy, WriteOptions, import};

use crate::connection::ConnectionArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Template code
    pub template: String,

    /// Folder to create the DataCards in
    #[arg(long)]
    pub folder: String,

    /// NDJSON file, one array of {name, type, value} per line (use - for stdin)
    #[arg(long, default_value = "-")]
    pub input: PathBuf,

    /// Record failed rows and keep going
    #[arg(long)]
    pub continue_on_fail: bool,

    /// Create empty references
    #[arg(long)]
    pub create_empty_references: bool,
}

/// Parse NDJSON rows, skipping blank lines.
fn parse_rows(text: &str) -> Result<Vec<Vec<FieldSpec>>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid row on line {}", number + 1))
        })
        .collect()
}

pub async fn run(args: ImportArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;

    let text = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.input).context("Failed to read input file")?
    };
    let rows = parse_rows(&text)?;

    let session = connection.connect().await?;
    let options = WriteOptions {
        folder_code: Some(args.folder),
        create_empty_references: args.create_empty_references,
        return_full_data_card: false,
    };
    let policy = if args.continue_on_fail {
        BatchPolicy::ContinueOnFailure
    } else {
        BatchPolicy::StopOnFailure
    };

    match import(&session, &template, rows, &options, policy).await {
        Ok(outcomes) => {
            output::ndjson(&outcomes)?;
            let failed = outcomes.iter().filter(|o| o.is_failed()).count();
            if failed > 0 {
                output::error(&format!("{} of {} rows failed", failed, outcomes.len()));
            } else {
                output::success(&format!("Imported {} DataCards", outcomes.len()));
            }
            Ok(())
        }
        Err(aborted) => {
            output::ndjson(&aborted.completed)?;
            bail!("Import stopped at row {}: {}", aborted.item_index, aborted.error)
        }
    }
}
