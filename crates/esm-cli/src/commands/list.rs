//! List and search command implementations.

use anyhow::{Context, Result};
use clap::Args;

use esm_core::{DataCard, Visibility};
use esm_rest::{DEFAULT_LIST_LIMIT, ListOptions, Sort, SortDirection};

use crate::connection::ConnectionArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct ListFilterArgs {
    /// Restrict to one folder
    #[arg(long)]
    pub folder: Option<String>,

    /// Comma-separated attribute codes to return
    #[arg(long)]
    pub attributes: Option<String>,

    /// Which DataCards to include: all, visible or hidden
    #[arg(long, default_value = "visible")]
    pub visibility: Visibility,

    /// Maximum number of DataCards to return
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,

    /// Return full DataCards
    #[arg(long)]
    pub full: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl ListFilterArgs {
    fn options(&self, filter: Option<String>, sort: Option<Sort>) -> ListOptions {
        ListOptions {
            filter,
            folder_code: self.folder.clone(),
            selected_attributes: self.attributes.clone(),
            visibility: self.visibility,
            limit: self.limit,
            data_cards: self.full,
            sort,
        }
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Template code (e.g. Incidents)
    pub template: String,

    /// Filter expression
    #[arg(long)]
    pub filter: Option<String>,

    #[command(flatten)]
    pub common: ListFilterArgs,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Template code (e.g. Incidents)
    pub template: String,

    /// Filter query (e.g. "$status$ = '02 - In progress'")
    pub query: String,

    /// Attribute to sort by
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort order: asc or desc
    #[arg(long, default_value = "asc")]
    pub sort_order: SortDirection,

    #[command(flatten)]
    pub common: ListFilterArgs,
}

pub async fn run_list(args: ListArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let session = connection.connect().await?;

    let records = session
        .list(&template, &args.common.options(args.filter.clone(), None))
        .await
        .context("Failed to list DataCards")?;

    print_records(&records, args.common.pretty)
}

pub async fn run_search(args: SearchArgs, connection: &ConnectionArgs) -> Result<()> {
    let template = super::template(&args.template)?;
    let session = connection.connect().await?;

    let sort = args
        .sort_by
        .as_ref()
        .map(|field| Sort::new(field.clone(), args.sort_order));

    let records = session
        .search(&template, &args.query, &args.common.options(None, sort))
        .await
        .context("Failed to search DataCards")?;

    print_records(&records, args.common.pretty)
}

fn print_records(records: &[DataCard], pretty: bool) -> Result<()> {
    if records.is_empty() {
        output::note("No DataCards found.");
        return Ok(());
    }

    if pretty {
        for record in records {
            output::value(record, true)?;
        }
    } else {
        output::ndjson(records)?;
    }
    Ok(())
}
