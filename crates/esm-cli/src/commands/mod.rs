//! Subcommand implementations.

mod attr;
mod delete;
mod download;
mod get;
mod import;
mod list;
mod login;
mod poll;
mod upload;
mod write;

use anyhow::{Context, Result};
use clap::Subcommand;

use esm_core::{DataCardId, TemplateCode};

use crate::connection::ConnectionArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify credentials against the instance
    Login(login::LoginArgs),

    /// List DataCards of a template
    List(list::ListArgs),

    /// Search DataCards with a filter query
    Search(list::SearchArgs),

    /// Fetch a single DataCard
    Get(get::GetArgs),

    /// Create a DataCard
    Create(write::CreateArgs),

    /// Update fields of a DataCard
    Update(write::UpdateArgs),

    /// Delete a DataCard
    Delete(delete::DeleteArgs),

    /// Read or change a single attribute
    Attr(attr::AttrCommand),

    /// Upload a file into a file attribute
    Upload(upload::UploadArgs),

    /// Download a file from a file attribute
    Download(download::DownloadArgs),

    /// Create DataCards from NDJSON field lists
    Import(import::ImportArgs),

    /// Run one poll cycle and print new DataCards as NDJSON
    Poll(poll::PollArgs),
}

pub async fn handle(command: Command, connection: &ConnectionArgs) -> Result<()> {
    match command {
        Command::Login(args) => login::run(args, connection).await,
        Command::List(args) => list::run_list(args, connection).await,
        Command::Search(args) => list::run_search(args, connection).await,
        Command::Get(args) => get::run(args, connection).await,
        Command::Create(args) => write::run_create(args, connection).await,
        Command::Update(args) => write::run_update(args, connection).await,
        Command::Delete(args) => delete::run(args, connection).await,
        Command::Attr(cmd) => attr::handle(cmd, connection).await,
        Command::Upload(args) => upload::run(args, connection).await,
        Command::Download(args) => download::run(args, connection).await,
        Command::Import(args) => import::run(args, connection).await,
        Command::Poll(args) => poll::run(args, connection).await,
    }
}

fn template(code: &str) -> Result<TemplateCode> {
    TemplateCode::new(code).context("Invalid template code")
}

fn data_card_id(id: &str) -> Result<DataCardId> {
    DataCardId::new(id).context("Invalid DataCard id")
}
