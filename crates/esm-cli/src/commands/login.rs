//! Login command implementation.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::connection::ConnectionArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {}

pub async fn run(_args: LoginArgs, connection: &ConnectionArgs) -> Result<()> {
    output::note("Logging in...");

    let session = connection.connect().await?;
    let age = Utc::now() - session.obtained_at().await;

    output::success("Logged in successfully");
    println!();
    output::field("Instance", session.base_url().as_str());
    output::field("Token age", &format!("{}s", age.num_seconds()));

    Ok(())
}
