//! Attribute subcommands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use esm_core::AttributeCode;

use crate::connection::ConnectionArgs;
use crate::fields::attribute_values;
use crate::output;

#[derive(Args, Debug)]
pub struct AttrCommand {
    #[command(subcommand)]
    pub command: AttrSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AttrSubcommand {
    /// Read an attribute
    Get(AttrTarget),

    /// Replace an attribute's values
    Set(AttrWriteArgs),

    /// Append values to an attribute
    Add(AttrWriteArgs),

    /// Clear an attribute
    Remove(AttrTarget),
}

#[derive(Args, Debug)]
pub struct AttrTarget {
    /// Template code
    pub template: String,

    /// DataCard id
    pub id: String,

    /// Attribute code
    pub attribute: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct AttrWriteArgs {
    #[command(flatten)]
    pub target: AttrTarget,

    /// Value type (string, number, date, reference, external-reference, static-value)
    #[arg(long = "type", short = 't', default_value = "string")]
    pub field_type: String,

    /// Value (repeatable)
    #[arg(long = "value", required = true)]
    pub values: Vec<String>,
}

pub async fn handle(cmd: AttrCommand, connection: &ConnectionArgs) -> Result<()> {
    match cmd.command {
        AttrSubcommand::Get(target) => {
            let (session, template, id, attribute) = resolve(&target, connection).await?;
            let value = session
                .get_attribute(&template, &id, &attribute)
                .await
                .context("Failed to read attribute")?;
            output::value(&value, target.pretty)
        }
        AttrSubcommand::Set(args) => {
            let values = attribute_values(&args.target.attribute, &args.field_type, &args.values)?;
            let (session, template, id, attribute) = resolve(&args.target, connection).await?;
            let value = session
                .set_attribute(&template, &id, &attribute, &values)
                .await
                .context("Failed to set attribute")?;
            output::value(&value, args.target.pretty)
        }
        AttrSubcommand::Add(args) => {
            let values = attribute_values(&args.target.attribute, &args.field_type, &args.values)?;
            let (session, template, id, attribute) = resolve(&args.target, connection).await?;
            let value = session
                .add_attribute(&template, &id, &attribute, &values)
                .await
                .context("Failed to add attribute values")?;
            output::value(&value, args.target.pretty)
        }
        AttrSubcommand::Remove(target) => {
            let (session, template, id, attribute) = resolve(&target, connection).await?;
            session
                .remove_attribute(&template, &id, &attribute)
                .await
                .context("Failed to remove attribute")?;
            output::success(&format!("Cleared attribute {}", attribute));
            Ok(())
        }
    }
}

async fn resolve(
    target: &AttrTarget,
    connection: &ConnectionArgs,
) -> Result<(
    esm_rest::EsmSession,
    esm_core::TemplateCode,
    esm_core::DataCardId,
    AttributeCode,
)> {
    let template = super::template(&target.template)?;
    let id = super::data_card_id(&target.id)?;
    let attribute = AttributeCode::new(&target.attribute).context("Invalid attribute code")?;
    let session = connection.connect().await?;
    Ok((session, template, id, attribute))
}
