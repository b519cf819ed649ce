//! `getkit list`: show the catalogue.

use crate::Context;
use crate::cli::ListArgs;
use crate::ui;
use anyhow::Result;
use serde::Serialize;
use toolchain::{Catalog, ToolDescriptor};

const DESCRIPTION_WIDTH: usize = 60;

#[derive(Debug, Serialize)]
struct ToolRow<'a> {
    name: &'a str,
    description: &'a str,
    repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

impl<'a> From<&'a ToolDescriptor> for ToolRow<'a> {
    fn from(tool: &'a ToolDescriptor) -> Self {
        Self {
            name: &tool.name,
            description: &tool.description,
            repository: format!("{}/{}", tool.owner, tool.repo),
            version: Some(tool.version.as_str()).filter(|v| !v.is_empty()),
        }
    }
}

/// Run the list command.
pub fn run(ctx: &Context, args: &ListArgs) -> Result<()> {
    let catalog = Catalog::builtin();

    if args.json {
        println!("{}", to_json(&catalog)?);
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!("Available tools ({})", catalog.len()));
    }

    let width = catalog.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for tool in catalog.iter() {
        println!(
            "  {:width$}  {}",
            tool.name,
            ui::truncate(&tool.description, DESCRIPTION_WIDTH)
        );
    }

    Ok(())
}

fn to_json(catalog: &Catalog) -> Result<String> {
    let rows: Vec<ToolRow<'_>> = catalog.iter().map(ToolRow::from).collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}
