//! `getkit update`: replace the running executable with a newer release.

use crate::Context;
use crate::cli::UpdateArgs;
use crate::ui;
use anyhow::Result;
use toolchain::{Client, InstallOptions, config};

/// Run the update command.
pub fn run(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let mut options = InstallOptions::new()
        .stash(false)
        .progress(config::effective_progress(args.progress.enabled())?);
    if let Some(version) = args.version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        options = options.version(version);
    }

    let client = Client::new();
    let result = match &args.target {
        Some(target) => client.self_update_at(&options, target)?,
        None => client.self_update(&options)?,
    };

    if !ctx.quiet {
        ui::success(&format!("getkit updated to {}", result.version));
        ui::kv("Path", &result.path.display().to_string());
    }
    log::debug!("Update source: {}", result.url);

    Ok(())
}
