//! `getkit get`: resolve, download and install tools.

use crate::Context;
use crate::cli::GetArgs;
use crate::ui;
use anyhow::Result;
use std::ffi::OsStr;
use std::path::Path;
use toolchain::{Client, InstallOptions, InstallResult, config};

/// Run the get command.
pub fn run(ctx: &Context, args: GetArgs) -> Result<()> {
    let options = options_from(&args)?;
    let client = Client::new();

    // Unknown names fail before anything is downloaded
    for name in &args.tools {
        client.tool(name)?;
    }

    let platform = options.platform();
    log::debug!("Target platform: {platform}");

    let total = args.tools.len();
    for (i, name) in args.tools.iter().enumerate() {
        if !ctx.quiet && total > 1 {
            ui::step(i + 1, total, &format!("Downloading {name}"));
        }
        let result = client.install(name, &options)?;
        if !ctx.quiet {
            report(&result);
        }
    }

    if !ctx.quiet
        && options.install_dir.is_none()
        && let Ok(dir) = config::default_install_dir()
        && !on_path(&dir, std::env::var_os("PATH").as_deref())
    {
        path_tip(&dir);
    }

    Ok(())
}

/// Translate command-line arguments into engine options.
fn options_from(args: &GetArgs) -> Result<InstallOptions> {
    let mut options = InstallOptions::new()
        .stash(!args.no_stash)
        .progress(config::effective_progress(args.progress.enabled())?);

    if let Some(version) = args.version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        options = options.version(version);
    }
    if let Some(os) = &args.os {
        options = options.os(os);
    }
    if let Some(arch) = &args.arch {
        options = options.arch(arch);
    }
    if let Some(path) = &args.path {
        options = options.install_dir(config::expand_path(path));
    }

    Ok(options)
}

fn report(result: &InstallResult) {
    ui::success(&format!(
        "{} {} ({})",
        result.tool,
        result.version,
        ui::format_size(result.size)
    ));
    ui::kv("Path", &result.path.display().to_string());
    if let Some(stash) = &result.stash_path {
        ui::kv("Stash", &stash.display().to_string());
    }
}

fn path_tip(dir: &Path) {
    println!();
    ui::info("Add the install directory to your PATH:");
    println!("  export PATH=$PATH:{}", dir.display());
}

/// Whether `dir` is one of the entries of a `PATH`-style variable.
fn on_path(dir: &Path, path_var: Option<&OsStr>) -> bool {
    path_var.is_some_and(|var| std::env::split_paths(var).any(|entry| entry == dir))
}
