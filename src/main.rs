mod cli;
mod commands;
mod ui;

use clap::Parser;
use cli::{Cli, Command};
use toolchain::{Catalog, Error as ToolError};

/// Exit status after Ctrl-C.
const EXIT_SIGINT: i32 = 130;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    // In-flight downloads are abandoned; their temp dirs may remain
    if let Err(e) = ctrlc::set_handler(|| std::process::exit(EXIT_SIGINT)) {
        log::debug!("Could not install Ctrl-C handler: {e}");
    }

    let ctx = Context { quiet: cli.quiet };

    let result = match cli.command {
        Command::Get(args) => commands::get::run(&ctx, args),
        Command::List(args) => commands::list::run(&ctx, &args),
        Command::Update(args) => commands::update::run(&ctx, args),
    };

    if let Err(err) = result {
        report(&err);
        std::process::exit(1);
    }
}

/// Print an error on stderr, with remediation when it came from the engine.
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    let Some(tool_err) = err.downcast_ref::<ToolError>() else {
        return;
    };

    if let ToolError::UnknownTool {
        suggestion: Some(suggestion),
        ..
    } = tool_err
    {
        ui::hint(suggestion);
        return;
    }

    let category = tool_err.category();

    match commands::releases_link(&Catalog::builtin(), tool_err) {
        Some(link) => {
            eprintln!();
            ui::hint(&format!("{}. Releases:", category.advice()));
            ui::hint(&link);
        }
        None => ui::hint(category.advice()),
    }
}
