use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "getkit")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Download and install CLI tools from their GitHub releases", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download one or more tools
    Get(GetArgs),

    /// List the tools that can be installed
    List(ListArgs),

    /// Replace this executable with the latest release
    Update(UpdateArgs),
}

// ============================================================================
// Get
// ============================================================================

#[derive(Args)]
pub struct GetArgs {
    /// Tools to install, e.g. kubectl helm
    #[arg(required = true)]
    pub tools: Vec<String>,

    /// Version to install instead of the latest release
    #[arg(long)]
    pub version: Option<String>,

    /// Target operating system (defaults to the running system)
    #[arg(long)]
    pub os: Option<String>,

    /// Target CPU architecture (defaults to the running machine)
    #[arg(long)]
    pub arch: Option<String>,

    /// Directory to install into (defaults to ~/.getkit/bin)
    #[arg(long, env = "GETKIT_PATH")]
    pub path: Option<String>,

    /// Do not keep a copy in ~/.getkit/bin
    #[arg(long)]
    pub no_stash: bool,

    #[command(flatten)]
    pub progress: ProgressArgs,
}

#[derive(Args)]
pub struct ProgressArgs {
    /// Show a progress bar while downloading
    #[arg(long, overrides_with = "no_progress")]
    pub progress: bool,

    /// Never show a progress bar
    #[arg(long, overrides_with = "progress")]
    pub no_progress: bool,
}

impl ProgressArgs {
    /// Progress is on unless `--no-progress` was the last of the pair.
    pub fn enabled(&self) -> bool {
        !self.no_progress
    }
}

// ============================================================================
// List
// ============================================================================

#[derive(Args)]
pub struct ListArgs {
    /// Print the catalogue as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Update
// ============================================================================

#[derive(Args)]
pub struct UpdateArgs {
    /// Version to update to instead of the latest release
    #[arg(long)]
    pub version: Option<String>,

    /// Executable to replace (defaults to the running binary)
    #[arg(long)]
    pub target: Option<PathBuf>,

    #[command(flatten)]
    pub progress: ProgressArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_get_parses_all_flags() {
        let cli = Cli::try_parse_from([
            "getkit",
            "get",
            "kubectl",
            "helm",
            "--version",
            "v1.30.0",
            "--os",
            "darwin",
            "--arch",
            "arm64",
            "--path",
            "/usr/local/bin",
            "--no-stash",
            "--no-progress",
        ])
        .unwrap();

        let Command::Get(args) = cli.command else {
            panic!("Expected get");
        };
        assert_eq!(args.tools, vec!["kubectl", "helm"]);
        assert_eq!(args.version.as_deref(), Some("v1.30.0"));
        assert_eq!(args.os.as_deref(), Some("darwin"));
        assert_eq!(args.arch.as_deref(), Some("arm64"));
        assert_eq!(args.path.as_deref(), Some("/usr/local/bin"));
        assert!(args.no_stash);
        assert!(!args.progress.enabled());
    }

    #[test]
    fn test_get_version_is_a_value() {
        let cli = Cli::try_parse_from(["getkit", "get", "kind", "--version", "v0.23.0"]).unwrap();
        let Command::Get(args) = cli.command else {
            panic!("Expected get");
        };
        assert_eq!(args.version.as_deref(), Some("v0.23.0"));
    }

    #[test]
    fn test_get_requires_a_tool() {
        assert!(Cli::try_parse_from(["getkit", "get"]).is_err());
    }

    #[test]
    fn test_progress_defaults_on() {
        let cli = Cli::try_parse_from(["getkit", "get", "jq"]).unwrap();
        let Command::Get(args) = cli.command else {
            panic!("Expected get");
        };
        assert!(args.progress.enabled());
        assert!(!args.no_stash);
    }

    #[test]
    fn test_last_progress_flag_wins() {
        let cli =
            Cli::try_parse_from(["getkit", "get", "jq", "--no-progress", "--progress"]).unwrap();
        let Command::Get(args) = cli.command else {
            panic!("Expected get");
        };
        assert!(args.progress.enabled());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["getkit", "list", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::List(ListArgs { json: false })));
    }
}
