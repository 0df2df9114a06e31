use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// xpi-lint CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "xpi-lint",
    version,
    about = "Analyze add-on JavaScript (as ESTree JSON) for security and compatibility hazards",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub analyze: AnalyzeArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze ESTree JSON files or directories.
    Analyze(AnalyzeArgs),

    /// List catalog entries and banned identifiers.
    ListHazards,

    /// Explain a catalog path (e.g. `Components.utils.evalInSandbox`).
    Explain {
        /// Dotted catalog path.
        path: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct AnalyzeArgs {
    /// ESTree JSON files or directories. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Metadata entries (`key=value`), e.g. `em:bootstrap=true`.
    #[arg(long = "metadata", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,

    /// Targeted application versions (`guid=version`).
    #[arg(long = "target", value_name = "GUID=VERSION")]
    pub targets: Vec<String>,

    /// Path to an explicit `xpi-lint.toml`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fail on warnings as well as errors.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}
