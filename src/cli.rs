use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "azr",
    version,
    about = "Browse Azure subscriptions, resource groups and resources from the terminal."
)]
pub struct CliArgs {
    /// Path to a config file (defaults to azr.yaml discovery)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serve data from a YAML fixture instead of calling the az CLI
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// az executable to run
    #[arg(long = "az")]
    pub az_command: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
