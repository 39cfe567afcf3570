use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omni-pipeline")]
#[command(
    about = "Queue a Jenkins job, follow its downstream pipeline and report one verdict for the tree."
)]
pub(crate) struct Cli {
    /// Override config directory (same semantics as Python `--conf`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enqueue a job and track it (and everything it triggers) to completion.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct RunArgs {
    /// Jenkins job name.
    #[arg(long)]
    pub(crate) job: String,

    /// Jenkins server URL (default: `jenkins.server_url` from settings).
    #[arg(long)]
    pub(crate) server_url: Option<String>,

    /// Basic-auth user name.
    #[arg(long)]
    pub(crate) username: Option<String>,

    /// Env var holding the password or API token.
    #[arg(long)]
    pub(crate) password_env: Option<String>,

    /// Job parameter as name=value; repeat for several. Uses buildWithParameters.
    #[arg(long = "parameter", value_name = "NAME=VALUE")]
    pub(crate) parameters: Vec<String>,

    /// Only enqueue; do not stream the console or wait for the result.
    #[arg(long)]
    pub(crate) no_console: bool,

    /// Do not follow downstream projects.
    #[arg(long)]
    pub(crate) no_pipeline: bool,

    /// Delay between polls of the same job, in milliseconds (default: 5000).
    #[arg(long)]
    pub(crate) poll_interval_ms: Option<u64>,

    /// Write a markdown summary of the job tree into this directory.
    #[arg(long)]
    pub(crate) summary_dir: Option<PathBuf>,

    /// Print debug logs.
    #[arg(long, default_value_t = false)]
    pub(crate) verbose: bool,
}
