//! omni-pipeline CLI: enqueue a Jenkins job and track its pipeline.
//!
//! Server and tracking defaults come from the `jenkins:` section of
//! `settings.yaml`; flags override them.
//!
//! Logging: set `RUST_LOG=omni_pipeline=debug` (or `warn`) to change the log
//! level on stderr. Console text of the tracked jobs goes to stdout.

mod cli;
mod run;
mod summary;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_pipeline::{load_runtime_settings, set_config_home_override};

use crate::cli::{Cli, Command};
use crate::run::run_mode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // Initialize tracing: RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let verbose = matches!(&cli.command, Command::Run(args) if args.verbose);
        EnvFilter::new(if verbose {
            "omni_pipeline=debug,omni_jenkins=debug"
        } else {
            "omni_pipeline=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime_settings = load_runtime_settings();

    match cli.command {
        Command::Run(args) => {
            let succeeded = run_mode(args, &runtime_settings).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
