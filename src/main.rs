//! automl-select - Main Entry Point

use clap::Parser;
use automl_select::cli::{cmd_diagnose, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "automl_select=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => cmd_train(&args)?,
        Commands::Diagnose(args) => cmd_diagnose(&args)?,
    }

    Ok(())
}
