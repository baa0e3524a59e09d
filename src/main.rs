use anyhow::Result;
use clap::Parser;
use cloudshell_open::config::{config_path as default_config_path, ensure_config_file, Settings};
use cloudshell_open::*;
use colored::*;
use dotenv::dotenv;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = default_config_path();

    if let Err(e) = dispatch(&cli.command, &path).await {
        eprintln!("{} {:#}", "Error:".bold().red(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn dispatch(command: &Commands, path: &Path) -> Result<()> {
    // `config path` and `config reset` must work even when the file is broken
    match command {
        Commands::ServiceName(args) => service_name(args).await,
        Commands::Config(ConfigCommands::Path) => config_path(path).await,
        Commands::Config(ConfigCommands::Reset) => config_reset(path).await,
        Commands::Config(ConfigCommands::View) => config_view(&load_settings(path)?, path).await,
        Commands::Describe(args) => describe(args, &load_settings(path)?).await,
        Commands::EnvVars(args) => env_vars(args, &load_settings(path)?).await,
        Commands::Open(args) => open(args, &load_settings(path)?).await,
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    ensure_config_file(path)?;
    Settings::load_from(path)
}
