mod batch;
mod catchment;
mod cli;
mod config;
mod datum;
mod download;
mod error;
mod fetcher;
mod geometry;
mod job;
mod nldi;
mod nwis;
mod output;
mod parquet;
mod progress;
mod rdb;
mod server;
#[cfg(test)]
mod testing;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Stations { state } => match command::stations(&cli.settings, state).await {
            Ok(filename) => println!("File saved to `{}`", filename),
            Err(e) => eprintln!("Error: {}", e),
        },
        Commands::Fetch(args) => match command::fetch(&cli.settings, args).await {
            Ok(snapshot) => println!("{}", snapshot.summary()),
            Err(e) => eprintln!("Error: {}", e),
        },
        Commands::Serve { bind, concurrency } => {
            if let Err(e) = command::serve(&cli.settings, *bind, *concurrency as usize).await {
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}
