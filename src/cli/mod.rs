//! Command line interface.

pub mod command;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Settings,
    job::{DataType, JobRequest},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get the list of stream gages with daily discharge in a state
    Stations {
        /// Two letter state code, e.g. VA
        #[arg(long)]
        state: String,
    },
    /// Download streamflow and/or catchment data for a list of stations
    Fetch(FetchArgs),
    /// Serve the downloader over HTTP
    Serve {
        #[arg(long, env = "USGS_FETCH_BIND", default_value = "127.0.0.1:5001")]
        bind: SocketAddr,

        /// Stations processed at once by each job
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=8))]
        concurrency: u16,
    },
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Text file with one station ID per line
    #[arg(long, short)]
    pub stations: PathBuf,

    /// Download daily streamflow time series
    #[arg(long)]
    pub streamflow: bool,

    /// Download catchment boundaries
    #[arg(long)]
    pub catchment: bool,

    /// Download the whole period of record; overrides --start and --end
    #[arg(long)]
    pub all_data: bool,

    /// First day of the time series (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the time series (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Parameter code [default: 00060, discharge]
    #[arg(long, short)]
    pub parameter_code: Option<String>,

    /// Stations processed at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=8))]
    pub concurrency: u16,
}

impl FetchArgs {
    pub fn request(&self) -> JobRequest {
        let mut data_types = Vec::new();
        if self.streamflow {
            data_types.push(DataType::Streamflow);
        }
        if self.catchment {
            data_types.push(DataType::Catchment);
        }

        JobRequest {
            data_types,
            all_data: self.all_data,
            start_date: self.start.clone(),
            end_date: self.end.clone(),
            parameter_code: self.parameter_code.clone(),
        }
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_parse_fetch_command() {
        let cli = Cli::parse_from([
            "usgs-fetch",
            "fetch",
            "--stations",
            "stations.txt",
            "--streamflow",
            "--catchment",
            "--start",
            "2020-01-01",
            "--end",
            "2020-12-31",
            "--output-dir",
            "/tmp/out",
        ]);

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        let request = args.request();
        assert_eq!(request.data_types, vec![DataType::Streamflow, DataType::Catchment]);
        assert_eq!(request.start_date.as_deref(), Some("2020-01-01"));
        assert!(!request.all_data);
        assert_eq!(args.concurrency, 1);
        assert_eq!(cli.settings.output_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn should_bound_concurrency() {
        let result = Cli::try_parse_from([
            "usgs-fetch",
            "fetch",
            "--stations",
            "s.txt",
            "--catchment",
            "--concurrency",
            "64",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn should_create_progress_bar() {
        let pb = create_progress_bar(10, "Downloading".to_string());
        pb.set_position(4);

        assert_eq!(pb.length(), Some(10));
        assert_eq!(pb.position(), 4);
    }
}
