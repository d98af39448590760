//! Runtime settings, taken from the command line or the environment.

use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use clap::Args;

use crate::{download::RetryPolicy, output::OutputLayout};

pub const DEFAULT_NWIS_URL: &str = "https://waterservices.usgs.gov/nwis";
pub const DEFAULT_NLDI_URL: &str = "https://api.water.usgs.gov/nldi";

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Root folder for downloaded files [default: ~/usgs-data]
    #[arg(long, global = true, env = "USGS_FETCH_OUTPUT")]
    pub output_dir: Option<PathBuf>,

    /// Base URL of the NWIS water services
    #[arg(long, global = true, env = "USGS_NWIS_URL", default_value = DEFAULT_NWIS_URL)]
    pub nwis_url: String,

    /// Base URL of the NLDI service
    #[arg(long, global = true, env = "USGS_NLDI_URL", default_value = DEFAULT_NLDI_URL)]
    pub nldi_url: String,

    /// Retries per request after a connectivity failure
    #[arg(long, global = true, env = "USGS_FETCH_RETRIES", default_value_t = 2)]
    pub retries: u32,

    /// Initial delay between retries, doubled after each attempt
    #[arg(long, global = true, default_value_t = 500)]
    pub backoff_ms: u64,

    /// Timeout for a single HTTP request
    #[arg(long, global = true, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl Settings {
    pub fn output_root(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join("usgs-data"))
                .ok_or_else(|| anyhow!("Could not resolve a home directory, pass --output-dir")),
        }
    }

    pub fn layout(&self) -> Result<OutputLayout> {
        Ok(OutputLayout::new(self.output_root()?))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn should_apply_defaults() {
        let h = Harness::parse_from(["test", "--output-dir", "/tmp/usgs"]);

        assert_eq!(h.settings.nwis_url, DEFAULT_NWIS_URL);
        assert_eq!(h.settings.nldi_url, DEFAULT_NLDI_URL);
        assert_eq!(h.settings.output_root().unwrap(), PathBuf::from("/tmp/usgs"));
        assert_eq!(h.settings.retry_policy().backoff, Duration::from_millis(500));
    }
}
