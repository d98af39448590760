//! Client for the Network Linked Data Index (NLDI) basin service.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{
    download::{get_text, RetryPolicy},
    error::FetchError,
    fetcher::CatchmentSource,
    geometry::FeatureCollection,
};

pub struct NldiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl NldiClient {
    pub fn new(client: Client, base_url: &str, retry: RetryPolicy) -> Self {
        NldiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Upstream drainage basin of a gage, as a GeoJSON feature collection.
    pub async fn basin(&self, station: &str) -> Result<FeatureCollection, FetchError> {
        let url = basin_url(&self.base_url, station);
        let query = [
            ("simplified", "true".to_string()),
            ("splitCatchment", "false".to_string()),
        ];

        let body = get_text(&self.client, &url, &query, self.retry)
            .await?
            .ok_or_else(|| FetchError::NotFound(station.to_string()))?;

        let basin = parse_basin(station, &body)?;
        debug!(station, features = basin.features.len(), "Basin received");

        Ok(basin)
    }
}

#[async_trait]
impl CatchmentSource for NldiClient {
    async fn fetch_catchment(&self, station: &str) -> Result<FeatureCollection, FetchError> {
        self.basin(station).await
    }
}

fn basin_url(base_url: &str, station: &str) -> String {
    format!("{base_url}/linked-data/nwissite/USGS-{station}/basin")
}

fn parse_basin(station: &str, body: &str) -> Result<FeatureCollection, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::NotFound(station.to_string()));
    }

    let basin: FeatureCollection = serde_json::from_str(body)?;
    if basin.is_empty() {
        return Err(FetchError::NotFound(station.to_string()));
    }

    Ok(basin)
}

// -- Tests -------------------------------------------------------------------
