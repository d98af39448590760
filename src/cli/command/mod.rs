pub mod fetch;
pub mod serve;
pub mod stations;

use std::sync::Arc;

use anyhow::Result;
pub use fetch::fetch;
pub use serve::serve;
pub use stations::stations;

use crate::{
    batch::BatchDriver, config::Settings, download::build_client, fetcher::StationFetcher,
    nldi::NldiClient, nwis::NwisClient,
};

/// Wires the USGS clients into a batch driver using `settings`.
pub fn build_driver(settings: &Settings, concurrency: usize) -> Result<BatchDriver> {
    let client = build_client(settings.timeout())?;
    let retry = settings.retry_policy();

    let nwis = NwisClient::new(client.clone(), &settings.nwis_url, retry);
    let nldi = NldiClient::new(client, &settings.nldi_url, retry);
    let fetcher = StationFetcher::new(Arc::new(nwis), Arc::new(nldi), settings.layout()?);

    Ok(BatchDriver::new(Arc::new(fetcher)).with_concurrency(concurrency))
}
