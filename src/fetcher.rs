//! Retrieves and saves every requested data type for one station.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    catchment,
    error::{FailureKind, FetchError},
    geometry::{AlbersEqualArea, FeatureCollection},
    job::{DataType, DateSelection, DownloadJob},
    nwis::DailyValue,
    output::OutputLayout,
    parquet,
    progress::{Outcome, StationReport},
};

/// Source of daily time series for a station.
#[async_trait]
pub trait StreamflowSource: Send + Sync {
    async fn fetch_timeseries(
        &self,
        station: &str,
        parameter_code: &str,
        dates: &DateSelection,
    ) -> Result<Vec<DailyValue>, FetchError>;
}

/// Source of the drainage basin boundary for a station.
#[async_trait]
pub trait CatchmentSource: Send + Sync {
    async fn fetch_catchment(&self, station: &str) -> Result<FeatureCollection, FetchError>;
}

pub struct StationFetcher {
    streamflow: Arc<dyn StreamflowSource>,
    catchment: Arc<dyn CatchmentSource>,
    layout: OutputLayout,
    projection: AlbersEqualArea,
}

impl StationFetcher {
    pub fn new(
        streamflow: Arc<dyn StreamflowSource>,
        catchment: Arc<dyn CatchmentSource>,
        layout: OutputLayout,
    ) -> Self {
        StationFetcher {
            streamflow,
            catchment,
            layout,
            projection: AlbersEqualArea::conus(),
        }
    }

    /// Never fails: every problem ends up as an outcome in the report.
    pub async fn fetch(&self, station: &str, job: &DownloadJob) -> StationReport {
        let mut report = StationReport::new(station);

        for &data_type in &job.data_types {
            let outcome = if !is_safe_file_stem(station) {
                Outcome::failed(
                    FailureKind::Fatal,
                    format!("station id `{station}` cannot be used as a file name"),
                )
            } else {
                match data_type {
                    DataType::Streamflow => self.fetch_streamflow(station, job).await,
                    DataType::Catchment => self.fetch_catchment(station).await,
                }
            };

            match &outcome {
                Outcome::Saved { path } => {
                    info!(station, %data_type, path = %path.display(), "Saved")
                }
                Outcome::Failed { kind, reason } => {
                    warn!(station, %data_type, ?kind, "Failed: {}", reason)
                }
            }
            report.push(data_type, outcome);
        }

        report
    }

    async fn fetch_streamflow(&self, station: &str, job: &DownloadJob) -> Outcome {
        let fetched = self
            .streamflow
            .fetch_timeseries(station, &job.parameter_code, &job.dates)
            .await;

        let values = match fetched {
            Ok(values) if values.is_empty() => {
                return Outcome::failed(
                    FailureKind::Soft,
                    format!("no streamflow data for station {station}"),
                )
            }
            Ok(values) => values,
            Err(e) => return Outcome::failed(e.kind(), e.to_string()),
        };

        let path = self.layout.streamflow_path(station);
        match parquet::save_streamflow(&values, &path) {
            Ok(()) => Outcome::Saved { path },
            Err(e) => Outcome::failed(
                FailureKind::Fatal,
                format!("could not write {}: {:#}", path.display(), e),
            ),
        }
    }

    async fn fetch_catchment(&self, station: &str) -> Outcome {
        let mut basin = match self.catchment.fetch_catchment(station).await {
            Ok(basin) if basin.is_empty() => {
                return Outcome::failed(
                    FailureKind::Soft,
                    format!("no catchment found for station {station}"),
                )
            }
            Ok(basin) => basin,
            Err(e) => return Outcome::failed(e.kind(), e.to_string()),
        };

        let area = basin.annotate_area(&self.projection);
        debug!(station, area_km2 = area, "Catchment area computed");

        let path = self.layout.catchment_path(station);
        match catchment::save_catchment(station, &basin, &path) {
            Ok(()) => Outcome::Saved { path },
            Err(e) => Outcome::failed(
                FailureKind::Fatal,
                format!("could not write {}: {:#}", path.display(), e),
            ),
        }
    }
}

// Station IDs become file names; keep them inside the output folders.
fn is_safe_file_stem(station: &str) -> bool {
    !station.is_empty()
        && station != "."
        && station != ".."
        && !station.contains(['/', '\\', '\0'])
}

// -- Tests -------------------------------------------------------------------
