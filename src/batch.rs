//! Drives a download job across its stations.
//!
//! Stations are taken in input order. With the default concurrency of one
//! the batch is strictly sequential; a larger value keeps up to that many
//! stations in flight while still publishing reports in input order. A
//! failure at one station never stops the batch, and a hung upstream call
//! holds it up until the HTTP timeout fires.

use std::sync::Arc;

use futures::{future, stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    fetcher::StationFetcher,
    job::DownloadJob,
    progress::{self, ProgressReporter, ProgressSnapshot, ProgressWriter},
};

pub struct BatchDriver {
    fetcher: Arc<StationFetcher>,
    concurrency: usize,
}

impl BatchDriver {
    pub fn new(fetcher: Arc<StationFetcher>) -> Self {
        BatchDriver {
            fetcher,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `job` to completion, or until `cancel` fires between stations.
    pub async fn run(
        &self,
        job: Arc<DownloadJob>,
        progress: &ProgressWriter,
        cancel: &CancellationToken,
    ) -> ProgressSnapshot {
        info!(
            stations = job.stations.len(),
            data_types = ?job.data_types,
            concurrency = self.concurrency,
            "Starting batch"
        );
        progress.start();

        let token = cancel.clone();
        let mut reports = stream::iter(job.stations.clone())
            .take_while(move |_: &String| future::ready(!token.is_cancelled()))
            .map(|station: String| {
                progress.begin(&station);
                let fetcher = Arc::clone(&self.fetcher);
                let job = Arc::clone(&job);
                async move { fetcher.fetch(&station, &job).await }
            })
            .buffered(self.concurrency);

        while let Some(report) = reports.next().await {
            progress.record(report);
        }

        let snapshot = progress.snapshot();
        if snapshot.completed < snapshot.total {
            warn!(
                completed = snapshot.completed,
                total = snapshot.total,
                "Batch cancelled"
            );
            progress.cancel();
        } else {
            info!("{}", snapshot.summary());
            progress.finish();
        }

        progress.snapshot()
    }
}

/// A job running on the runtime.
pub struct JobHandle {
    pub reporter: ProgressReporter,
    pub cancel: CancellationToken,
    pub task: JoinHandle<ProgressSnapshot>,
}

/// Spawns `job` on `driver` and returns a handle for observing or cancelling it.
pub fn spawn_job(driver: Arc<BatchDriver>, job: DownloadJob) -> JobHandle {
    let (writer, reporter) = progress::channel(job.stations.len());
    let cancel = CancellationToken::new();
    let job = Arc::new(job);

    let token = cancel.clone();
    let task = tokio::spawn(async move { driver.run(job, &writer, &token).await });

    JobHandle {
        reporter,
        cancel,
        task,
    }
}

// -- Tests -------------------------------------------------------------------
