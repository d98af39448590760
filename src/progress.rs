//! Job-scoped progress shared between the batch driver and its observers.
//!
//! The driver owns the only [`ProgressWriter`]; every update is applied to
//! the snapshot in one `send_modify`, so a [`ProgressReporter`] always sees
//! a whole snapshot, never a half-applied one.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::watch;

use crate::{error::FailureKind, job::DataType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum Outcome {
    Saved { path: PathBuf },
    Failed { kind: FailureKind, reason: String },
}

impl Outcome {
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        Outcome::Failed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Outcome::Saved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactOutcome {
    pub data_type: DataType,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Everything that happened to one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReport {
    pub station: String,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl StationReport {
    pub fn new(station: &str) -> Self {
        StationReport {
            station: station.to_string(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, data_type: DataType, outcome: Outcome) {
        self.outcomes.push(ArtifactOutcome { data_type, outcome });
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_saved())
    }

    pub fn outcome(&self, data_type: DataType) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.data_type == data_type)
            .map(|o| &o.outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    pub total: usize,
    pub completed: usize,
    pub current: Option<String>,
    pub reports: Vec<StationReport>,
}

impl ProgressSnapshot {
    fn new(total: usize) -> Self {
        ProgressSnapshot {
            status: JobStatus::Pending,
            total,
            completed: 0,
            current: None,
            reports: Vec::with_capacity(total),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Cancelled)
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }

    pub fn failures(&self) -> impl Iterator<Item = &StationReport> {
        self.reports.iter().filter(|r| !r.is_success())
    }

    pub fn summary(&self) -> String {
        let failed = self.failures().count();
        format!(
            "{} of {} stations processed, {} succeeded, {} failed",
            self.completed,
            self.total,
            self.completed - failed,
            failed
        )
    }
}

/// Creates the progress state for a job of `total` stations.
pub fn channel(total: usize) -> (ProgressWriter, ProgressReporter) {
    let (tx, rx) = watch::channel(ProgressSnapshot::new(total));
    (ProgressWriter { tx }, ProgressReporter { rx })
}

pub struct ProgressWriter {
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressWriter {
    pub fn start(&self) {
        self.tx.send_modify(|s| s.status = JobStatus::Running);
    }

    pub fn begin(&self, station: &str) {
        self.tx.send_modify(|s| s.current = Some(station.to_string()));
    }

    /// Records a finished station. Reports beyond the job's total are dropped.
    pub fn record(&self, report: StationReport) {
        self.tx.send_modify(|s| {
            if s.completed < s.total {
                s.completed += 1;
                s.reports.push(report);
            }
        });
    }

    pub fn finish(&self) {
        self.tx.send_modify(|s| {
            s.status = JobStatus::Completed;
            s.current = None;
        });
    }

    pub fn cancel(&self) {
        self.tx.send_modify(|s| {
            s.status = JobStatus::Cancelled;
            s.current = None;
        });
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }
}

/// Read-only view of a job's progress.
#[derive(Clone)]
pub struct ProgressReporter {
    rx: watch::Receiver<ProgressSnapshot>,
}

impl ProgressReporter {
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.rx.borrow().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.rx.borrow().status
    }

    /// Waits for the next update and returns it, or `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<ProgressSnapshot> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Waits until the job completes or is cancelled.
    pub async fn wait_terminal(&mut self) -> ProgressSnapshot {
        let terminal = self
            .rx
            .wait_for(ProgressSnapshot::is_terminal)
            .await
            .map(|snapshot| snapshot.clone());

        terminal.unwrap_or_else(|_| self.snapshot())
    }
}

// -- Tests -------------------------------------------------------------------
