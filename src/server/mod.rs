//! HTTP service: submit a job, then poll or stream its progress.
//!
//! - `POST /jobs` multipart form, returns `{ "job_id": ... }`
//! - `GET /jobs/:id` current progress snapshot
//! - `GET /jobs/:id/events` server-sent progress events until the job ends
//! - `POST /jobs/:id/cancel` stop after the current station
//! - `GET /health`

pub mod handlers;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    batch::{spawn_job, BatchDriver},
    error::JobError,
    job::DownloadJob,
    progress::{JobStatus, ProgressReporter, ProgressSnapshot},
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

struct JobEntry {
    reporter: ProgressReporter,
    cancel: CancellationToken,
    task: JoinHandle<ProgressSnapshot>,
}

impl JobEntry {
    // A job whose task died without publishing a terminal status counts as
    // finished too.
    fn is_finished(&self) -> bool {
        matches!(
            self.reporter.status(),
            JobStatus::Completed | JobStatus::Cancelled
        ) || self.task.is_finished()
    }
}

#[derive(Clone)]
pub struct AppState {
    driver: Arc<BatchDriver>,
    jobs: Arc<RwLock<HashMap<Uuid, JobEntry>>>,
}

impl AppState {
    pub fn new(driver: Arc<BatchDriver>) -> Self {
        AppState {
            driver,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Starts `job` unless another one is still running. Finished jobs are
    /// forgotten once a new one starts.
    pub fn start(&self, job: DownloadJob) -> Result<Uuid, ApiError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;

        if jobs.values().any(|j| !j.is_finished()) {
            return Err(ApiError::Conflict(
                "a download job is already running".to_string(),
            ));
        }
        for (id, entry) in jobs.drain() {
            if !entry.reporter.snapshot().is_terminal() {
                warn!(%id, "Previous job ended without finishing");
            }
        }

        let stations = job.stations.len();
        let handle = spawn_job(Arc::clone(&self.driver), job);
        let id = Uuid::new_v4();
        jobs.insert(
            id,
            JobEntry {
                reporter: handle.reporter,
                cancel: handle.cancel,
                task: handle.task,
            },
        );
        info!(%id, stations, "Job started");

        Ok(id)
    }

    pub fn reporter(&self, id: Uuid) -> Result<ProgressReporter, ApiError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        jobs.get(&id)
            .map(|j| j.reporter.clone())
            .ok_or_else(|| ApiError::NotFound(format!("job {id}")))
    }

    pub fn cancel(&self, id: Uuid) -> Result<ProgressReporter, ApiError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let entry = jobs
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("job {id}")))?;
        entry.cancel.cancel();
        info!(%id, "Job cancellation requested");

        Ok(entry.reporter.clone())
    }
}

fn poisoned() -> ApiError {
    ApiError::Internal("job registry lock poisoned".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/jobs", post(handlers::submit_job))
        .route("/jobs/:id", get(handlers::get_job))
        .route("/jobs/:id/events", get(handlers::job_events))
        .route("/jobs/:id/cancel", post(handlers::cancel_job))
        .with_state(state)
}

// -- Tests -------------------------------------------------------------------
