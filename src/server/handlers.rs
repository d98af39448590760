use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    job::{parse_station_list, JobRequest},
    progress::ProgressSnapshot,
};

use super::{ApiError, AppState};

pub async fn health() -> &'static str {
    "ok"
}

/// POST /jobs
///
/// Form fields follow the upload page: `station_file`, repeated `data_type`,
/// `all_data`, `start_date`, `end_date` and `parameter_cd`.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut upload = None;
    let mut request = JobRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "station_file" => upload = Some(field.bytes().await.map_err(bad_form)?),
            "data_type" => request
                .data_types
                .push(field.text().await.map_err(bad_form)?.parse()?),
            "all_data" => request.all_data = field.text().await.map_err(bad_form)? == "true",
            "start_date" => request.start_date = Some(field.text().await.map_err(bad_form)?),
            "end_date" => request.end_date = Some(field.text().await.map_err(bad_form)?),
            "parameter_cd" => request.parameter_code = Some(field.text().await.map_err(bad_form)?),
            _ => {}
        }
    }

    let upload =
        upload.ok_or_else(|| ApiError::BadRequest("please upload a station file".to_string()))?;
    let stations = parse_station_list(&upload)?;
    let job = request.into_job(stations)?;
    let id = state.start(job)?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": id }))))
}

/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    Ok(Json(state.reporter(id)?.snapshot()))
}

/// POST /jobs/:id/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ProgressSnapshot>), ApiError> {
    let reporter = state.cancel(id)?;
    Ok((StatusCode::ACCEPTED, Json(reporter.snapshot())))
}

/// GET /jobs/:id/events
///
/// One `progress` event per published snapshot; the stream ends after the
/// snapshot that completes or cancels the job.
pub async fn job_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut reporter = state.reporter(id)?;
    info!(%id, "SSE client connected");

    let stream = async_stream::stream! {
        let mut snapshot = reporter.snapshot();
        loop {
            match Event::default().event("progress").json_data(&snapshot) {
                Ok(event) => yield Ok(event),
                Err(e) => {
                    warn!("SSE: Failed to serialise progress: {}", e);
                    break;
                }
            }
            if snapshot.is_terminal() {
                break;
            }
            match reporter.changed().await {
                Some(next) => snapshot = next,
                None => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn bad_form(e: MultipartError) -> ApiError {
    ApiError::BadRequest(e.to_string())
}

// -- Tests -------------------------------------------------------------------
