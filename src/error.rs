//! Error types for job input and per-station retrieval.

use serde::Serialize;
use thiserror::Error;

/// How a per-station failure is treated by the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Expected: no data in range, or station unknown to the index.
    Soft,
    /// Connectivity problems reaching the upstream provider.
    Transient,
    /// Anything else that went wrong for this station.
    Fatal,
}

/// Rejections raised while building a job, before any batch exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("the station list is empty")]
    EmptyStationList,

    #[error("unable to read the station list: {0}")]
    Unreadable(String),

    #[error("select at least one data type to download")]
    NoDataTypes,

    #[error("unknown data type `{0}`")]
    UnknownDataType(String),

    #[error("start and end dates are required unless all available data is requested")]
    MissingDateRange,

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: String, end: String },
}

/// Errors raised while retrieving data for a single station.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no data available for station {0}")]
    NoData(String),

    #[error("station {0} not found")]
    NotFound(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::NoData(_) | FetchError::NotFound(_) => FailureKind::Soft,
            FetchError::Http(e) if e.is_builder() || e.is_decode() => FailureKind::Fatal,
            FetchError::Http(_) => FailureKind::Transient,
            FetchError::Status { status, .. } if *status == 429 || *status >= 500 => {
                FailureKind::Transient
            }
            FetchError::Status { .. } | FetchError::Malformed(_) | FetchError::Json(_) => {
                FailureKind::Fatal
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_classify_missing_data_as_soft() {
        assert_eq!(FetchError::NoData("01".into()).kind(), FailureKind::Soft);
        assert_eq!(FetchError::NotFound("01".into()).kind(), FailureKind::Soft);
    }

    #[test]
    fn should_classify_server_errors_as_transient() {
        let busy = FetchError::Status {
            status: 503,
            url: "http://x".into(),
        };
        let throttled = FetchError::Status {
            status: 429,
            url: "http://x".into(),
        };
        assert_eq!(busy.kind(), FailureKind::Transient);
        assert_eq!(throttled.kind(), FailureKind::Transient);
    }

    #[test]
    fn should_classify_client_errors_as_fatal() {
        let bad = FetchError::Status {
            status: 400,
            url: "http://x".into(),
        };
        assert_eq!(bad.kind(), FailureKind::Fatal);
        assert_eq!(FetchError::Malformed("x".into()).kind(), FailureKind::Fatal);
    }
}
