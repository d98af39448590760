//! Turns an uploaded station list and user options into a download job.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// USGS parameter code for discharge in cubic feet per second.
pub const DISCHARGE: &str = "00060";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Streamflow,
    Catchment,
}

impl FromStr for DataType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "streamflow" => Ok(DataType::Streamflow),
            "catchment" => Ok(DataType::Catchment),
            other => Err(JobError::UnknownDataType(other.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Streamflow => write!(f, "streamflow"),
            DataType::Catchment => write!(f, "catchment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DateSelection {
    /// The whole period of record.
    All,
    Range { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadJob {
    pub stations: Vec<String>,
    pub data_types: Vec<DataType>,
    pub dates: DateSelection,
    pub parameter_code: String,
}

impl DownloadJob {
    pub fn wants(&self, data_type: DataType) -> bool {
        self.data_types.contains(&data_type)
    }
}

/// Options as they arrive from a form or the command line, before checking.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub data_types: Vec<DataType>,
    pub all_data: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub parameter_code: Option<String>,
}

impl JobRequest {
    pub fn into_job(self, stations: Vec<String>) -> Result<DownloadJob, JobError> {
        if stations.is_empty() {
            return Err(JobError::EmptyStationList);
        }

        let mut data_types = Vec::with_capacity(2);
        for data_type in self.data_types {
            if !data_types.contains(&data_type) {
                data_types.push(data_type);
            }
        }
        if data_types.is_empty() {
            return Err(JobError::NoDataTypes);
        }

        let dates = if self.all_data || !data_types.contains(&DataType::Streamflow) {
            DateSelection::All
        } else {
            date_range(self.start_date.as_deref(), self.end_date.as_deref())?
        };

        let parameter_code = self
            .parameter_code
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DISCHARGE.to_string());

        Ok(DownloadJob {
            stations,
            data_types,
            dates,
            parameter_code,
        })
    }
}

/// Reads one station ID per line, ignoring blank lines and surrounding space.
pub fn parse_station_list(bytes: &[u8]) -> Result<Vec<String>, JobError> {
    let text = std::str::from_utf8(bytes).map_err(|e| JobError::Unreadable(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let stations: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if stations.is_empty() {
        return Err(JobError::EmptyStationList);
    }

    Ok(stations)
}

fn date_range(start: Option<&str>, end: Option<&str>) -> Result<DateSelection, JobError> {
    let (start, end) = match (non_blank(start), non_blank(end)) {
        (Some(start), Some(end)) => (parse_date(start)?, parse_date(end)?),
        _ => return Err(JobError::MissingDateRange),
    };

    if start > end {
        return Err(JobError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    Ok(DateSelection::Range { start, end })
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, JobError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| JobError::InvalidDate(s.to_string()))
}

// -- Tests -------------------------------------------------------------------
