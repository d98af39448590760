//! In-memory data sources for tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::FetchError,
    fetcher::{CatchmentSource, StreamflowSource},
    geometry::{Feature, FeatureCollection, Geometry},
    job::DateSelection,
    nwis::DailyValue,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    Data,
    Empty,
    Missing,
    Unreachable,
    /// Panics inside the fetch, taking the job's task down with it.
    Panic,
}

/// Answers both streamflow and catchment requests. Stations without a
/// configured behaviour return data.
#[derive(Default)]
pub struct FakeSource {
    behaviours: HashMap<String, Behaviour>,
    delay: Duration,
    streamflow_calls: Mutex<Vec<(String, DateSelection)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        FakeSource::default()
    }

    pub fn with(mut self, station: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(station.to_string(), behaviour);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn streamflow_calls(&self) -> Vec<(String, DateSelection)> {
        self.streamflow_calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behaviour(&self, station: &str) -> Behaviour {
        self.behaviours
            .get(station)
            .copied()
            .unwrap_or(Behaviour::Data)
    }

    async fn call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn unreachable(station: &str) -> FetchError {
    FetchError::Status {
        status: 503,
        url: format!("http://fake/{station}"),
    }
}

#[async_trait]
impl StreamflowSource for FakeSource {
    async fn fetch_timeseries(
        &self,
        station: &str,
        _parameter_code: &str,
        dates: &DateSelection,
    ) -> Result<Vec<DailyValue>, FetchError> {
        self.streamflow_calls
            .lock()
            .unwrap()
            .push((station.to_string(), *dates));
        self.call().await;

        match self.behaviour(station) {
            Behaviour::Data => Ok(vec![DailyValue {
                site_no: station.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                series: "1_00060_00003".to_string(),
                value: Some(42.0),
                qualifier: Some("A".to_string()),
            }]),
            Behaviour::Empty => Ok(Vec::new()),
            Behaviour::Missing => Err(FetchError::NoData(station.to_string())),
            Behaviour::Unreachable => Err(unreachable(station)),
            Behaviour::Panic => panic!("streamflow source crashed on {station}"),
        }
    }
}

#[async_trait]
impl CatchmentSource for FakeSource {
    async fn fetch_catchment(&self, station: &str) -> Result<FeatureCollection, FetchError> {
        self.call().await;

        match self.behaviour(station) {
            Behaviour::Data => Ok(square_basin()),
            Behaviour::Empty => Ok(FeatureCollection {
                kind: "FeatureCollection".to_string(),
                features: Vec::new(),
            }),
            Behaviour::Missing => Err(FetchError::NotFound(station.to_string())),
            Behaviour::Unreachable => Err(unreachable(station)),
            Behaviour::Panic => panic!("catchment source crashed on {station}"),
        }
    }
}

fn square_basin() -> FeatureCollection {
    let ring = vec![
        vec![-77.2, 38.9],
        vec![-77.1, 38.9],
        vec![-77.1, 39.0],
        vec![-77.2, 39.0],
        vec![-77.2, 38.9],
    ];

    FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features: vec![Feature {
            kind: "Feature".to_string(),
            id: None,
            geometry: Some(Geometry::Polygon {
                coordinates: vec![ring],
            }),
            properties: None,
        }],
    }
}
