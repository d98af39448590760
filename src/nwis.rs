//! Client for the USGS National Water Information System (NWIS) services.
//!
//! Daily values come from the `dv` service and site lists from the `site`
//! service, both requested in RDB format.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::debug;

use crate::{
    datum,
    download::{get_text, RetryPolicy},
    error::FetchError,
    fetcher::StreamflowSource,
    job::{DateSelection, DISCHARGE},
    rdb::RdbTable,
};

/// Earliest start date accepted by the daily values service; used for "all data".
pub const FULL_HISTORY_START: &str = "1851-01-01";

/// Horizontal datums whose coordinates are kept in station lists.
pub const KNOWN_DATUMS: [&str; 3] = ["NAD83", "NAD27", "WGS84"];

/// One daily statistic for one day at one site.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyValue {
    pub site_no: String,
    pub date: NaiveDate,
    /// RDB column name, `<ts_id>_<parameter>_<statistic>`.
    pub series: String,
    pub value: Option<f64>,
    pub qualifier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Site {
    pub site_no: String,
    pub name: String,
    pub datum: String,
    /// Coordinates as reported, in `datum`.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub lat_wgs84: Option<f64>,
    pub lon_wgs84: Option<f64>,
}

pub struct NwisClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl NwisClient {
    pub fn new(client: Client, base_url: &str, retry: RetryPolicy) -> Self {
        NwisClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub async fn daily_values(
        &self,
        station: &str,
        parameter_code: &str,
        dates: &DateSelection,
    ) -> Result<Vec<DailyValue>, FetchError> {
        let url = format!("{}/dv/", self.base_url);
        let query = daily_values_query(station, parameter_code, dates);

        let body = get_text(&self.client, &url, &query, self.retry).await?;
        let table = match body {
            Some(text) => RdbTable::parse(&text),
            None => return Err(FetchError::NoData(station.to_string())),
        };

        let values = daily_values_from_table(&table, parameter_code)?;
        debug!(station, rows = values.len(), "Daily values received");
        if values.is_empty() {
            return Err(FetchError::NoData(station.to_string()));
        }

        Ok(values)
    }

    /// Stream gages in a state that report daily discharge.
    pub async fn sites(&self, state_cd: &str) -> Result<Vec<Site>, FetchError> {
        let url = format!("{}/site/", self.base_url);
        let query = [
            ("format", "rdb".to_string()),
            ("stateCd", state_cd.to_lowercase()),
            ("parameterCd", DISCHARGE.to_string()),
            ("hasDataTypeCd", "dv".to_string()),
            ("siteOutput", "expanded".to_string()),
        ];

        let table = match get_text(&self.client, &url, &query, self.retry).await? {
            Some(text) => RdbTable::parse(&text),
            None => return Ok(Vec::new()),
        };
        if table.is_empty() {
            return Ok(Vec::new());
        }

        Ok(sites_from_table(&table))
    }
}

#[async_trait]
impl StreamflowSource for NwisClient {
    async fn fetch_timeseries(
        &self,
        station: &str,
        parameter_code: &str,
        dates: &DateSelection,
    ) -> Result<Vec<DailyValue>, FetchError> {
        self.daily_values(station, parameter_code, dates).await
    }
}

fn daily_values_query(
    station: &str,
    parameter_code: &str,
    dates: &DateSelection,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("format", "rdb".to_string()),
        ("sites", station.to_string()),
        ("parameterCd", parameter_code.to_string()),
    ];

    match dates {
        DateSelection::All => query.push(("startDT", FULL_HISTORY_START.to_string())),
        DateSelection::Range { start, end } => {
            query.push(("startDT", start.format("%Y-%m-%d").to_string()));
            query.push(("endDT", end.format("%Y-%m-%d").to_string()));
        }
    }

    query
}

/// Flattens a daily values table into one record per (day, series).
pub fn daily_values_from_table(
    table: &RdbTable,
    parameter_code: &str,
) -> Result<Vec<DailyValue>, FetchError> {
    let series: Vec<(usize, Option<usize>)> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| is_value_column(name, parameter_code))
        .map(|(i, name)| (i, table.column(&format!("{name}_cd"))))
        .collect();

    let mut values = Vec::with_capacity(table.rows.len() * series.len());
    for row in &table.rows {
        let site_no = table.get(row, "site_no").unwrap_or_default();
        let date = match table.get(row, "datetime") {
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| FetchError::Malformed(format!("bad date `{d}`")))?,
            None => return Err(FetchError::Malformed("row without datetime".to_string())),
        };

        for &(value_col, qualifier_col) in &series {
            values.push(DailyValue {
                site_no: site_no.to_string(),
                date,
                series: table.columns[value_col].clone(),
                value: row[value_col].parse::<f64>().ok(),
                qualifier: qualifier_col
                    .map(|i| row[i].clone())
                    .filter(|q| !q.is_empty()),
            });
        }
    }

    Ok(values)
}

// Value columns look like `149407_00060_00003`.
fn is_value_column(name: &str, parameter_code: &str) -> bool {
    let parts: Vec<&str> = name.split('_').collect();
    parts.len() == 3 && parts[1] == parameter_code && parts[2].chars().all(|c| c.is_ascii_digit())
}

pub fn sites_from_table(table: &RdbTable) -> Vec<Site> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let datum = table
                .get(row, "dec_coord_datum_cd")
                .or_else(|| table.get(row, "coord_datum_cd"))?;
            if !KNOWN_DATUMS.contains(&datum) {
                return None;
            }

            let latitude = table.get(row, "dec_lat_va").and_then(|v| v.parse().ok());
            let longitude = table.get(row, "dec_long_va").and_then(|v| v.parse().ok());
            let wgs84 = latitude
                .zip(longitude)
                .and_then(|(lat, lon)| datum::to_wgs84(datum, lat, lon));

            Some(Site {
                site_no: table.get(row, "site_no")?.to_string(),
                name: table.get(row, "station_nm").unwrap_or_default().to_string(),
                datum: datum.to_string(),
                latitude,
                longitude,
                lat_wgs84: wgs84.map(|(lat, _)| lat),
                lon_wgs84: wgs84.map(|(_, lon)| lon),
            })
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const DV: &str = "#\n\
agency_cd\tsite_no\tdatetime\t149407_00060_00003\t149407_00060_00003_cd\t149408_00060_00001\t149408_00060_00001_cd\n\
5s\t15s\t20d\t14n\t10s\t14n\t10s\n\
USGS\t01646500\t2024-01-01\t12100\tA\t13000\tA\n\
USGS\t01646500\t2024-01-02\tIce\tP\t\t\n";

    #[test]
    fn should_flatten_daily_values() {
        let table = RdbTable::parse(DV);
        let values = daily_values_from_table(&table, "00060").unwrap();

        assert_eq!(values.len(), 4);
        assert_eq!(values[0].site_no, "01646500");
        assert_eq!(values[0].series, "149407_00060_00003");
        assert_eq!(values[0].value, Some(12100.0));
        assert_eq!(values[0].qualifier, Some("A".to_string()));
        assert_eq!(values[1].series, "149408_00060_00001");
        assert_eq!(values[2].value, None);
        assert_eq!(values[3].qualifier, None);
    }

    #[test]
    fn should_ignore_other_parameters() {
        let table = RdbTable::parse(DV);
        let values = daily_values_from_table(&table, "00065").unwrap();

        assert!(values.is_empty());
    }

    #[test]
    fn should_reject_bad_dates() {
        let table = RdbTable::parse("site_no\tdatetime\t1_00060_00003\n5s\t20d\t14n\nx\tyesterday\t1\n");

        assert!(matches!(
            daily_values_from_table(&table, "00060"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn should_query_full_history_for_all_data() {
        let query = daily_values_query("01646500", "00060", &DateSelection::All);

        assert!(query.contains(&("startDT", FULL_HISTORY_START.to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "endDT"));
    }

    #[test]
    fn should_query_explicit_range() {
        let dates = DateSelection::Range {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        };
        let query = daily_values_query("01646500", "00065", &dates);

        assert!(query.contains(&("parameterCd", "00065".to_string())));
        assert!(query.contains(&("startDT", "2020-01-01".to_string())));
        assert!(query.contains(&("endDT", "2020-02-01".to_string())));
    }

    #[test]
    fn should_keep_sites_with_known_datums() {
        let text = "site_no\tstation_nm\tdec_lat_va\tdec_long_va\tdec_coord_datum_cd\n\
5s\t50s\t16s\t16s\t10s\n\
01646500\tPOTOMAC RIVER NEAR WASH, DC\t38.94977778\t-77.12763889\tNAD83\n\
01000000\tSOMEWHERE\t1.0\t2.0\tOLDHI\n\
01000001\tNO COORDS\t\t\tNAD27\n";
        let sites = sites_from_table(&RdbTable::parse(text));

        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].site_no, "01646500");
        assert_eq!(sites[0].latitude, Some(38.94977778));
        assert_eq!(sites[0].lat_wgs84, sites[0].latitude);
        assert_eq!(sites[1].datum, "NAD27");
        assert_eq!(sites[1].latitude, None);
        assert_eq!(sites[1].lat_wgs84, None);
    }

    #[test]
    fn should_convert_nad27_sites_to_wgs84() {
        let text = "site_no\tstation_nm\tdec_lat_va\tdec_long_va\tdec_coord_datum_cd\n\
5s\t50s\t16s\t16s\t10s\n\
01646500\tPOTOMAC RIVER NEAR WASH, DC\t38.94977778\t-77.12763889\tNAD27\n";
        let sites = sites_from_table(&RdbTable::parse(text));

        let site = &sites[0];
        assert_eq!(site.latitude, Some(38.94977778));
        let lat = site.lat_wgs84.unwrap();
        let lon = site.lon_wgs84.unwrap();
        assert!((lat - 38.949_808_577).abs() < 1e-7, "lat = {lat}");
        assert!((lon - -77.127_317_678).abs() < 1e-7, "lon = {lon}");
    }
}
