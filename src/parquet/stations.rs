//! Save a state's station list to a parquet file.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{nwis::Site, output::write_atomic};

pub fn save_stations(sites: &[Site], file_path: &Path) -> Result<()> {
    let num_rows = sites.len();

    let mut site_nos = Vec::with_capacity(num_rows);
    let mut names = Vec::with_capacity(num_rows);
    let mut datums = Vec::with_capacity(num_rows);
    let mut latitudes = Vec::with_capacity(num_rows);
    let mut longitudes = Vec::with_capacity(num_rows);
    let mut lats_wgs84 = Vec::with_capacity(num_rows);
    let mut lons_wgs84 = Vec::with_capacity(num_rows);

    for s in sites {
        site_nos.push(s.site_no.clone());
        names.push(s.name.clone());
        datums.push(s.datum.clone());
        latitudes.push(s.latitude);
        longitudes.push(s.longitude);
        lats_wgs84.push(s.lat_wgs84);
        lons_wgs84.push(s.lon_wgs84);
    }

    let columns: Vec<(&str, ArrayRef)> = vec![
        ("site_no", Arc::new(StringArray::from(site_nos))),
        ("station_nm", Arc::new(StringArray::from(names))),
        ("coord_datum_cd", Arc::new(StringArray::from(datums))),
        ("latitude", Arc::new(Float64Array::from(latitudes))),
        ("longitude", Arc::new(Float64Array::from(longitudes))),
        ("lat_wgs84", Arc::new(Float64Array::from(lats_wgs84))),
        ("lon_wgs84", Arc::new(Float64Array::from(lons_wgs84))),
    ];

    let batch = RecordBatch::try_from_iter(columns)?;

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    write_atomic(file_path, |file| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    })
}

// -- Tests -------------------------------------------------------------------
