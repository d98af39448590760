//! Save a station's daily values to a parquet file.

use std::{io::Write, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{Date32Builder, Float64Builder, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{nwis::DailyValue, output::write_atomic};

pub fn save_streamflow(values: &[DailyValue], file_path: &Path) -> Result<()> {
    write_atomic(file_path, |file| write_streamflow(values, file))
}

pub fn write_streamflow<W: Write + Send>(values: &[DailyValue], sink: W) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("site_no", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("series", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
        Field::new("qualifier", DataType::Utf8, true),
    ]));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::ZSTD(parquet::basic::ZstdLevel::default()))
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(sink, schema.clone(), Some(props))?;

    let rows = values.len();
    let mut site_builder = StringBuilder::with_capacity(rows, rows * 15);
    let mut date_builder = Date32Builder::with_capacity(rows);
    let mut series_builder = StringBuilder::with_capacity(rows, rows * 18);
    let mut value_builder = Float64Builder::with_capacity(rows);
    let mut qualifier_builder = StringBuilder::with_capacity(rows, rows * 2);

    let epoch_offset = epoch_offset();

    for v in values {
        site_builder.append_value(&v.site_no);
        date_builder.append_value(v.date.num_days_from_ce() - epoch_offset);
        series_builder.append_value(&v.series);
        value_builder.append_option(v.value);
        qualifier_builder.append_option(v.qualifier.as_deref());
    }

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(site_builder.finish()),
            Arc::new(date_builder.finish()),
            Arc::new(series_builder.finish()),
            Arc::new(value_builder.finish()),
            Arc::new(qualifier_builder.finish()),
        ],
    )?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn epoch_offset() -> i32 {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .map(|d| d.num_days_from_ce())
        .unwrap_or(719_163)
}

// -- Tests -------------------------------------------------------------------
