//! Handles serialising and saving tables to disk in the _parquet_ file format.

pub mod stations;
pub mod streamflow;

pub use stations::save_stations;
pub use streamflow::save_streamflow;
