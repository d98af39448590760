//! Output folders and file naming.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;

pub const STATION_LIST_DIR: &str = "stations";
pub const STREAMFLOW_DIR: &str = "streamflows";
pub const CATCHMENT_DIR: &str = "catchments";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OutputLayout { root: root.into() }
    }

    pub fn stations_dir(&self) -> PathBuf {
        self.root.join(STATION_LIST_DIR)
    }

    pub fn streamflow_dir(&self) -> PathBuf {
        self.root.join(STREAMFLOW_DIR)
    }

    pub fn catchment_dir(&self) -> PathBuf {
        self.root.join(CATCHMENT_DIR)
    }

    pub fn streamflow_path(&self, station: &str) -> PathBuf {
        self.streamflow_dir().join(format!("{station}.parquet"))
    }

    pub fn catchment_path(&self, station: &str) -> PathBuf {
        self.catchment_dir().join(format!("USGS_{station}.shp"))
    }

    pub fn station_ids_path(&self) -> PathBuf {
        self.stations_dir().join("stations.txt")
    }

    pub fn station_table_path(&self, state_cd: &str) -> PathBuf {
        self.stations_dir()
            .join(format!("{}_stations.parquet", state_cd.to_uppercase()))
    }
}

/// Writes a file through a temporary sibling and renames it into place, so a
/// rerun replaces the previous artifact and a failed write leaves nothing.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("No parent folder for `{}`", path.display()))?;
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.persist(path)?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
