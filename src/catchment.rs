//! Save a station's basin as an ESRI shapefile bundle.
//!
//! The bundle is `USGS_<id>.shp` with its `.shx`, `.dbf` and `.prj`
//! siblings. Each basin feature becomes one polygon record carrying the
//! station number and its area in square kilometres.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Point, Polygon, PolygonRing, Writer,
};
use tempfile::TempDir;

use crate::geometry::{FeatureCollection, Geometry, Position, AREA_PROPERTY};

/// Files written for every catchment, by extension.
pub const BUNDLE_EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

const SITE_FIELD: &str = "site_no";

/// NLDI basins are served in WGS84 longitude/latitude.
const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// Writes the bundle next to `shp_path`, replacing any previous one.
///
/// All files are written into a staging folder first and only moved into
/// place once every one of them is complete, so a failed write leaves the
/// previous bundle untouched.
pub fn save_catchment(station: &str, basin: &FeatureCollection, shp_path: &Path) -> Result<()> {
    let dir = shp_path
        .parent()
        .ok_or_else(|| anyhow!("No parent folder for `{}`", shp_path.display()))?;
    let file_name = shp_path
        .file_name()
        .ok_or_else(|| anyhow!("No file name in `{}`", shp_path.display()))?;
    fs::create_dir_all(dir)?;

    let staging = TempDir::new_in(dir)?;
    let staged = staging.path().join(file_name);
    write_bundle(station, basin, &staged)?;

    for path in bundle_paths(&staged) {
        let target = shp_path.with_extension(extension(&path));
        fs::rename(&path, target)?;
    }

    Ok(())
}

/// Every file making up the bundle rooted at `shp_path`.
pub fn bundle_paths(shp_path: &Path) -> Vec<PathBuf> {
    BUNDLE_EXTENSIONS
        .iter()
        .map(|ext| shp_path.with_extension(ext))
        .collect()
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}

fn write_bundle(station: &str, basin: &FeatureCollection, shp_path: &Path) -> Result<()> {
    let table = TableWriterBuilder::new()
        .add_character_field(field_name(SITE_FIELD)?, 15)
        .add_numeric_field(field_name(AREA_PROPERTY)?, 18, 6);

    // The headers are finalised when the writer is dropped.
    {
        let mut writer = Writer::from_path(shp_path, table)?;
        let mut written = 0;

        for feature in &basin.features {
            let Some(polygon) = feature.geometry.as_ref().and_then(to_polygon) else {
                continue;
            };
            let area = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(AREA_PROPERTY))
                .and_then(Value::as_f64);

            let mut record = Record::default();
            record.insert(
                SITE_FIELD.to_string(),
                FieldValue::Character(Some(station.to_string())),
            );
            record.insert(AREA_PROPERTY.to_string(), FieldValue::Numeric(area));

            writer.write_shape_and_record(&polygon, &record)?;
            written += 1;
        }

        if written == 0 {
            bail!("basin for station {} has no polygon to write", station);
        }
    }

    fs::write(shp_path.with_extension("prj"), WGS84_PRJ)?;

    Ok(())
}

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|_| anyhow!("Invalid dBase field name `{}`", name))
}

// Multipolygons become a single record with several outer rings.
fn to_polygon(geometry: &Geometry) -> Option<Polygon> {
    let polygons: Vec<&Vec<Vec<Position>>> = match geometry {
        Geometry::Polygon { coordinates } => vec![coordinates],
        Geometry::MultiPolygon { coordinates } => coordinates.iter().collect(),
    };

    let mut rings = Vec::new();
    for polygon in polygons {
        for (i, ring) in polygon.iter().enumerate() {
            let points: Vec<Point> = ring
                .iter()
                .filter(|p| p.len() >= 2)
                .map(|p| Point::new(p[0], p[1]))
                .collect();
            if points.len() < 3 {
                continue;
            }
            rings.push(if i == 0 {
                PolygonRing::Outer(points)
            } else {
                PolygonRing::Inner(points)
            });
        }
    }

    if rings.is_empty() {
        None
    } else {
        Some(Polygon::with_rings(rings))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use serde_json::Map;

    use super::*;
    use crate::geometry::Feature;

    fn basin(coordinates: Vec<Vec<Position>>, area: f64) -> FeatureCollection {
        let mut properties = Map::new();
        properties.insert(AREA_PROPERTY.to_string(), Value::from(area));

        FeatureCollection {
            kind: "FeatureCollection".to_string(),
            features: vec![Feature {
                kind: "Feature".to_string(),
                id: None,
                geometry: Some(Geometry::Polygon { coordinates }),
                properties: Some(properties),
            }],
        }
    }

    fn square(lon: f64, lat: f64, size: f64) -> Vec<Position> {
        vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ]
    }

    fn read_area(shp_path: &Path) -> Option<f64> {
        let shapes = shapefile::read_as::<_, Polygon, Record>(shp_path).unwrap();
        assert_eq!(shapes.len(), 1);
        match shapes[0].1.get(AREA_PROPERTY) {
            Some(FieldValue::Numeric(area)) => *area,
            other => panic!("unexpected area field {other:?}"),
        }
    }

    #[test]
    fn should_write_complete_bundle() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catchments").join("USGS_01646500.shp");

        save_catchment("01646500", &basin(vec![square(-77.2, 38.9, 0.1)], 96.5), &path).unwrap();

        for file in bundle_paths(&path) {
            assert!(file.exists(), "missing {}", file.display());
        }
        let prj = fs::read_to_string(path.with_extension("prj")).unwrap();
        assert!(prj.starts_with("GEOGCS[\"GCS_WGS_1984\""));

        let area = read_area(&path).unwrap();
        assert!((area - 96.5).abs() < 1e-6);
    }

    #[test]
    fn should_keep_holes_as_inner_rings() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("USGS_A.shp");
        let rings = vec![square(-90.0, 35.0, 1.0), square(-89.75, 35.25, 0.5)];

        save_catchment("A", &basin(rings, 1.0), &path).unwrap();

        let shapes = shapefile::read_as::<_, Polygon, Record>(&path).unwrap();
        assert_eq!(shapes[0].0.rings().len(), 2);
        assert!(matches!(shapes[0].0.rings()[1], PolygonRing::Inner(_)));
    }

    #[test]
    fn should_replace_previous_bundle() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("USGS_A.shp");

        save_catchment("A", &basin(vec![square(-77.2, 38.9, 0.1)], 1.0), &path).unwrap();
        save_catchment("A", &basin(vec![square(-77.2, 38.9, 0.2)], 2.0), &path).unwrap();

        assert_eq!(read_area(&path), Some(2.0));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), BUNDLE_EXTENSIONS.len());
    }

    #[test]
    fn should_leave_previous_bundle_when_basin_has_no_polygon() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("USGS_A.shp");
        save_catchment("A", &basin(vec![square(-77.2, 38.9, 0.1)], 1.0), &path).unwrap();

        let degenerate = basin(vec![vec![vec![-77.0, 38.0], vec![-77.0, 38.0]]], 0.0);
        assert!(save_catchment("A", &degenerate, &path).is_err());

        assert_eq!(read_area(&path), Some(1.0));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), BUNDLE_EXTENSIONS.len());
    }
}
