//! GeoJSON basin geometry and equal-area measurement.
//!
//! Areas are measured in the NAD83 / CONUS Albers projection (EPSG:5070),
//! the ellipsoidal Albers equal-area conic from Snyder, "Map Projections: A
//! Working Manual" (USGS Professional Paper 1395), equations 14-3 to 14-7.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property written on every catchment feature.
pub const AREA_PROPERTY: &str = "areasqkm";

/// Segments are split so no projected edge spans more than this many degrees.
const MAX_SEGMENT_DEG: f64 = 0.05;

pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    /// Area in square metres.
    pub fn area(&self, projection: &AlbersEqualArea) -> f64 {
        match self {
            Geometry::Polygon { coordinates } => polygon_area(coordinates, projection),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|polygon| polygon_area(polygon, projection))
                .sum(),
        }
    }
}

impl FeatureCollection {
    pub fn is_empty(&self) -> bool {
        self.features.iter().all(|f| f.geometry.is_none())
    }

    /// Stores each feature's own area under [`AREA_PROPERTY`] and returns the total.
    pub fn annotate_area(&mut self, projection: &AlbersEqualArea) -> f64 {
        let mut total = 0.0;
        for feature in &mut self.features {
            let km2 = feature
                .geometry
                .as_ref()
                .map(|g| g.area(projection) / 1_000_000.0)
                .unwrap_or(0.0);
            feature
                .properties
                .get_or_insert_with(Map::new)
                .insert(AREA_PROPERTY.to_string(), Value::from(km2));
            total += km2;
        }
        total
    }
}

/// Ellipsoidal Albers equal-area conic projection.
#[derive(Debug, Clone, Copy)]
pub struct AlbersEqualArea {
    a: f64,
    e: f64,
    n: f64,
    c: f64,
    rho0: f64,
    lon0: f64,
}

impl AlbersEqualArea {
    /// NAD83 / Conus Albers (EPSG:5070) on the GRS80 ellipsoid.
    pub fn conus() -> Self {
        AlbersEqualArea::new(6_378_137.0, 298.257_222_101, 23.0, -96.0, 29.5, 45.5)
    }

    pub fn new(a: f64, inv_f: f64, lat0: f64, lon0: f64, lat1: f64, lat2: f64) -> Self {
        let f = 1.0 / inv_f;
        let e = (2.0 * f - f * f).sqrt();

        let (phi0, phi1, phi2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());
        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let q0 = q(phi0, e);
        let q1 = q(phi1, e);
        let q2 = q(phi2, e);

        let n = (m1 * m1 - m2 * m2) / (q2 - q1);
        let c = m1 * m1 + n * q1;
        let rho0 = a * (c - n * q0).sqrt() / n;

        AlbersEqualArea {
            a,
            e,
            n,
            c,
            rho0,
            lon0: lon0.to_radians(),
        }
    }

    /// Projects longitude/latitude degrees to easting/northing metres.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let q = q(lat.to_radians(), self.e);
        let rho = self.a * (self.c - self.n * q).max(0.0).sqrt() / self.n;
        let theta = self.n * (lon.to_radians() - self.lon0);

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }
}

fn m(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e * e * s * s).sqrt()
}

fn q(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    let es = e * s;
    (1.0 - e * e) * (s / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

// Outer ring minus holes.
fn polygon_area(rings: &[Vec<Position>], projection: &AlbersEqualArea) -> f64 {
    let mut rings = rings.iter().map(|ring| ring_area(ring, projection));
    let outer = rings.next().unwrap_or(0.0);
    let holes: f64 = rings.sum();

    (outer - holes).max(0.0)
}

// Unsigned shoelace area of a densified, projected ring.
fn ring_area(ring: &[Position], projection: &AlbersEqualArea) -> f64 {
    let points: Vec<(f64, f64)> = ring
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect();
    if points.len() < 3 {
        return 0.0;
    }

    let mut projected = Vec::with_capacity(points.len() * 2);
    for (i, &(lon0, lat0)) in points.iter().enumerate() {
        let (lon1, lat1) = points[(i + 1) % points.len()];
        let span = (lon1 - lon0).abs().max((lat1 - lat0).abs());
        let steps = (span / MAX_SEGMENT_DEG).ceil().max(1.0) as usize;
        for step in 0..steps {
            let t = step as f64 / steps as f64;
            projected.push(projection.project(lon0 + (lon1 - lon0) * t, lat0 + (lat1 - lat0) * t));
        }
    }

    let twice_area: f64 = projected
        .iter()
        .zip(projected.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 * y1 - x1 * y0)
        .sum();

    twice_area.abs() / 2.0
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn square(lon: f64, lat: f64, size: f64) -> Vec<Position> {
        vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ]
    }

    #[test]
    fn should_project_origin_to_zero() {
        let p = AlbersEqualArea::conus();
        let (x, y) = p.project(-96.0, 23.0);

        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn should_match_known_epsg_5070_coordinate() {
        // Washington, DC
        let p = AlbersEqualArea::conus();
        let (x, y) = p.project(-77.0365, 38.8977);

        assert!((x - 1_618_600.05).abs() < 1.0, "x = {x}");
        assert!((y - 1_925_474.64).abs() < 1.0, "y = {y}");
    }

    #[test]
    fn should_measure_one_degree_cell() {
        let p = AlbersEqualArea::conus();
        let cell = Geometry::Polygon {
            coordinates: vec![square(-100.0, 40.0, 1.0)],
        };

        let km2 = cell.area(&p) / 1_000_000.0;

        assert!((km2 - 9_414.0).abs() < 94.0, "area = {km2}");
    }

    #[test]
    fn should_ignore_ring_orientation() {
        let p = AlbersEqualArea::conus();
        let ring = square(-90.0, 35.0, 0.5);
        let mut reversed = ring.clone();
        reversed.reverse();

        let a = ring_area(&ring, &p);
        let b = ring_area(&reversed, &p);

        assert!((a - b).abs() < 1e-6 * a);
    }

    #[test]
    fn should_subtract_holes() {
        let p = AlbersEqualArea::conus();
        let outer = square(-90.0, 35.0, 1.0);
        let hole = square(-89.75, 35.25, 0.5);
        let full = polygon_area(&[outer.clone()], &p);
        let holed = polygon_area(&[outer, hole.clone()], &p);

        assert!((full - holed - ring_area(&hole, &p)).abs() < 1.0);
    }

    #[test]
    fn should_annotate_features_from_nldi_geojson() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-100.0, 40.0], [-99.0, 40.0], [-99.0, 41.0], [-100.0, 41.0], [-100.0, 40.0]]]]
                },
                "properties": null
            }]
        }"#;
        let mut collection: FeatureCollection = serde_json::from_str(json).unwrap();
        let p = AlbersEqualArea::conus();

        let total = collection.annotate_area(&p);

        let stored = collection.features[0].properties.as_ref().unwrap()[AREA_PROPERTY]
            .as_f64()
            .unwrap();
        assert_eq!(stored, total);
        assert!((total - 9_414.0).abs() < 94.0, "area = {total}");
        assert!(!collection.is_empty());
    }

    #[test]
    fn should_treat_collection_without_geometry_as_empty() {
        let collection: FeatureCollection =
            serde_json::from_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();

        assert!(collection.is_empty());
    }
}
