//! Horizontal datum shifts to WGS84 for gage coordinates.
//!
//! NAD27 positions are moved with the abridged Molodensky transform using
//! the continental US parameters (Clarke 1866, dX = -8 m, dY = 160 m,
//! dZ = 176 m), good to a few metres. NAD83 and WGS84 are taken as equal.

/// Clarke 1866 semi-major axis and flattening.
const CLARKE_1866_A: f64 = 6_378_206.4;
const CLARKE_1866_F: f64 = 1.0 / 294.978_698_2;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Geocentric translation NAD27 (CONUS) -> WGS84 in metres.
const NAD27_SHIFT: (f64, f64, f64) = (-8.0, 160.0, 176.0);

/// Converts a latitude/longitude in `datum` to WGS84 degrees.
///
/// Returns `None` for datums that cannot be converted.
pub fn to_wgs84(datum: &str, lat: f64, lon: f64) -> Option<(f64, f64)> {
    match datum {
        "WGS84" | "NAD83" => Some((lat, lon)),
        "NAD27" => Some(molodensky(lat, lon, CLARKE_1866_A, CLARKE_1866_F, NAD27_SHIFT)),
        _ => None,
    }
}

fn molodensky(lat: f64, lon: f64, a: f64, f: f64, (dx, dy, dz): (f64, f64, f64)) -> (f64, f64) {
    let da = WGS84_A - a;
    let df = WGS84_F - f;
    let e2 = 2.0 * f - f * f;

    let (phi, lambda) = (lat.to_radians(), lon.to_radians());
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_lambda, cos_lambda) = lambda.sin_cos();

    let w = 1.0 - e2 * sin_phi * sin_phi;
    let m = a * (1.0 - e2) / w.powf(1.5);
    let n = a / w.sqrt();

    let d_phi = (-dx * sin_phi * cos_lambda - dy * sin_phi * sin_lambda
        + dz * cos_phi
        + (a * df + f * da) * (2.0 * phi).sin())
        / m;
    let d_lambda = (-dx * sin_lambda + dy * cos_lambda) / (n * cos_phi);

    (lat + d_phi.to_degrees(), lon + d_lambda.to_degrees())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_leave_nad83_and_wgs84_unchanged() {
        assert_eq!(to_wgs84("NAD83", 38.95, -77.13), Some((38.95, -77.13)));
        assert_eq!(to_wgs84("WGS84", 38.95, -77.13), Some((38.95, -77.13)));
    }

    #[test]
    fn should_shift_nad27_coordinates() {
        // Little Falls gage on the Potomac
        let (lat, lon) = to_wgs84("NAD27", 38.949_777_78, -77.127_638_89).unwrap();

        assert!((lat - 38.949_808_577).abs() < 1e-7, "lat = {lat}");
        assert!((lon - -77.127_317_678).abs() < 1e-7, "lon = {lon}");
    }

    #[test]
    fn should_move_nad27_by_tens_of_metres() {
        let (lat, lon) = to_wgs84("NAD27", 40.0, -100.0).unwrap();

        let north_m = (lat - 40.0) * 111_000.0;
        let east_m = (lon + 100.0) * 111_000.0 * 40f64.to_radians().cos();
        let moved = (north_m * north_m + east_m * east_m).sqrt();
        assert!(moved > 10.0 && moved < 200.0, "moved {moved} m");
    }

    #[test]
    fn should_refuse_unknown_datums() {
        assert_eq!(to_wgs84("OLDHI", 21.3, -157.8), None);
    }
}
