// Great-circle geometry for containment checks.

/// Mean Earth radius in meters, used for all great-circle math.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl Coordinate {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }
}

/// Haversine great-circle distance between two coordinates in meters.
///
/// Symmetric in its arguments and zero when both coordinates are equal.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat_deg.to_radians();
    let lat_b = b.lat_deg.to_radians();
    let d_lat = (b.lat_deg - a.lat_deg).to_radians();
    let d_lon = (b.lon_deg - a.lon_deg).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp guards against rounding pushing the argument above 1.0 for
    // near-antipodal pairs.
    2.0 * EARTH_RADIUS_M * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Point-in-circle containment test. The boundary counts as inside.
pub fn is_inside(point: Coordinate, center: Coordinate, radius_m: f64) -> bool {
    distance_meters(point, center) <= radius_m
}

#[cfg(test)]
mod tests {
    use super::*;

    // ~111.19 m per 0.001 degree of latitude at the chosen Earth radius.
    const METERS_PER_MILLIDEGREE_LAT: f64 = 111.194_926_644_558_74;

    #[test]
    fn when_coordinates_are_equal_then_distance_is_zero() {
        let p = Coordinate::new(52.52, 13.405);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn when_arguments_are_swapped_then_distance_is_symmetric() {
        let a = Coordinate::new(52.52, 13.405);
        let b = Coordinate::new(48.8566, 2.3522);
        let forward = distance_meters(a, b);
        let backward = distance_meters(b, a);
        assert!((forward - backward).abs() < 1e-6);
    }

    #[test]
    fn when_moving_one_millidegree_north_then_distance_matches_arc_length() {
        let a = Coordinate::new(50.0, 10.0);
        let b = Coordinate::new(50.001, 10.0);
        let d = distance_meters(a, b);
        assert!((d - METERS_PER_MILLIDEGREE_LAT).abs() < 0.01, "got {d}");
    }

    #[test]
    fn when_point_is_exactly_on_the_boundary_then_it_is_inside() {
        let center = Coordinate::new(50.0, 10.0);
        let point = Coordinate::new(50.001, 10.0);
        let radius = distance_meters(point, center);
        assert!(is_inside(point, center, radius));
    }

    #[test]
    fn when_point_is_just_past_the_boundary_then_it_is_outside() {
        let center = Coordinate::new(50.0, 10.0);
        let point = Coordinate::new(50.001, 10.0);
        let radius = distance_meters(point, center) - 0.01;
        assert!(!is_inside(point, center, radius));
    }

    #[test]
    fn when_radius_is_zero_then_only_the_center_is_inside() {
        let center = Coordinate::new(50.0, 10.0);
        assert!(is_inside(center, center, 0.0));
        assert!(!is_inside(Coordinate::new(50.000_1, 10.0), center, 0.0));
    }
}
