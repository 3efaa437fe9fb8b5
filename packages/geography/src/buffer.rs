//! Buffer circles around site points.

use geo::{LineString, Point, Polygon};

/// Mean Earth radius in miles.
const EARTH_RADIUS_MI: f64 = 3958.8;

/// Vertices used to approximate a buffer circle.
pub const CIRCLE_VERTICES: usize = 64;

/// Returns the point reached by travelling `distance_mi` from
/// (`lat`, `lon`) along initial bearing `bearing_deg` on a sphere.
fn destination(lat: f64, lon: f64, bearing_deg: f64, distance_mi: f64) -> Point<f64> {
    let delta = distance_mi / EARTH_RADIUS_MI;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    // wrap to [-180, 180)
    let lon2 = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    Point::new(lon2, phi2.to_degrees())
}

/// Approximates the circle of radius `radius_mi` around a site as a
/// closed polygon.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn circle(lat: f64, lon: f64, radius_mi: f64) -> Polygon<f64> {
    let mut ring: Vec<geo::Coord<f64>> = (0..CIRCLE_VERTICES)
        .map(|i| {
            let bearing = 360.0 * i as f64 / CIRCLE_VERTICES as f64;
            destination(lat, lon, bearing, radius_mi).into()
        })
        .collect();
    ring.push(ring[0]);

    Polygon::new(LineString::new(ring), Vec::new())
}

/// Map geometry for a site: the buffer circle, or the bare point when the
/// radius is zero.
#[must_use]
pub fn site_geometry(lat: f64, lon: f64, radius_mi: f64) -> geojson::Geometry {
    if radius_mi > 0.0 {
        geojson::Geometry::new(geojson::Value::from(&circle(lat, lon, radius_mi)))
    } else {
        geojson::Geometry::new(geojson::Value::from(&Point::new(lon, lat)))
    }
}
