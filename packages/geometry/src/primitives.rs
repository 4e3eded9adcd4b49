//! Polygon validation, ring-orientation normalization, geodesic area,
//! and geodesic point buffering.
//!
//! The area convention is orientation-independent: if the signed
//! geodesic computation comes back negative, the ring winding is
//! reversed and the area recomputed before the value is accepted. A
//! polygon whose recomputed area is still non-positive or non-finite
//! is rejected, never silently treated as zero.

use geo::{Coord, Destination, Geodesic, GeodesicArea, LineString, MultiPolygon, Point, Polygon};

use crate::GeometryError;

/// Vertex count of a generated catchment ring. High enough that the
/// inscribed-polygon area deficit against the true geodesic disk stays
/// below 0.05%.
pub const DEFAULT_CATCHMENT_SEGMENTS: usize = 128;

/// Normalizes a neighborhood boundary to a single measurable polygon.
///
/// Operates on the first part of the multipolygon (additional parts
/// and their holes are not part of the coverage math). The exterior
/// winding is corrected so the geodesic area comes out positive.
///
/// # Errors
///
/// Returns [`GeometryError::Malformed`] if the multipolygon is empty,
/// the outer ring has fewer than 3 distinct vertices or non-finite
/// coordinates, or the recomputed area is still non-positive.
pub fn normalize(geometry: &MultiPolygon<f64>) -> Result<Polygon<f64>, GeometryError> {
    let part = geometry
        .0
        .first()
        .ok_or_else(|| GeometryError::malformed("multipolygon has no parts"))?;

    validate_ring(part.exterior())?;
    for interior in part.interiors() {
        validate_ring(interior)?;
    }

    let signed = part.geodesic_area_signed();
    if signed.is_finite() && signed > 0.0 {
        return Ok(part.clone());
    }

    let reversed = reverse_winding(part);
    let area = reversed.geodesic_area_signed();
    if area.is_finite() && area > 0.0 {
        Ok(reversed)
    } else {
        Err(GeometryError::malformed(format!(
            "polygon area is not positive after winding correction ({area})"
        )))
    }
}

/// Orientation-independent geodesic area of a polygon, in square
/// meters.
///
/// # Errors
///
/// Returns [`GeometryError::Malformed`] if the area is non-positive or
/// non-finite under either winding.
pub fn area_m2(polygon: &Polygon<f64>) -> Result<f64, GeometryError> {
    let signed = polygon.geodesic_area_signed();
    let area = if signed < 0.0 {
        reverse_winding(polygon).geodesic_area_signed()
    } else {
        signed
    };
    if area.is_finite() && area > 0.0 {
        Ok(area)
    } else {
        Err(GeometryError::malformed(format!(
            "polygon area is not positive ({area})"
        )))
    }
}

/// Orientation-independent geodesic area of a multipolygon, in square
/// meters. Parts whose area cannot be measured contribute nothing.
#[must_use]
pub fn multi_area_m2(geometry: &MultiPolygon<f64>) -> f64 {
    geometry
        .0
        .iter()
        .filter_map(|part| area_m2(part).ok())
        .sum()
}

/// Builds a closed ring approximating the geodesic disk of `radius_m`
/// meters around a point, by walking `segments` destination points at
/// evenly spaced bearings.
///
/// # Errors
///
/// Returns [`GeometryError::Malformed`] for non-finite or out-of-range
/// coordinates, a non-positive radius, or fewer than 8 segments, and
/// [`GeometryError::DegenerateResult`] if the generated ring has no
/// measurable area (e.g. a radius collapsing at the poles).
pub fn geodesic_buffer(
    longitude: f64,
    latitude: f64,
    radius_m: f64,
    segments: usize,
) -> Result<Polygon<f64>, GeometryError> {
    if !longitude.is_finite() || !latitude.is_finite() {
        return Err(GeometryError::malformed("non-finite station coordinates"));
    }
    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return Err(GeometryError::malformed(format!(
            "station coordinates out of range ({longitude}, {latitude})"
        )));
    }
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(GeometryError::malformed(format!(
            "catchment radius must be positive ({radius_m})"
        )));
    }
    if segments < 8 {
        return Err(GeometryError::malformed(format!(
            "catchment ring needs at least 8 segments ({segments})"
        )));
    }

    let center = Point::new(longitude, latitude);
    #[allow(clippy::cast_precision_loss)]
    let step = 360.0 / segments as f64;

    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(segments + 1);
    for i in 0..segments {
        #[allow(clippy::cast_precision_loss)]
        let bearing = step * i as f64;
        let vertex = Geodesic.destination(center, bearing, radius_m);
        ring.push(Coord {
            x: vertex.x(),
            y: vertex.y(),
        });
    }
    ring.push(ring[0]);

    let catchment = Polygon::new(LineString::from(ring), Vec::new());
    match area_m2(&catchment) {
        Ok(_) => Ok(catchment),
        Err(_) => Err(GeometryError::degenerate(format!(
            "catchment ring at ({longitude}, {latitude}) has no measurable area"
        ))),
    }
}

/// Rejects rings with fewer than 3 distinct vertices or non-finite
/// coordinates.
fn validate_ring(ring: &LineString<f64>) -> Result<(), GeometryError> {
    // A closed triangle carries 4 coordinates.
    if ring.0.len() < 4 {
        return Err(GeometryError::malformed(format!(
            "ring has too few vertices ({})",
            ring.0.len()
        )));
    }
    if ring
        .0
        .iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(GeometryError::malformed("ring has non-finite coordinates"));
    }
    Ok(())
}

/// Returns the polygon with every ring's winding reversed.
fn reverse_winding(polygon: &Polygon<f64>) -> Polygon<f64> {
    let mut exterior = polygon.exterior().0.clone();
    exterior.reverse();
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| {
            let mut coords = ring.0.clone();
            coords.reverse();
            LineString::from(coords)
        })
        .collect();
    Polygon::new(LineString::from(exterior), interiors)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Approximate meters-per-degree at the given latitude.
    fn square_around(longitude: f64, latitude: f64, half_side_m: f64) -> Polygon<f64> {
        let dlat = half_side_m / 111_320.0;
        let dlon = half_side_m / (111_320.0 * latitude.to_radians().cos());
        Polygon::new(
            LineString::from(vec![
                (longitude - dlon, latitude - dlat),
                (longitude + dlon, latitude - dlat),
                (longitude + dlon, latitude + dlat),
                (longitude - dlon, latitude + dlat),
                (longitude - dlon, latitude - dlat),
            ]),
            Vec::new(),
        )
    }

    #[test]
    fn measures_one_square_kilometer() {
        let square = square_around(13.405, 52.52, 500.0);
        let area = area_m2(&square).unwrap();
        assert!((area - 1_000_000.0).abs() / 1_000_000.0 < 0.01, "area {area}");
    }

    #[test]
    fn area_is_winding_independent() {
        let square = square_around(13.405, 52.52, 500.0);
        let mut reversed_coords = square.exterior().0.clone();
        reversed_coords.reverse();
        let reversed = Polygon::new(LineString::from(reversed_coords), Vec::new());

        let a = area_m2(&square).unwrap();
        let b = area_m2(&reversed).unwrap();
        assert!((a - b).abs() < 1.0, "areas diverge: {a} vs {b}");
    }

    #[test]
    fn normalize_takes_first_part_and_fixes_winding() {
        let square = square_around(13.405, 52.52, 500.0);
        let mut reversed_coords = square.exterior().0.clone();
        reversed_coords.reverse();
        let reversed = Polygon::new(LineString::from(reversed_coords), Vec::new());

        let normalized = normalize(&MultiPolygon(vec![reversed])).unwrap();
        assert!(normalized.geodesic_area_signed() > 0.0);
    }

    #[test]
    fn rejects_empty_multipolygon() {
        let err = normalize(&MultiPolygon(Vec::new())).unwrap_err();
        assert!(matches!(err, GeometryError::Malformed { .. }));
    }

    #[test]
    fn rejects_ring_with_too_few_vertices() {
        let degenerate = Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]), Vec::new());
        let err = normalize(&MultiPolygon(vec![degenerate])).unwrap_err();
        assert!(matches!(err, GeometryError::Malformed { .. }));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let bad = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (f64::NAN, 1.0),
                (1.0, 0.0),
                (0.0, 0.0),
            ]),
            Vec::new(),
        );
        let err = normalize(&MultiPolygon(vec![bad])).unwrap_err();
        assert!(matches!(err, GeometryError::Malformed { .. }));
    }

    #[test]
    fn buffer_area_tracks_analytic_disk() {
        let catchment =
            geodesic_buffer(13.405, 52.52, 400.0, DEFAULT_CATCHMENT_SEGMENTS).unwrap();
        let area = area_m2(&catchment).unwrap();
        let analytic = std::f64::consts::PI * 400.0 * 400.0;
        assert!(
            (area - analytic).abs() / analytic < 0.005,
            "buffer area {area} vs analytic {analytic}"
        );
    }

    #[test]
    fn buffer_rejects_out_of_range_coordinates() {
        assert!(geodesic_buffer(200.0, 52.0, 400.0, 64).is_err());
        assert!(geodesic_buffer(13.0, 91.0, 400.0, 64).is_err());
    }

    #[test]
    fn buffer_rejects_non_positive_radius() {
        assert!(geodesic_buffer(13.405, 52.52, 0.0, 64).is_err());
        assert!(geodesic_buffer(13.405, 52.52, -50.0, 64).is_err());
    }

    #[test]
    fn buffer_survives_polar_station() {
        // Urban-scale radii near the pole are out of the operating
        // domain, but must not crash.
        let result = geodesic_buffer(0.0, 89.999, 400.0, 64);
        assert!(result.is_ok() || result.is_err());
    }
}
