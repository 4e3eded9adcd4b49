#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Normalizes station and neighborhood `GeoJSON` feature layers into
//! typed records.
//!
//! Consumes the already-normalized layers the data-access collaborator
//! persists (`id`/`name`/`bufferRadius`/`type` on stations,
//! `id`/`name`/`population`/`admin_level` on neighborhoods); fuzzy
//! OSM property fallbacks are an import-side concern and not handled
//! here. Features missing an identifier or a usable geometry are
//! skipped with a warning rather than failing the whole layer.

use cityreach_coverage_models::{
    AdminLevel, DEFAULT_CATCHMENT_RADIUS_M, Neighborhood, Station, StationCategory,
};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson};
use thiserror::Error;

/// Errors that can occur while loading a feature layer.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The payload is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    /// The payload parsed but is not a `FeatureCollection`.
    #[error("Expected a FeatureCollection, got {found}")]
    NotACollection {
        /// `GeoJSON` value kind that was found instead.
        found: &'static str,
    },

    /// No feature in the collection could be normalized.
    #[error("Layer contains no usable {layer} features")]
    Empty {
        /// Which layer was being parsed.
        layer: &'static str,
    },
}

/// Parses a `GeoJSON` string into a `FeatureCollection`.
///
/// # Errors
///
/// Returns [`LayerError::Geojson`] for malformed input and
/// [`LayerError::NotACollection`] for a bare feature or geometry.
pub fn parse_collection(payload: &str) -> Result<FeatureCollection, LayerError> {
    match payload.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(LayerError::NotACollection { found: "Feature" }),
        GeoJson::Geometry(_) => Err(LayerError::NotACollection { found: "Geometry" }),
    }
}

/// Normalizes a stations layer into [`Station`] records.
///
/// Point features only; the catchment radius comes from the
/// `bufferRadius` property (clamped to the supported range, default
/// 400 m) and the category from `type` (default bus).
///
/// # Errors
///
/// Returns [`LayerError::Empty`] if no feature could be normalized.
pub fn parse_stations(
    collection: &FeatureCollection,
    dataset: &str,
) -> Result<Vec<Station>, LayerError> {
    let stations: Vec<Station> = collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| normalize_station(feature, index, dataset))
        .collect();

    if stations.is_empty() {
        return Err(LayerError::Empty { layer: "station" });
    }
    log::info!(
        "Normalized {} of {} station features",
        stations.len(),
        collection.features.len()
    );
    Ok(stations)
}

/// Normalizes a neighborhoods layer into [`Neighborhood`] records.
///
/// Accepts `Polygon` and `MultiPolygon` geometries. Population
/// defaults to 0 and `admin_level` to none when absent.
///
/// # Errors
///
/// Returns [`LayerError::Empty`] if no feature could be normalized.
pub fn parse_neighborhoods(
    collection: &FeatureCollection,
    dataset: &str,
) -> Result<Vec<Neighborhood>, LayerError> {
    let neighborhoods: Vec<Neighborhood> = collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| normalize_neighborhood(feature, index, dataset))
        .collect();

    if neighborhoods.is_empty() {
        return Err(LayerError::Empty {
            layer: "neighborhood",
        });
    }
    log::info!(
        "Normalized {} of {} neighborhood features",
        neighborhoods.len(),
        collection.features.len()
    );
    Ok(neighborhoods)
}

fn normalize_station(feature: &Feature, index: usize, dataset: &str) -> Option<Station> {
    let id = feature_id(feature, index);
    let Some(geometry) = feature.geometry.as_ref() else {
        log::warn!("Station feature {id} has no geometry; skipped");
        return None;
    };
    let geo_geometry: geo::Geometry<f64> = match geometry.clone().try_into() {
        Ok(converted) => converted,
        Err(err) => {
            log::warn!("Station feature {id} has an unconvertible geometry ({err}); skipped");
            return None;
        }
    };
    let geo::Geometry::Point(point) = geo_geometry else {
        log::warn!("Station feature {id} is not a Point; skipped");
        return None;
    };

    let name = string_property(feature, "name").unwrap_or_else(|| id.clone());
    let radius = number_property(feature, "bufferRadius").unwrap_or(DEFAULT_CATCHMENT_RADIUS_M);
    let category = string_property(feature, "type")
        .and_then(|raw| raw.parse::<StationCategory>().ok())
        .unwrap_or_default();

    Some(Station::new(
        id,
        name,
        point.x(),
        point.y(),
        radius,
        category,
        dataset,
    ))
}

fn normalize_neighborhood(feature: &Feature, index: usize, dataset: &str) -> Option<Neighborhood> {
    let id = feature_id(feature, index);
    let Some(geometry) = feature.geometry.as_ref() else {
        log::warn!("Neighborhood feature {id} has no geometry; skipped");
        return None;
    };
    let geo_geometry: geo::Geometry<f64> = match geometry.clone().try_into() {
        Ok(converted) => converted,
        Err(err) => {
            log::warn!("Neighborhood feature {id} has an unconvertible geometry ({err}); skipped");
            return None;
        }
    };
    let geometry = match geo_geometry {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        _ => {
            log::warn!("Neighborhood feature {id} is not a (Multi)Polygon; skipped");
            return None;
        }
    };

    let name = string_property(feature, "name").unwrap_or_else(|| id.clone());
    let population = number_property(feature, "population")
        .filter(|p| p.is_finite() && *p >= 0.0)
        .map_or(0, |p| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                p.round() as u64
            }
        });
    let admin_level = admin_level_property(feature);

    Some(Neighborhood {
        id,
        name,
        geometry,
        population,
        admin_level,
        dataset: dataset.to_string(),
    })
}

/// Feature identifier: the `GeoJSON` `id` member, the `id` property,
/// or the feature's position in the collection as a last resort.
fn feature_id(feature: &Feature, index: usize) -> String {
    match &feature.id {
        Some(geojson::feature::Id::String(id)) => id.clone(),
        Some(geojson::feature::Id::Number(id)) => id.to_string(),
        None => string_property(feature, "id")
            .or_else(|| number_property(feature, "id").map(|n| n.to_string()))
            .unwrap_or_else(|| index.to_string()),
    }
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn number_property(feature: &Feature, key: &str) -> Option<f64> {
    let value = feature.property(key)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// `admin_level` arrives as `"8"` from OSM-derived layers or as a bare
/// number from hand-edited ones.
fn admin_level_property(feature: &Feature) -> Option<AdminLevel> {
    let raw = number_property(feature, "admin_level")?;
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let level = raw.round() as i64;
    u8::try_from(level).ok()?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stations_layer() -> FeatureCollection {
        parse_collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": "s1",
                        "geometry": { "type": "Point", "coordinates": [13.405, 52.52] },
                        "properties": { "name": "Alexanderplatz", "type": "metro", "bufferRadius": 450 }
                    },
                    {
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": [13.41, 52.53] },
                        "properties": { "id": "s2", "bufferRadius": 9000 }
                    },
                    {
                        "type": "Feature",
                        "geometry": null,
                        "properties": { "id": "broken" }
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_stations_and_clamps_radius() {
        let stations = parse_stations(&stations_layer(), "ds").unwrap();
        assert_eq!(stations.len(), 2);

        assert_eq!(stations[0].id, "s1");
        assert_eq!(stations[0].name, "Alexanderplatz");
        assert_eq!(stations[0].category, StationCategory::Metro);
        assert!((stations[0].radius_m - 450.0).abs() < f64::EPSILON);

        // 9000 m is out of range and clamps to the maximum.
        assert_eq!(stations[1].id, "s2");
        assert!((stations[1].radius_m - 500.0).abs() < f64::EPSILON);
        assert_eq!(stations[1].category, StationCategory::Bus);
    }

    #[test]
    fn parses_neighborhoods_with_defaults() {
        let collection = parse_collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": "n1",
                        "geometry": {
                            "type": "Polygon",
                            "coordinates": [[[13.4, 52.5], [13.41, 52.5], [13.41, 52.51], [13.4, 52.51], [13.4, 52.5]]]
                        },
                        "properties": { "name": "Mitte", "population": 12500, "admin_level": "9" }
                    },
                    {
                        "type": "Feature",
                        "id": "n2",
                        "geometry": {
                            "type": "MultiPolygon",
                            "coordinates": [[[[13.5, 52.5], [13.51, 52.5], [13.51, 52.51], [13.5, 52.51], [13.5, 52.5]]]]
                        },
                        "properties": {}
                    }
                ]
            }"#,
        )
        .unwrap();

        let neighborhoods = parse_neighborhoods(&collection, "ds").unwrap();
        assert_eq!(neighborhoods.len(), 2);

        assert_eq!(neighborhoods[0].name, "Mitte");
        assert_eq!(neighborhoods[0].population, 12_500);
        assert_eq!(neighborhoods[0].admin_level, Some(AdminLevel::Nine));

        assert_eq!(neighborhoods[1].population, 0);
        assert_eq!(neighborhoods[1].admin_level, None);
    }

    #[test]
    fn skips_point_features_in_neighborhood_layer() {
        let collection = parse_collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": "p1",
                        "geometry": { "type": "Point", "coordinates": [13.4, 52.5] },
                        "properties": {}
                    }
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            parse_neighborhoods(&collection, "ds"),
            Err(LayerError::Empty { .. })
        ));
    }

    #[test]
    fn rejects_non_collection_payloads() {
        let err = parse_collection(
            r#"{ "type": "Point", "coordinates": [13.4, 52.5] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::NotACollection { .. }));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_collection("not geojson"),
            Err(LayerError::Geojson(_))
        ));
    }

    #[test]
    fn falls_back_to_index_for_missing_id() {
        let collection = parse_collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": [13.4, 52.5] },
                        "properties": {}
                    }
                ]
            }"#,
        )
        .unwrap();
        let stations = parse_stations(&collection, "ds").unwrap();
        assert_eq!(stations[0].id, "0");
    }
}
