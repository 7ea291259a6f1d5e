use std::{fs, path::Path};

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, JsonObject, Value};

use crate::pipeline::GeocodedPlace;

/// Convert geocoded places to a GeoJSON feature collection of points.
pub fn to_feature_collection(places: &[GeocodedPlace]) -> FeatureCollection {
    FeatureCollection {
        features: places.iter().map(place_to_feature).collect(),
        bbox: None,
        foreign_members: None,
    }
}

fn place_to_feature(place: &GeocodedPlace) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("address".into(), place.address.clone().into());
    // GeoJSON positions are lng, lat
    let position = vec![place.coordinate.lng, place.coordinate.lat];
    Feature {
        geometry: Some(Value::Point(position).into()),
        properties: Some(properties),
        ..Default::default()
    }
}

/// Write the collection to `path`, replacing any existing file.
pub fn save(path: &Path, features: &FeatureCollection) -> Result<()> {
    fs::write(path, features.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::Coordinate;

    #[test]
    fn one_point_feature_per_place() {
        let places = vec![
            GeocodedPlace {
                address: "서울특별시 강남구".into(),
                coordinate: Coordinate::new(37.5, 127.0),
            },
            GeocodedPlace {
                address: "제주특별자치도 제주시".into(),
                coordinate: Coordinate::new(33.5, 126.53),
            },
        ];

        let collection = to_feature_collection(&places);

        assert_eq!(collection.features.len(), 2);
        let first = &collection.features[0];
        assert_eq!(
            first.geometry.as_ref().map(|g| &g.value),
            Some(&Value::Point(vec![127.0, 37.5]))
        );
        assert_eq!(
            first.properties.as_ref().and_then(|p| p.get("address")),
            Some(&serde_json::Value::from("서울특별시 강남구"))
        );
    }

    #[test]
    fn empty_collection_is_valid_geojson() {
        let text = to_feature_collection(&[]).to_string();
        let parsed: FeatureCollection = text.parse().unwrap();
        assert!(parsed.features.is_empty());
    }
}
