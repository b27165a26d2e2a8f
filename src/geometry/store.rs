//! store.rs
//!
//! Loads the peatland polygon dataset and normalizes it to WGS84.
//!
//! The production dataset carries meter coordinates (EPSG:3857) under a
//! geographic label, a known defect of the export that produced it. The
//! store detects this from the coordinate magnitudes, reinterprets the
//! whole dataset as EPSG:3857, and inverse-projects to lon/lat degrees.
//! The decision is made once per file and logged — downstream code always
//! sees geographic degrees.

use geo::{LineString, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, Value};

use crate::geometry::projection::mercator_to_wgs84;
use crate::logging::{self, Component};
use crate::model::{GeometryError, PeatPolygon};

type Ring = Vec<(f64, f64)>;

/// One feature's rings before CRS correction: polygons, each a list of
/// rings, exterior first.
struct RawFeature {
    unique_id: i64,
    region: String,
    district: String,
    polygons: Vec<Vec<Ring>>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load, validate, and normalize the polygon dataset.
///
/// Fails on an unreadable file or unparseable content. Individual features
/// with missing identity or unusable geometry are skipped and logged, never
/// fatal. An empty result is returned with a warning — downstream stages
/// treat "no polygons" as "no possible matches".
pub fn load_polygons(path: &str) -> Result<Vec<PeatPolygon>, GeometryError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| GeometryError::Unreadable(format!("{}: {}", path, e)))?;

    let gj: GeoJson = text
        .parse()
        .map_err(|e| GeometryError::Parse(format!("{}: {}", path, e)))?;

    let fc = match gj {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(GeometryError::NotFeatureCollection),
    };

    let mut raw: Vec<RawFeature> = Vec::new();
    let mut skipped = 0usize;

    for feature in &fc.features {
        match parse_feature(feature) {
            Some(f) => raw.push(f),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        logging::warn(
            Component::Polygons,
            None,
            &format!("skipped {} features with missing id or geometry", skipped),
        );
    }

    // CRS correction: geographic degrees never exceed |180|, so any larger
    // coordinate means the dataset is EPSG:3857 meters under a wrong label.
    if needs_reinterpretation(&raw) {
        logging::warn(
            Component::Polygons,
            None,
            "coordinates out of geographic range, reinterpreting dataset as EPSG:3857",
        );
        for f in &mut raw {
            for poly in &mut f.polygons {
                for ring in poly {
                    for coord in ring.iter_mut() {
                        *coord = mercator_to_wgs84(coord.0, coord.1);
                    }
                }
            }
        }
        logging::info(Component::Polygons, None, "dataset normalized to EPSG:4326");
    }

    let polygons: Vec<PeatPolygon> = raw.into_iter().map(build_polygon).collect();

    if polygons.is_empty() {
        logging::warn(Component::Polygons, None, "dataset contains no usable polygons");
    } else {
        logging::info(
            Component::Polygons,
            None,
            &format!("loaded {} polygons from {}", polygons.len(), path),
        );
    }

    Ok(polygons)
}

// ---------------------------------------------------------------------------
// Feature parsing
// ---------------------------------------------------------------------------

fn parse_feature(feature: &Feature) -> Option<RawFeature> {
    let unique_id = prop_i64(feature, "unique_id")?;
    let region = prop_string(feature, "region");
    let district = prop_string(feature, "district");

    let geometry = feature.geometry.as_ref()?;
    let polygons = match &geometry.value {
        Value::Polygon(rings) => vec![rings_from_geojson(rings)],
        Value::MultiPolygon(multi) => multi.iter().map(|rings| rings_from_geojson(rings)).collect(),
        _ => return None,
    };

    if polygons.iter().all(|p| p.is_empty()) {
        return None;
    }

    Some(RawFeature {
        unique_id,
        region,
        district,
        polygons,
    })
}

fn rings_from_geojson(rings: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|pos| pos.len() >= 2)
                .map(|pos| (pos[0], pos[1]))
                .collect()
        })
        .collect()
}

/// Identity may be encoded as a JSON number or a numeric string.
fn prop_i64(feature: &Feature, key: &str) -> Option<i64> {
    let value = feature.properties.as_ref()?.get(key)?;
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(f) = value.as_f64() {
        return Some(f as i64);
    }
    value.as_str()?.trim().parse().ok()
}

fn prop_string(feature: &Feature, key: &str) -> String {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn needs_reinterpretation(raw: &[RawFeature]) -> bool {
    raw.iter().flat_map(|f| &f.polygons).flatten().flatten().any(
        |(x, y)| x.abs() > 180.0 || y.abs() > 90.0,
    )
}

fn build_polygon(f: RawFeature) -> PeatPolygon {
    let polys: Vec<Polygon<f64>> = f
        .polygons
        .into_iter()
        .filter(|rings| !rings.is_empty())
        .map(|mut rings| {
            let exterior = LineString::from(rings.remove(0));
            let interiors = rings.into_iter().map(LineString::from).collect();
            Polygon::new(exterior, interiors)
        })
        .collect();

    PeatPolygon {
        unique_id: f.unique_id,
        region: f.region,
        district: f.district,
        geometry: MultiPolygon(polys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    fn feature_json(id: i64, region: &str, coords: &str) -> String {
        format!(
            r#"{{"type": "Feature",
                 "properties": {{"unique_id": {}, "region": "{}", "district": "Тестовый район"}},
                 "geometry": {{"type": "Polygon", "coordinates": [{}]}}}}"#,
            id, region, coords
        )
    }

    #[test]
    fn test_loads_geographic_dataset_unchanged() {
        let ring = "[[37.0, 55.0], [37.1, 55.0], [37.1, 55.1], [37.0, 55.1], [37.0, 55.0]]";
        let gj = format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            feature_json(7, "Московская область", ring)
        );
        let file = write_temp(&gj);

        let polygons = load_polygons(file.path().to_str().unwrap()).expect("load");
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].unique_id, 7);
        assert_eq!(polygons[0].region, "Московская область");
        assert_eq!(polygons[0].district, "Тестовый район");

        let first = polygons[0].geometry.0[0].exterior().0[0];
        assert!((first.x - 37.0).abs() < 1e-9);
        assert!((first.y - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_metric_dataset_is_reinterpreted_as_3857() {
        // EPSG:3857 of roughly (37.6E, 55.75N)
        let ring = "[[4186000.0, 7508000.0], [4187000.0, 7508000.0], \
                     [4187000.0, 7509000.0], [4186000.0, 7509000.0], [4186000.0, 7508000.0]]";
        let gj = format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            feature_json(1, "Московская область", ring)
        );
        let file = write_temp(&gj);

        let polygons = load_polygons(file.path().to_str().unwrap()).expect("load");
        assert_eq!(polygons.len(), 1);

        let first = polygons[0].geometry.0[0].exterior().0[0];
        assert!(
            first.x > 37.0 && first.x < 38.0,
            "longitude should be geographic after reinterpretation, got {}",
            first.x
        );
        assert!(
            first.y > 55.0 && first.y < 56.0,
            "latitude should be geographic after reinterpretation, got {}",
            first.y
        );
    }

    #[test]
    fn test_feature_without_unique_id_is_skipped() {
        let ring = "[[37.0, 55.0], [37.1, 55.0], [37.1, 55.1], [37.0, 55.0]]";
        let gj = format!(
            r#"{{"type": "FeatureCollection", "features": [
                {{"type": "Feature",
                  "properties": {{"region": "Тверская область"}},
                  "geometry": {{"type": "Polygon", "coordinates": [{}]}}}},
                {}
            ]}}"#,
            ring,
            feature_json(2, "Тверская область", ring)
        );
        let file = write_temp(&gj);

        let polygons = load_polygons(file.path().to_str().unwrap()).expect("load");
        assert_eq!(polygons.len(), 1, "only the feature with an id survives");
        assert_eq!(polygons[0].unique_id, 2);
    }

    #[test]
    fn test_numeric_string_id_is_accepted() {
        let ring = "[[37.0, 55.0], [37.1, 55.0], [37.1, 55.1], [37.0, 55.0]]";
        let gj = format!(
            r#"{{"type": "FeatureCollection", "features": [
                {{"type": "Feature",
                  "properties": {{"unique_id": "42", "region": "", "district": ""}},
                  "geometry": {{"type": "Polygon", "coordinates": [{}]}}}}
            ]}}"#,
            ring
        );
        let file = write_temp(&gj);

        let polygons = load_polygons(file.path().to_str().unwrap()).expect("load");
        assert_eq!(polygons[0].unique_id, 42);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_polygons("no/such/file.geojson");
        assert!(matches!(result, Err(GeometryError::Unreadable(_))));
    }

    #[test]
    fn test_non_feature_collection_is_an_error() {
        let file = write_temp(r#"{"type": "Point", "coordinates": [37.0, 55.0]}"#);
        let result = load_polygons(file.path().to_str().unwrap());
        assert!(matches!(result, Err(GeometryError::NotFeatureCollection)));
    }

    #[test]
    fn test_empty_collection_is_ok_and_empty() {
        let file = write_temp(r#"{"type": "FeatureCollection", "features": []}"#);
        let polygons = load_polygons(file.path().to_str().unwrap()).expect("load");
        assert!(polygons.is_empty());
    }
}
