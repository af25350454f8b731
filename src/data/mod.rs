//! File loaders for district records and basemap outlines.

use std::fs;
use std::path::Path;

use geojson::{GeoJson, Geometry, Value};
use rayon::prelude::*;
use serde::Deserialize;
use simd_json::OwnedValue;
use tracing::{debug, info, warn};

use crate::district::{District, RawDistrict};
use crate::error::DataError;
use crate::map::LineString;

/// Response wrapper some endpoints put around the record list
#[derive(Deserialize)]
struct Envelope {
    #[serde(alias = "quartiers", alias = "districts")]
    data: Vec<OwnedValue>,
}

/// Load districts from a JSON array of records, an `{"data": [...]}`
/// envelope, or a GeoJSON FeatureCollection of points
pub fn load_districts(path: &Path) -> Result<Vec<District>, DataError> {
    let mut bytes = fs::read(path)?;
    let districts = parse_districts(&mut bytes)?;
    info!(path = %path.display(), count = districts.len(), "districts loaded");
    Ok(districts)
}

/// Parse a district document in place (the buffer is used as scratch space)
pub fn parse_districts(bytes: &mut [u8]) -> Result<Vec<District>, DataError> {
    let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());
    let raw = match first {
        Some(b'[') => decode_records(simd_json::serde::from_slice::<Vec<OwnedValue>>(bytes)?),
        Some(b'{') => match parse_feature_collection(bytes)? {
            Some(raw) => raw,
            None => decode_records(simd_json::serde::from_slice::<Envelope>(bytes)?.data),
        },
        _ => return Err(DataError::Unsupported("expected a JSON array or object".into())),
    };
    Ok(normalize(raw))
}

/// Records that fail to decode are skipped so one bad row cannot sink the file
fn decode_records(values: Vec<OwnedValue>) -> Vec<RawDistrict> {
    let total = values.len();
    let records: Vec<RawDistrict> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match simd_json::serde::from_owned_value(value) {
            Ok(raw) => Some(raw),
            Err(err) => {
                warn!(index, error = %err, "skipping malformed district record");
                None
            }
        })
        .collect();
    if records.len() < total {
        debug!(kept = records.len(), total, "district records decoded");
    }
    records
}

/// `Ok(None)` when the object is not GeoJSON
fn parse_feature_collection(bytes: &[u8]) -> Result<Option<Vec<RawDistrict>>, DataError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DataError::Unsupported(e.to_string()))?;
    let Ok(geojson) = text.parse::<GeoJson>() else {
        return Ok(None);
    };
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(DataError::Unsupported("expected a FeatureCollection".into()));
    };

    let mut records = Vec::with_capacity(fc.features.len());
    for feature in fc.features {
        let props = feature.properties.unwrap_or_default();
        let mut raw = match RawDistrict::deserialize(serde_json::Value::Object(props)) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "skipping feature with malformed properties");
                continue;
            }
        };
        if let Some(Geometry {
            value: Value::Point(coords),
            ..
        }) = feature.geometry
        {
            if coords.len() >= 2 {
                raw.place_if_missing(coords[0], coords[1]);
            }
        }
        records.push(raw);
    }
    Ok(Some(records))
}

/// Convert wire records in parallel and report unplaceable ones
fn normalize(raw: Vec<RawDistrict>) -> Vec<District> {
    let districts: Vec<District> = raw.into_par_iter().map(District::from).collect();
    let unplaced = districts.par_iter().filter(|d| d.coordinate().is_none()).count();
    if unplaced > 0 {
        warn!(unplaced, total = districts.len(), "districts without usable coordinates");
    }
    districts
}

/// Load every line, polygon ring and multi-part outline from a GeoJSON file
pub fn load_basemap(path: &Path) -> Result<Vec<LineString>, DataError> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    debug!(path = %path.display(), lines = lines.len(), "basemap parsed");
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords.iter().filter(|c| c.len() >= 2).map(|c| (c[0], c[1])).collect()
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        // District and commune limits: every ring is an outline
        Value::Polygon(rings) => {
            for ring in rings {
                add_line(to_line(ring));
            }
        }
        Value::MultiPolygon(polygons) => {
            for ring in polygons.iter().flatten() {
                add_line(to_line(ring));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::district::PriceSummary;

    fn parse(text: &str) -> Result<Vec<District>, DataError> {
        let mut bytes = text.as_bytes().to_vec();
        parse_districts(&mut bytes)
    }

    #[test]
    fn test_parse_array_with_french_keys() {
        let districts = parse(
            r#"[
                {"id": 7, "nom": "Cocody", "commune": {"nom": "Cocody"},
                 "latitude": "5.36", "longitude": -3.98,
                 "prix_min_location": 150000, "prix_moyen_location": "250000",
                 "prix_max_location": null, "nombre_biens": 12},
                {"id": "b", "name": "Plateau", "lat": 5.32, "lng": -4.02}
            ]"#,
        )
        .unwrap();
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[0].id, "7");
        assert_eq!(districts[0].commune.as_deref(), Some("Cocody"));
        assert!(districts[0].coordinate().is_some());
        match &districts[0].prices {
            PriceSummary::Flat(flat) => {
                assert_eq!(flat.rental_avg.as_ref().and_then(|v| v.as_f64()), Some(250000.0));
                assert!(flat.rental_max.is_none());
            }
            PriceSummary::Breakdown(_) => panic!("expected flat prices"),
        }
        assert_eq!(districts[1].name, "Plateau");
    }

    #[test]
    fn test_parse_breakdown_records() {
        let districts = parse(
            r#"[{"nom": "Riviera", "prix": [
                {"type": "Villa", "prix_moyen_location": 400000, "nombre_location": 2}
            ]}]"#,
        )
        .unwrap();
        match &districts[0].prices {
            PriceSummary::Breakdown(rows) => {
                assert_eq!(rows[0].label, "Villa");
                assert_eq!(rows[0].rental_count, 2);
            }
            PriceSummary::Flat(_) => panic!("expected breakdown"),
        }
    }

    #[test]
    fn test_parse_envelope() {
        let districts = parse(r#"{"data": [{"nom": "Yopougon"}]}"#).unwrap();
        assert_eq!(districts.len(), 1);
        assert!(districts[0].coordinate().is_none());
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let doc = r#"[
            {"nom": "Cocody", "latitude": 5.36, "longitude": -3.98},
            {"nom": "Adjame", "latitude": true, "longitude": -4.02},
            {"nom": "Plateau", "latitude": 5.32, "longitude": -4.02}
        ]"#;
        let names: Vec<String> = parse(doc).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["Cocody", "Plateau"]);

        let wrapped = format!(r#"{{"quartiers": {doc}}}"#);
        assert_eq!(parse(&wrapped).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_feature_collection() {
        let districts = parse(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [-4.0, 5.35]},
                 "properties": {"id": "1", "nom": "Treichville"}}
            ]}"#,
        )
        .unwrap();
        let c = districts[0].coordinate().unwrap();
        assert_eq!((c.lng, c.lat), (-4.0, 5.35));
        assert_eq!(districts[0].name, "Treichville");
    }

    #[test]
    fn test_rejects_scalar_document() {
        assert!(matches!(parse("42"), Err(DataError::Unsupported(_))));
        assert!(parse("[{").is_err());
    }

    #[test]
    fn test_basemap_outlines() {
        let geojson = GeoJson::from_json_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [
                     [[-4.0, 5.3], [-3.9, 5.3], [-3.9, 5.4], [-4.0, 5.3]]
                 ]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiLineString", "coordinates": [
                     [[0.0, 0.0], [1.0, 1.0]], [[2.0, 2.0], [3.0, 3.0]]
                 ]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
            ]
        }))
        .unwrap();
        let mut lines = Vec::new();
        process_geojson_lines(&geojson, |line| lines.push(line));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 4);
    }

    #[test]
    fn test_load_basemap_from_file() {
        let path = std::env::temp_dir().join(format!("quartier-map-basemap-{}.geojson", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"type": "LineString", "coordinates": [[-4.0, 5.3], [-3.9, 5.4]]}}"#
        )
        .unwrap();
        drop(file);

        let lines = load_basemap(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(lines, vec![vec![(-4.0, 5.3), (-3.9, 5.4)]]);
        assert!(matches!(load_basemap(&path), Err(DataError::Io(_))));
    }
}
