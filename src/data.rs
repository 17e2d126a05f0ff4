use crate::error::DataError;
use crate::types::{BoundaryFeature, CaseRecord};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Case-table column holding the place name.
pub const ID_COLUMN: &str = "id";
/// Case-table column holding the confirmed-case count.
pub const COUNT_COLUMN: &str = "Confirmed Cases";

/// Loads the boundary FeatureCollection. The file is fully read and
/// closed before this returns.
pub fn load_boundaries(path: &Path) -> Result<Vec<BoundaryFeature>> {
    println!("Loading boundaries from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open boundary file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Whole document parsed up front; boundary files are small.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse boundary GeoJSON")?;
    let boundaries = boundaries_from_geojson(geojson)?;

    println!("Loaded {} boundary features", boundaries.len());
    Ok(boundaries)
}

/// Extracts named polygon features from a parsed GeoJSON document.
///
/// Every feature must carry a string `properties.name`; its join id is
/// initialized to the raw name (normalization is a separate step).
pub fn boundaries_from_geojson(geojson: GeoJson) -> Result<Vec<BoundaryFeature>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(DataError::NotAFeatureCollection.into()),
    };

    let mut boundaries = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
        {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => return Err(DataError::MissingName { index }.into()),
        };

        // Polygons promote to single-element MultiPolygons so every
        // feature carries the same geometry type downstream.
        let geometry = match feature.geometry {
            Some(geometry) => {
                let converted: geo::Geometry<f64> = geometry
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry for '{}': {:?}", name, e))?;
                match converted {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => return Err(DataError::UnsupportedGeometry { name }.into()),
                }
            }
            None => return Err(DataError::UnsupportedGeometry { name }.into()),
        };

        boundaries.push(BoundaryFeature {
            id: name.clone(),
            name,
            geometry,
        });
    }

    Ok(boundaries)
}

/// Loads the case table. The file is fully read and closed before this
/// returns.
pub fn load_cases(path: &Path) -> Result<Vec<CaseRecord>> {
    println!("Loading case table from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open case table: {:?}", path))?;
    let records = cases_from_reader(file)?;
    println!("Loaded {} case records", records.len());
    Ok(records)
}

/// Parses the case table from any reader. Requires the `id` and
/// `Confirmed Cases` columns; rows with an empty id are skipped.
pub fn cases_from_reader<R: Read>(reader: R) -> Result<Vec<CaseRecord>> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();

    let id_idx = headers
        .iter()
        .position(|h| h == ID_COLUMN)
        .ok_or_else(|| DataError::MissingColumn(ID_COLUMN.to_string()))?;
    let count_idx = headers
        .iter()
        .position(|h| h == COUNT_COLUMN)
        .ok_or_else(|| DataError::MissingColumn(COUNT_COLUMN.to_string()))?;

    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let id = record.get(id_idx).unwrap_or("").to_string();

        if id.is_empty() {
            continue;
        }

        let raw_count = record.get(count_idx).unwrap_or("").trim();
        let count: u32 = raw_count.parse().map_err(|_| DataError::BadCount {
            id: id.clone(),
            value: raw_count.to_string(),
        })?;

        records.push(CaseRecord { id, count });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOWNS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": " Irvine "},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                }
            }
        ]
    }"#;

    #[test]
    fn boundary_names_are_kept_raw() {
        let geojson: GeoJson = TOWNS.parse().unwrap();
        let boundaries = boundaries_from_geojson(geojson).unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].name, " Irvine ");
        // The raw label stands in as the id until normalization.
        assert_eq!(boundaries[0].id, " Irvine ");
    }

    #[test]
    fn missing_name_is_malformed_data() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    }
                }
            ]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let err = boundaries_from_geojson(geojson).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MissingName { index: 0 })
        ));
    }

    #[test]
    fn non_string_name_is_malformed_data() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": 7},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    }
                }
            ]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let err = boundaries_from_geojson(geojson).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MissingName { index: 0 })
        ));
    }

    #[test]
    fn non_collection_is_rejected() {
        let json = r#"{
            "type": "Feature",
            "properties": {"name": "Irvine"},
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let err = boundaries_from_geojson(geojson).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::NotAFeatureCollection)
        ));
    }

    #[test]
    fn point_geometry_is_rejected() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "Irvine"},
                    "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
                }
            ]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let err = boundaries_from_geojson(geojson).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::UnsupportedGeometry { name }) if name == "Irvine"
        ));
    }

    #[test]
    fn cases_parse_and_keep_raw_ids() {
        let csv = "id,Confirmed Cases\n Irvine ,42\nTustin,7\n,5\n";
        let records = cases_from_reader(csv.as_bytes()).unwrap();
        // The empty-id row is skipped; whitespace survives until
        // normalization.
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            CaseRecord {
                id: " Irvine ".into(),
                count: 42
            }
        );
        assert_eq!(
            records[1],
            CaseRecord {
                id: "Tustin".into(),
                count: 7
            }
        );
    }

    #[test]
    fn missing_count_column_is_malformed_data() {
        let csv = "id,cases\nIrvine,42\n";
        let err = cases_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MissingColumn(column)) if column == COUNT_COLUMN
        ));
    }

    #[test]
    fn missing_id_column_is_malformed_data() {
        let csv = "place,Confirmed Cases\nIrvine,42\n";
        let err = cases_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MissingColumn(column)) if column == ID_COLUMN
        ));
    }

    #[test]
    fn bad_count_is_malformed_data() {
        let csv = "id,Confirmed Cases\nIrvine,many\n";
        let err = cases_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::BadCount { id, value }) if id == "Irvine" && value == "many"
        ));
    }
}
