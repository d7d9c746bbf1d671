use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::parse_coordinate;
use crate::table::{LAT_COLUMN, LON_COLUMN, RowSet};

/// Top-level GeoJSON document
#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    type_: &'static str,
    features: Vec<Feature>,
}

/// One row as a GeoJSON feature. The geometry field is always present:
/// rows without usable coordinates serialize it as an explicit null.
#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    type_: &'static str,
    properties: Map<String, Value>,
    geometry: Option<Geometry>,
}

/// GeoJSON point; coordinates are ordered [lon, lat]
#[derive(Debug, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    type_: &'static str,
    coordinates: [f64; 2],
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Map every row to a feature, in input order.
///
/// Properties carry the row's full column-to-value mapping as strings,
/// in column order. Coordinate values are not range-checked; any finite
/// parse is accepted as-is.
pub fn feature_collection(rows: &RowSet) -> FeatureCollection {
    let lat_idx = rows.column_index(LAT_COLUMN);
    let lon_idx = rows.column_index(LON_COLUMN);

    let features = rows
        .rows()
        .iter()
        .map(|row| {
            let properties: Map<String, Value> = rows
                .headers()
                .iter()
                .zip(row)
                .map(|(header, value)| (header.clone(), Value::String(value.clone())))
                .collect();

            let lat = lat_idx.and_then(|idx| parse_coordinate(&row[idx]));
            let lon = lon_idx.and_then(|idx| parse_coordinate(&row[idx]));
            let geometry = match (lat, lon) {
                (Some(lat), Some(lon)) => Some(Geometry {
                    type_: "Point",
                    coordinates: [lon, lat],
                }),
                _ => None,
            };

            Feature {
                type_: "Feature",
                properties,
                geometry,
            }
        })
        .collect();

    FeatureCollection {
        type_: "FeatureCollection",
        features,
    }
}

/// Write the collection as pretty-printed UTF-8 JSON.
pub fn write_feature_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create GeoJSON file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, collection)
        .with_context(|| format!("Failed to write GeoJSON file: {}", path.display()))?;
    writer.flush().context("Failed to flush GeoJSON output")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(headers: &[&str], cells: &[&[&str]]) -> RowSet {
        let mut rows = RowSet::new(headers.iter().map(|h| h.to_string()).collect());
        for row in cells {
            rows.push_row(row.iter().map(|cell| cell.to_string()).collect());
        }
        rows
    }

    #[test]
    fn test_rows_with_coordinates_become_point_features() {
        let rows = rows(
            &["Name", "Lat", "Lon"],
            &[&["Community Fridge", "40.7128000", "-74.0060000"]],
        );

        let collection = serde_json::to_value(feature_collection(&rows)).unwrap();

        assert_eq!(
            collection,
            json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {
                            "Name": "Community Fridge",
                            "Lat": "40.7128000",
                            "Lon": "-74.0060000"
                        },
                        "geometry": {
                            "type": "Point",
                            "coordinates": [-74.006, 40.7128]
                        }
                    }
                ]
            })
        );
    }

    #[test]
    fn test_empty_coordinate_cell_yields_null_geometry() {
        let rows = rows(&["Name", "Lat", "Lon"], &[&["Fridge", "", "-74.006"]]);

        let collection = serde_json::to_value(feature_collection(&rows)).unwrap();

        assert_eq!(
            collection["features"][0],
            json!({
                "type": "Feature",
                "properties": {
                    "Name": "Fridge",
                    "Lat": "",
                    "Lon": "-74.006"
                },
                "geometry": null
            })
        );
    }

    #[test]
    fn test_unparseable_coordinate_yields_null_geometry() {
        let rows = rows(
            &["Lat", "Lon"],
            &[&["not-a-number", "-74.006"], &["NaN", "-74.006"]],
        );

        let collection = serde_json::to_value(feature_collection(&rows)).unwrap();

        assert_eq!(collection["features"][0]["geometry"], json!(null));
        assert_eq!(collection["features"][1]["geometry"], json!(null));
    }

    #[test]
    fn test_missing_coordinate_columns_yield_null_geometry() {
        let rows = rows(&["Name", "City"], &[&["Fridge", "New York"]]);

        let collection = serde_json::to_value(feature_collection(&rows)).unwrap();

        assert_eq!(collection["features"][0]["geometry"], json!(null));
        assert_eq!(
            collection["features"][0]["properties"],
            json!({"Name": "Fridge", "City": "New York"})
        );
    }

    #[test]
    fn test_features_keep_row_order() {
        let rows = rows(
            &["Name", "Lat", "Lon"],
            &[
                &["c", "1.0", "1.0"],
                &["a", "", ""],
                &["b", "2.0", "2.0"],
            ],
        );

        let collection = serde_json::to_value(feature_collection(&rows)).unwrap();
        let names: Vec<&str> = collection["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["Name"].as_str().unwrap())
            .collect();

        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_out_of_range_values_pass_through_unchecked() {
        let rows = rows(&["Lat", "Lon"], &[&["123.45", "-987.6"]]);

        let collection = serde_json::to_value(feature_collection(&rows)).unwrap();

        assert_eq!(
            collection["features"][0]["geometry"]["coordinates"],
            json!([-987.6, 123.45])
        );
    }

    #[test]
    fn test_write_feature_collection_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let rows = rows(&["Name", "Lat", "Lon"], &[&["Fridge", "40.7", "-74.0"]]);

        let collection = feature_collection(&rows);
        write_feature_collection(&path, &collection).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
        assert_eq!(parsed["features"].as_array().unwrap().len(), 1);
        // Pretty-printed with a two-space indent
        assert!(written.starts_with("{\n  \"type\""));
    }
}
