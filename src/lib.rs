//! geoaid - Geocode aid-location CSV files and export them as GeoJSON

pub mod api;
pub mod config;
pub mod domain;
pub mod enrich;
pub mod geojson;
pub mod table;
