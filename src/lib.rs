//! Choropleth map of confirmed COVID-19 cases by city.
//!
//! Loads a GeoJSON boundary file and a CSV case table, joins them on a
//! whitespace-trimmed place-name key, and renders the joined data as a
//! colored map figure for display in a browser.

pub mod config;
pub mod data;
pub mod error;
pub mod normalize;
pub mod render;
pub mod server;
pub mod types;
