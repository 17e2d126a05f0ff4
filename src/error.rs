//! Malformed-data conditions in the two input files.

use thiserror::Error;

/// A record in an input file is missing or violates an expected field.
///
/// Any of these aborts the run before rendering; there is no recovery
/// path. Join mismatches are not errors (unmatched records are dropped
/// silently).
#[derive(Debug, Error)]
pub enum DataError {
    /// The boundary file parsed as GeoJSON but is not a FeatureCollection.
    #[error("boundary file is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// A boundary feature has no string `name` property.
    #[error("boundary feature {index} has no string 'name' property")]
    MissingName { index: usize },

    /// A boundary feature's geometry is not a Polygon or MultiPolygon.
    #[error("boundary feature '{name}' has unsupported geometry (expected Polygon or MultiPolygon)")]
    UnsupportedGeometry { name: String },

    /// The case table lacks a required column.
    #[error("column '{0}' not found in case table")]
    MissingColumn(String),

    /// A case count failed to parse as a non-negative integer.
    #[error("case count for '{id}' is not a non-negative integer: '{value}'")]
    BadCount { id: String, value: String },
}
