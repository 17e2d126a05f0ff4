use geo::MultiPolygon;

/// A named geographic area from the boundary file.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    /// Free-text label exactly as it appears in the source file.
    pub name: String,
    /// Join key. Equal to `name` with surrounding whitespace removed
    /// once the collection has been normalized.
    pub id: String,
    pub geometry: MultiPolygon<f64>,
}

/// One row of the case table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    /// Place name; may carry incidental whitespace until normalized.
    pub id: String,
    /// Confirmed-case count.
    pub count: u32,
}
