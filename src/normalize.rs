//! Whitespace normalization of join keys.
//!
//! Boundary labels and case-table ids are human-entered and carry
//! incidental surrounding whitespace in the source data. The join is
//! exact string equality, so both datasets pass through here before
//! rendering. No case folding, punctuation stripping, or deduplication
//! happens; a genuine naming mismatch still drops the place silently.

use crate::types::{BoundaryFeature, CaseRecord};

/// Derives the trimmed join id for every feature. Source order and all
/// other fields are preserved; applying this twice is a no-op.
pub fn normalize_boundaries(boundaries: Vec<BoundaryFeature>) -> Vec<BoundaryFeature> {
    boundaries
        .into_iter()
        .map(|feature| {
            let id = feature.name.trim().to_string();
            BoundaryFeature { id, ..feature }
        })
        .collect()
}

/// Trims the id of every case record. Order preserved; idempotent.
pub fn normalize_cases(records: Vec<CaseRecord>) -> Vec<CaseRecord> {
    records
        .into_iter()
        .map(|record| CaseRecord {
            id: record.id.trim().to_string(),
            count: record.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn feature(name: &str) -> BoundaryFeature {
        BoundaryFeature {
            name: name.to_string(),
            id: name.to_string(),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    #[test]
    fn boundary_ids_are_trimmed_names() {
        let normalized = normalize_boundaries(vec![feature(" Irvine "), feature("Tustin")]);
        assert_eq!(normalized[0].id, "Irvine");
        assert_eq!(normalized[0].name, " Irvine ");
        assert_eq!(normalized[1].id, "Tustin");
        assert!(normalized.iter().all(|f| f.id == f.name.trim()));
    }

    #[test]
    fn case_ids_are_trimmed() {
        let normalized = normalize_cases(vec![CaseRecord {
            id: " Irvine ".into(),
            count: 42,
        }]);
        assert_eq!(
            normalized[0],
            CaseRecord {
                id: "Irvine".into(),
                count: 42
            }
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_cases(vec![
            CaseRecord {
                id: " Irvine ".into(),
                count: 1,
            },
            CaseRecord {
                id: "Tustin".into(),
                count: 2,
            },
        ]);
        let twice = normalize_cases(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn order_is_preserved() {
        let names = ["Tustin", " Irvine ", "Orange"];
        let normalized = normalize_boundaries(names.iter().map(|n| feature(n)).collect());
        let ids: Vec<_> = normalized.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["Tustin", "Irvine", "Orange"]);
    }
}
