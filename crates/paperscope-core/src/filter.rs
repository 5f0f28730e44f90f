//! Metadata filters pushed down to the paper index.
//!
//! Filters are built from a [`SearchIntent`](crate::SearchIntent) and
//! evaluated natively by each index implementation: the PostgreSQL index
//! translates them to SQL, the in-memory index calls [`MetadataFilter::matches`].
//! [`MetadataFilter::to_json`] renders the operator form used in logs and
//! API transparency output:
//!
//! ```
//! use paperscope_core::MetadataFilter;
//!
//! let filter = MetadataFilter::and(vec![
//!     MetadataFilter::gte("year", 2020),
//!     MetadataFilter::lt("year", 2023),
//! ]);
//! assert_eq!(
//!     filter.to_json().to_string(),
//!     r#"{"$and":[{"year":{"$gte":2020}},{"year":{"$lt":2023}}]}"#
//! );
//! ```

use serde_json::{json, Value as JsonValue};

use crate::models::PaperRecord;

/// Boolean predicate over integer paper metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    /// `field >= value`
    Gte { field: String, value: i64 },
    /// `field < value`
    Lt { field: String, value: i64 },
    /// Conjunction of all inner filters.
    And(Vec<MetadataFilter>),
}

impl MetadataFilter {
    pub fn gte(field: impl Into<String>, value: i64) -> Self {
        MetadataFilter::Gte {
            field: field.into(),
            value,
        }
    }

    pub fn lt(field: impl Into<String>, value: i64) -> Self {
        MetadataFilter::Lt {
            field: field.into(),
            value,
        }
    }

    pub fn and(filters: Vec<MetadataFilter>) -> Self {
        MetadataFilter::And(filters)
    }

    /// Operator-style JSON rendering (`$gte`, `$lt`, `$and`).
    pub fn to_json(&self) -> JsonValue {
        match self {
            MetadataFilter::Gte { field, value } => json!({ field.as_str(): { "$gte": value } }),
            MetadataFilter::Lt { field, value } => json!({ field.as_str(): { "$lt": value } }),
            MetadataFilter::And(inner) => {
                json!({ "$and": inner.iter().map(|f| f.to_json()).collect::<Vec<_>>() })
            }
        }
    }

    /// Fields referenced anywhere in the filter.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            MetadataFilter::Gte { field, .. } | MetadataFilter::Lt { field, .. } => {
                vec![field.as_str()]
            }
            MetadataFilter::And(inner) => inner.iter().flat_map(|f| f.fields()).collect(),
        }
    }

    /// Evaluate the filter against a paper. Unknown fields never match.
    pub fn matches(&self, paper: &PaperRecord) -> bool {
        match self {
            MetadataFilter::Gte { field, value } => {
                field_value(paper, field).is_some_and(|v| v >= *value)
            }
            MetadataFilter::Lt { field, value } => {
                field_value(paper, field).is_some_and(|v| v < *value)
            }
            MetadataFilter::And(inner) => inner.iter().all(|f| f.matches(paper)),
        }
    }
}

fn field_value(paper: &PaperRecord, field: &str) -> Option<i64> {
    match field {
        "year" => Some(i64::from(paper.year)),
        _ => None,
    }
}
