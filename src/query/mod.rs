//! Filter expressions and base-query partitioning
//!
//! A base query is a [`FilterExpression`] with no date range attached. The
//! [`window`] module pairs each base query with bounded date windows to form
//! the [`SubQuery`] values that are actually sent to the API.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub mod window;

pub use window::{iterate_windows, window_count, DateWindow, WindowIter};

/// Query partitioning errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Only one or two filter fields can be partitioned
    #[error("unsupported number of field names: {0} (expected 1 or 2)")]
    UnsupportedFieldCount(usize),

    /// Two-field partitioning needs exactly two value groups
    #[error("two field names require exactly 2 value groups, got {0}")]
    ValueGroupCount(usize),

    /// A field or value group has no values
    #[error("no values supplied for field '{0}'")]
    EmptyValues(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Constraint operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Field value is one of the listed values
    In,
    /// Field value equals the (single) listed value
    Eq,
}

/// A single field constraint inside a filter expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint operation
    pub operation: Operation,
    /// API field name (e.g., "region_code", "keyword")
    pub field_name: String,
    /// Ordered values for the field
    pub field_values: Vec<String>,
}

impl Constraint {
    /// Build an `IN` constraint
    pub fn is_in(field_name: impl Into<String>, field_values: Vec<String>) -> Self {
        Self {
            operation: Operation::In,
            field_name: field_name.into(),
            field_values,
        }
    }

    /// Build an `EQ` constraint
    pub fn eq(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            operation: Operation::Eq,
            field_name: field_name.into(),
            field_values: vec![value.into()],
        }
    }
}

/// Logical AND of one or more constraints. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    and: Vec<Constraint>,
}

impl FilterExpression {
    /// Create an expression from its constraints
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { and: constraints }
    }

    /// Constraints joined by AND
    pub fn constraints(&self) -> &[Constraint] {
        &self.and
    }

    /// Wire representation (`{"and": [...]}`)
    pub fn to_value(&self) -> Value {
        json!({ "and": self.and })
    }
}

/// Values configured for the filter fields.
///
/// A single field takes a flat list; two fields take two value groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValues {
    /// `["GB", "US"]`
    Flat(Vec<String>),
    /// `[["GB", "US"], ["cats", "dogs"]]`
    Grouped(Vec<Vec<String>>),
}

impl FieldValues {
    /// All values in order, groups concatenated
    pub fn flatten(&self) -> Vec<String> {
        match self {
            FieldValues::Flat(values) => values.clone(),
            FieldValues::Grouped(groups) => groups.iter().flatten().cloned().collect(),
        }
    }

    /// Values as groups; a flat list is one group per value
    pub fn groups(&self) -> Vec<Vec<String>> {
        match self {
            FieldValues::Flat(values) => values.iter().map(|v| vec![v.clone()]).collect(),
            FieldValues::Grouped(groups) => groups.clone(),
        }
    }
}

/// Expand filter fields and their values into base queries.
///
/// - One field: a single `IN` constraint over every value.
/// - Two fields: every ordered pair of field names (names × names) crossed
///   with every unordered pair of value groups; constraint *k* binds the
///   *k*-th name of the pair to the *k*-th group of the combination.
/// - Any other field count is rejected.
///
/// # Errors
/// Returns [`QueryError`] for unsupported field counts, a group count other
/// than two for two fields, or when no field has any value. With two fields a
/// single empty group still yields its four expressions.
pub fn build_base_queries(
    field_names: &[String],
    field_values: &FieldValues,
) -> QueryResult<Vec<FilterExpression>> {
    match field_names {
        [name] => {
            let values = field_values.flatten();
            if values.is_empty() {
                return Err(QueryError::EmptyValues(name.clone()));
            }
            Ok(vec![FilterExpression::new(vec![Constraint::is_in(
                name.as_str(),
                values,
            )])])
        }
        [first, second] => {
            let groups = field_values.groups();
            if groups.len() != 2 {
                return Err(QueryError::ValueGroupCount(groups.len()));
            }
            if groups.iter().all(Vec::is_empty) {
                return Err(QueryError::EmptyValues(format!("{first}, {second}")));
            }

            let group_pairs: Vec<(&Vec<String>, &Vec<String>)> =
                groups.iter().tuple_combinations().collect();

            let queries = field_names
                .iter()
                .cartesian_product(field_names.iter())
                .cartesian_product(group_pairs.iter())
                .map(|((name_a, name_b), (values_a, values_b))| {
                    FilterExpression::new(vec![
                        Constraint::is_in(name_a.as_str(), (*values_a).clone()),
                        Constraint::is_in(name_b.as_str(), (*values_b).clone()),
                    ])
                })
                .collect();

            Ok(queries)
        }
        other => Err(QueryError::UnsupportedFieldCount(other.len())),
    }
}

/// A base query bound to one date window, ready to be paged through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQuery {
    /// Position of the base query (0-based)
    pub query_index: usize,
    /// Position of the window within the base query's range (0-based)
    pub window_index: usize,
    /// Filter expression
    pub expression: FilterExpression,
    /// Date window
    pub window: DateWindow,
}

impl SubQuery {
    /// Request body without pagination fields
    pub fn to_body(&self) -> Value {
        json!({
            "query": self.expression.to_value(),
            "start_date": self.window.start_date_param(),
            "end_date": self.window.end_date_param(),
        })
    }
}
