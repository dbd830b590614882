//! Filter conditions passed through to storage collaborators
//!
//! Filters narrow the collection a page is drawn from. The engine never
//! interprets them beyond forwarding them to the [`PageSource`] and the
//! [`CountEstimator`]; [`FilterCondition::matches`] exists for in-memory
//! collaborators. The keyset seek predicate is expressed with the same types
//! so SQL-backed collaborators can render both uniformly.
//!
//! [`PageSource`]: crate::source::PageSource
//! [`CountEstimator`]: crate::count::CountEstimator
//!
//! # Example
//!
//! ```rust
//! use seekpage::filter::FilterCondition;
//!
//! let filters = vec![
//!     FilterCondition::eq("status", "active"),
//!     FilterCondition::gte("age", 18_i64),
//! ];
//! assert_eq!(filters[1].to_string(), "age >= 18");
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use seekpage::filter::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::In), "IN");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Right-hand side of a filter condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A single operand
    Single(FieldValue),
    /// Operand list for `IN`
    List(Vec<FieldValue>),
    /// No operand (`IS NULL` / `IS NOT NULL`)
    None,
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    fn single(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self::new(field, operator, FilterValue::Single(value.into()))
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::single(field, FilterOperator::Equal, value)
    }

    /// Create a not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::single(field, FilterOperator::NotEqual, value)
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::single(field, FilterOperator::GreaterThan, value)
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::single(field, FilterOperator::GreaterThanOrEqual, value)
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::single(field, FilterOperator::LessThan, value)
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::single(field, FilterOperator::LessThanOrEqual, value)
    }

    /// Create an IN list filter
    pub fn is_in(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::List(values))
    }

    /// Create an IS NULL filter
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::None)
    }

    /// Create an IS NOT NULL filter
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::None)
    }

    /// Evaluate the condition against a row's value for `self.field`
    ///
    /// A missing field is treated as null. Ordering comparisons against null
    /// never match, as in SQL. Numbers compare by value whatever their
    /// representation, so `30` matches `score >= 30.0`.
    pub fn matches(&self, actual: Option<&FieldValue>) -> bool {
        let Some(value) = actual.filter(|v| !v.is_null()) else {
            return self.operator == FilterOperator::IsNull;
        };
        let equals = |expected: &FieldValue| value.value_cmp(expected) == Ordering::Equal;

        match (self.operator, &self.value) {
            (FilterOperator::IsNull, _) => false,
            (FilterOperator::IsNotNull, _) => true,
            (FilterOperator::In, FilterValue::List(list)) => list.iter().any(equals),
            (FilterOperator::In, FilterValue::Single(single)) => equals(single),
            (op, FilterValue::Single(expected)) => {
                let ordering = value.value_cmp(expected);
                match op {
                    FilterOperator::Equal => ordering == Ordering::Equal,
                    FilterOperator::NotEqual => ordering != Ordering::Equal,
                    FilterOperator::GreaterThan => ordering == Ordering::Greater,
                    FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                    FilterOperator::LessThan => ordering == Ordering::Less,
                    FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            FilterValue::None => write!(f, "{} {}", self.field, self.operator),
            FilterValue::Single(value) => write!(f, "{} {} {}", self.field, self.operator, value),
            FilterValue::List(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} {} ({})", self.field, self.operator, parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "=");
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::GreaterThan), ">");
        assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), ">=");
        assert_eq!(format!("{}", FilterOperator::LessThan), "<");
        assert_eq!(format!("{}", FilterOperator::LessThanOrEqual), "<=");
        assert_eq!(format!("{}", FilterOperator::In), "IN");
        assert_eq!(format!("{}", FilterOperator::IsNull), "IS NULL");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_filter_condition_eq() {
        let filter = FilterCondition::eq("status", "active");
        assert_eq!(filter.field, "status");
        assert_eq!(filter.operator, FilterOperator::Equal);
        assert_eq!(
            filter.value,
            FilterValue::Single(FieldValue::Text("active".to_string()))
        );
    }

    #[test]
    fn test_comparison_matching() {
        let filter = FilterCondition::gte("age", 18_i64);
        assert!(filter.matches(Some(&FieldValue::Int(18))));
        assert!(filter.matches(Some(&FieldValue::Int(40))));
        assert!(!filter.matches(Some(&FieldValue::Int(17))));
    }

    #[test]
    fn test_null_semantics() {
        let filter = FilterCondition::lt("score", 10_i64);
        assert!(!filter.matches(None));
        assert!(!filter.matches(Some(&FieldValue::Null)));

        assert!(FilterCondition::is_null("score").matches(None));
        let is_null = FilterCondition::is_null("score");
        assert!(is_null.matches(Some(&FieldValue::Null)));
        assert!(!FilterCondition::is_not_null("score").matches(None));
    }

    #[test]
    fn test_numeric_filters_ignore_representation() {
        let int = FieldValue::Int(30);
        let uint = FieldValue::UInt(30);
        let float = FieldValue::Float(30.0);

        assert!(FilterCondition::gte("score", 30.0).matches(Some(&int)));
        assert!(FilterCondition::lte("score", 30_i64).matches(Some(&float)));
        assert!(FilterCondition::eq("score", 30_i64).matches(Some(&uint)));
        assert!(FilterCondition::eq("score", 30_u64).matches(Some(&int)));
        assert!(!FilterCondition::ne("score", 30_i64).matches(Some(&uint)));
        assert!(!FilterCondition::gt("score", 30_i64).matches(Some(&float)));

        let list = vec![FieldValue::Float(1.0), FieldValue::UInt(30)];
        assert!(FilterCondition::is_in("score", list).matches(Some(&int)));
    }

    #[test]
    fn test_in_list_matching() {
        let filter = FilterCondition::is_in(
            "status",
            vec![FieldValue::from("active"), FieldValue::from("pending")],
        );
        assert!(filter.matches(Some(&FieldValue::from("pending"))));
        assert!(!filter.matches(Some(&FieldValue::from("deleted"))));
    }

    #[test]
    fn test_display() {
        let ne = FilterCondition::ne("status", "deleted");
        assert_eq!(ne.to_string(), "status != \"deleted\"");

        let is_null = FilterCondition::is_null("deleted_at");
        assert_eq!(is_null.to_string(), "deleted_at IS NULL");

        let ids = vec![FieldValue::Int(1), FieldValue::Int(2)];
        assert_eq!(
            FilterCondition::is_in("id", ids).to_string(),
            "id IN (1, 2)"
        );
    }
}
