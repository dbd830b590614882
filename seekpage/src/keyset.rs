//! Keyset (seek) pagination
//!
//! Instead of skipping rows, a keyset page starts strictly after the sort key
//! of the last row the client saw. For `[(a, asc), (b, desc), (id, asc)]`
//! and cursor values `(va, vb, vid)` the seek predicate is
//!
//! ```text
//! a > va
//! OR (a = va AND b < vb)
//! OR (a = va AND b = vb AND id > vid)
//! ```
//!
//! Because the ordering ends in a unique key, every row is either before or
//! after the cursor, so inserts and deletes elsewhere in the collection never
//! shift later pages.

use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::error::Result;
use crate::filter::{FilterCondition, FilterOperator, FilterValue};
use crate::sort::{SortDirection, SortField, SortSpec};
use crate::source::{
    sort_key_of, PageSource, Position, RangeQuery, SortKey, SourceOperation,
};
use crate::value::FieldValue;
use crate::window::Window;

/// Strict lexicographic "after" predicate over a sort key
#[derive(Debug, Clone, PartialEq)]
pub struct SeekPredicate {
    fields: Vec<SortField>,
    values: Vec<FieldValue>,
}

impl SeekPredicate {
    /// Build the predicate selecting rows after `values` under `sort`
    ///
    /// `values` holds one entry per sort field; callers obtain them from a
    /// cursor that already passed the consistency check.
    pub fn new(sort: &SortSpec, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(sort.len(), values.len());
        Self {
            fields: sort.fields().to_vec(),
            values,
        }
    }

    /// The predicate as a disjunction of conjunctive filter clauses
    ///
    /// Clause `i` pins the first `i` fields to equality and requires field
    /// `i` to be past the cursor in its own direction.
    pub fn clauses(&self) -> Vec<Vec<FilterCondition>> {
        (0..self.fields.len())
            .map(|i| {
                let mut clause: Vec<FilterCondition> = self.fields[..i]
                    .iter()
                    .zip(&self.values)
                    .map(|(field, value)| FilterCondition::eq(field.name(), value.clone()))
                    .collect();
                let field = &self.fields[i];
                clause.push(FilterCondition::new(
                    field.name(),
                    past_operator(field.direction()),
                    FilterValue::Single(self.values[i].clone()),
                ));
                clause
            })
            .collect()
    }

    /// Whether a row with sort key `key` lies strictly after the cursor
    ///
    /// Evaluated with the engine's total order, so it also places `Null`
    /// values consistently (first), which the SQL rendering cannot.
    pub fn matches_key(&self, key: &[FieldValue]) -> bool {
        self.fields
            .iter()
            .zip(key.iter().zip(&self.values))
            .map(|(field, (row, cursor))| field.direction().apply(row.cmp(cursor)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            == Ordering::Greater
    }

    /// Whether `row` lies strictly after the cursor; rows missing a sort field never match
    pub fn matches<R: SortKey + ?Sized>(&self, row: &R) -> bool {
        let key: Option<Vec<FieldValue>> = self
            .fields
            .iter()
            .map(|field| row.sort_value(field.name()))
            .collect();
        key.is_some_and(|key| self.matches_key(&key))
    }

    /// Render the predicate as a SQL boolean expression
    ///
    /// Identifiers are double-quoted (dotted names become qualified
    /// identifiers) and values become positional parameters numbered from
    /// `first_param`. Returns the expression and the values to bind, in
    /// parameter order.
    pub fn to_sql(&self, first_param: usize) -> (String, Vec<FieldValue>) {
        let mut sql = String::new();
        let mut binds = Vec::new();
        let mut param = first_param;

        for (i, clause) in self.clauses().iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push('(');
            for (j, condition) in clause.iter().enumerate() {
                if j > 0 {
                    sql.push_str(" AND ");
                }
                let _ = write!(
                    sql,
                    "{} {} ${}",
                    quote_ident(&condition.field),
                    condition.operator,
                    param
                );
                param += 1;
                if let FilterValue::Single(value) = &condition.value {
                    binds.push(value.clone());
                }
            }
            sql.push(')');
        }

        (sql, binds)
    }
}

fn past_operator(direction: SortDirection) -> FilterOperator {
    match direction {
        SortDirection::Ascending => FilterOperator::GreaterThan,
        SortDirection::Descending => FilterOperator::LessThan,
    }
}

fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// A keyset window plus the sort key to continue from
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetWindow<R> {
    pub window: Window<R>,
    /// Sort key of the last returned row, present iff `window.has_more`
    pub next_key: Option<Vec<FieldValue>>,
}

/// Seek-based window fetching
#[derive(Debug, Clone, Copy, Default)]
pub struct KeysetPager;

impl KeysetPager {
    /// Fetch the window after `after` (or the first window when `None`)
    ///
    /// Issues exactly one range query for `limit + 1` rows.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamQueryFailed`] when the collaborator fails or a
    /// returned row lacks one of the sort fields.
    ///
    /// [`UpstreamQueryFailed`]: crate::PaginationError::UpstreamQueryFailed
    pub async fn fetch<R, S>(
        &self,
        source: &S,
        sort: &SortSpec,
        after: Option<Vec<FieldValue>>,
        limit: usize,
        filters: &[FilterCondition],
    ) -> Result<KeysetWindow<R>>
    where
        R: SortKey,
        S: PageSource<R> + ?Sized,
    {
        let seek = after.map(|values| SeekPredicate::new(sort, values));
        let position = match &seek {
            Some(seek) => Position::After(seek),
            None => Position::Start,
        };

        let rows = source
            .fetch(RangeQuery {
                sort,
                filters,
                position,
                limit: Window::<R>::fetch_size(limit),
            })
            .await?;

        tracing::debug!(
            returned = rows.len(),
            limit,
            seek = seek.is_some(),
            "Keyset range query returned"
        );

        let window = Window::from_lookahead(rows, limit);
        let next_key = match (window.has_more, window.last()) {
            (true, Some(last)) => Some(sort_key_of(last, sort, SourceOperation::Range)?),
            _ => None,
        };

        Ok(KeysetWindow { window, next_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, SourceErrorKind};
    use crate::PaginationError;
    use serde_json::{json, Value};

    fn spec() -> SortSpec {
        SortSpec::parse("a,b:desc", "id").unwrap()
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    fn numbered(n: i64) -> MemorySource<Value> {
        MemorySource::new((1..=n).map(|id| json!({"id": id})).collect())
    }

    #[test]
    fn test_clauses_shape() {
        let seek = SeekPredicate::new(
            &spec(),
            vec![FieldValue::Int(1), FieldValue::Int(2), FieldValue::Int(3)],
        );
        let clauses = seek.clauses();
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0][0].to_string(), "a > 1");
        assert_eq!(clauses[1][1].to_string(), "b < 2");
        assert_eq!(clauses[2].len(), 3);
        assert_eq!(clauses[2][2].to_string(), "id > 3");
    }

    #[test]
    fn test_to_sql() {
        let x = FieldValue::from("x");
        let seek = SeekPredicate::new(&spec(), vec![FieldValue::Int(1), x, FieldValue::Int(3)]);
        let (sql, binds) = seek.to_sql(1);
        assert_eq!(
            sql,
            "(\"a\" > $1) OR (\"a\" = $2 AND \"b\" < $3) OR (\"a\" = $4 AND \"b\" = $5 AND \"id\" > $6)"
        );
        assert_eq!(binds.len(), 6);
        assert_eq!(binds[2], FieldValue::from("x"));
    }

    #[test]
    fn test_to_sql_quotes_dotted_names() {
        let sort = SortSpec::parse("author.name", "id").unwrap();
        let seek = SeekPredicate::new(&sort, vec![FieldValue::from("ada"), FieldValue::Int(1)]);
        let (sql, _) = seek.to_sql(3);
        assert!(sql.starts_with("(\"author\".\"name\" > $3)"));
    }

    #[test]
    fn test_matches_respects_direction() {
        let seek = SeekPredicate::new(
            &spec(),
            vec![FieldValue::Int(5), FieldValue::Int(5), FieldValue::Int(5)],
        );
        assert!(seek.matches(&json!({"a": 6, "b": 0, "id": 0})));
        assert!(seek.matches(&json!({"a": 5, "b": 4, "id": 0})));
        assert!(seek.matches(&json!({"a": 5, "b": 5, "id": 6})));
        assert!(!seek.matches(&json!({"a": 5, "b": 5, "id": 5})));
        assert!(!seek.matches(&json!({"a": 5, "b": 6, "id": 9})));
        assert!(!seek.matches(&json!({"a": 4, "b": 0, "id": 9})));
        assert!(!seek.matches(&json!({"a": 6, "id": 9})));
    }

    #[tokio::test]
    async fn test_walk_partitions_collection() {
        let source = numbered(7);
        let sort = SortSpec::by_key("id").unwrap();
        let mut seen = Vec::new();
        let mut after = None;

        loop {
            let page = KeysetPager
                .fetch(&source, &sort, after, 3, &[])
                .await
                .unwrap();
            seen.extend(ids(&page.window.rows));
            assert_eq!(page.next_key.is_some(), page.window.has_more);
            match page.next_key {
                Some(key) => after = Some(key),
                None => break,
            }
        }

        assert_eq!(seen, (1..=7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_without_key() {
        let source = numbered(4);
        let sort = SortSpec::by_key("id").unwrap();
        let first = KeysetPager
            .fetch(&source, &sort, None, 2, &[])
            .await
            .unwrap();
        assert!(first.window.has_more);
        let second = KeysetPager
            .fetch(&source, &sort, first.next_key, 2, &[])
            .await
            .unwrap();
        assert_eq!(ids(&second.window.rows), vec![3, 4]);
        assert!(!second.window.has_more);
        assert!(second.next_key.is_none());
    }

    #[tokio::test]
    async fn test_malformed_row_is_upstream_error() {
        let source = MemorySource::new(vec![json!({"id": 1}), json!({"name": "no id"})]);
        let sort = SortSpec::by_key("id").unwrap();
        let err = KeysetPager
            .fetch(&source, &sort, None, 5, &[])
            .await
            .unwrap_err();
        match err {
            PaginationError::UpstreamQueryFailed(source) => {
                assert_eq!(source.kind, SourceErrorKind::MalformedRow);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
