use anyhow::{Context, Result};
use seekpage::{FieldValue, FilterCondition};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a JSON array of rows
pub fn load_dataset(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    match serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))?
    {
        Value::Array(rows) => Ok(rows),
        _ => anyhow::bail!(
            "Dataset must be a JSON array of objects: {}",
            path.display()
        ),
    }
}

/// Parse a filter expression such as `status=active`, `age>=18` or `deleted_at=null`
///
/// The right-hand side is read as JSON when it parses as JSON and as a bare
/// string otherwise.
pub fn parse_filter(expr: &str) -> Result<FilterCondition> {
    // Two-character operators first so `>=` is not read as `>`.
    const OPERATORS: [&str; 6] = [">=", "<=", "!=", "=", ">", "<"];

    let (position, operator) = OPERATORS
        .iter()
        .filter_map(|op| expr.find(op).map(|pos| (pos, *op)))
        .min_by_key(|(pos, op)| (*pos, std::cmp::Reverse(op.len())))
        .with_context(|| format!("Filter '{expr}' has no operator (use =, !=, <, <=, >, >=)"))?;

    let field = expr[..position].trim();
    let raw = expr[position + operator.len()..].trim();
    if field.is_empty() {
        anyhow::bail!("Filter '{}' has no field name", expr);
    }

    let value = parse_value(raw);
    let condition = match (operator, value.is_null()) {
        ("=", true) => FilterCondition::is_null(field),
        ("!=", true) => FilterCondition::is_not_null(field),
        ("=", false) => FilterCondition::eq(field, value),
        ("!=", false) => FilterCondition::ne(field, value),
        (">", _) => FilterCondition::gt(field, value),
        (">=", _) => FilterCondition::gte(field, value),
        ("<", _) => FilterCondition::lt(field, value),
        _ => FilterCondition::lte(field, value),
    };
    Ok(condition)
}

fn parse_value(raw: &str) -> FieldValue {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => FieldValue::from(&value),
        Err(_) => FieldValue::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seekpage::FilterOperator;
    use std::io::Write;

    #[test]
    fn test_parse_filter_operators() {
        let filter = parse_filter("age>=18").unwrap();
        assert_eq!(filter.field, "age");
        assert_eq!(filter.operator, FilterOperator::GreaterThanOrEqual);
        assert_eq!(filter.to_string(), "age >= 18");

        assert_eq!(
            parse_filter("age < 5").unwrap().operator,
            FilterOperator::LessThan
        );
        assert_eq!(
            parse_filter("status!=gone").unwrap().to_string(),
            "status != \"gone\""
        );
    }

    #[test]
    fn test_parse_filter_null() {
        assert_eq!(
            parse_filter("deleted_at=null").unwrap().operator,
            FilterOperator::IsNull
        );
        assert_eq!(
            parse_filter("deleted_at!=null").unwrap().operator,
            FilterOperator::IsNotNull
        );
    }

    #[test]
    fn test_parse_filter_errors() {
        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=active").is_err());
    }

    #[test]
    fn test_load_dataset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1}}, {{"id": 2}}]"#).unwrap();
        assert_eq!(load_dataset(file.path()).unwrap().len(), 2);

        let mut object = tempfile::NamedTempFile::new().unwrap();
        write!(object, r#"{{"id": 1}}"#).unwrap();
        assert!(load_dataset(object.path()).is_err());
    }
}
