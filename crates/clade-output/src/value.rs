//! Reading cell values out of analysis results.

use serde_json::Value;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    /// Numeric value kept in its JSON rendering.
    Number(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text(text) | Self::Number(text) => text,
        }
    }

    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::Number(number)) => Self::Number(number.to_string()),
            Some(other) => Self::Text(render(other)),
        }
    }
}

/// Look up a dotted path such as `qc.missingData.score`.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(path) {
        return Some(value);
    }
    path.split('.')
        .try_fold(root, |current, segment| current.get(segment))
}

/// Render a JSON value as cell text.
///
/// Arrays become comma-separated lists; objects are written as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) | Value::Array(_) => item.to_string(),
                scalar => render(scalar),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_descend_objects() {
        let value = json!({"qc": {"missingData": {"score": 1.5}}, "a.b": 2});
        assert_eq!(lookup_path(&value, "qc.missingData.score"), Some(&json!(1.5)));
        assert_eq!(lookup_path(&value, "a.b"), Some(&json!(2)));
        assert_eq!(lookup_path(&value, "qc.absent"), None);
    }

    #[test]
    fn arrays_are_comma_joined() {
        assert_eq!(render(&json!(["C241T", "A23403G"])), "C241T,A23403G");
        assert_eq!(render(&json!([{"a": 1}])), r#"{"a":1}"#);
        assert_eq!(render(&json!(true)), "true");
    }

    #[test]
    fn numbers_are_typed_cells() {
        assert_eq!(Cell::from_json(Some(&json!(12))), Cell::Number("12".to_string()));
        assert_eq!(Cell::from_json(Some(&Value::Null)), Cell::Empty);
        assert_eq!(Cell::from_json(None).as_str(), "");
    }
}
