//! Query parameter maps shared by request building and cache key derivation

use serde_json::Value;
use std::collections::BTreeMap;

/// An ordered list of named query parameters whose values may be null.
///
/// Null values are kept as given so callers can pass "unset" filters
/// explicitly; [`QueryParams::effective`] drops them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, Value)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Later values for the same name replace earlier ones.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a parameter that may be unset (stored as null).
    pub fn with_opt<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self.with(name, Value::Null),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-null parameters sorted by name.
    pub fn effective(&self) -> BTreeMap<&str, &Value> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    /// Non-null parameters rendered as URL query pairs, in insertion order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), render_value(v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_drops_nulls_and_sorts() {
        let params = QueryParams::new()
            .with("provider", "TTC")
            .with_opt::<&str>("country_code", None)
            .with("limit", 10);

        let effective = params.effective();
        let names: Vec<_> = effective.keys().copied().collect();
        assert_eq!(names, vec!["limit", "provider"]);
    }

    #[test]
    fn test_query_pairs_render_values() {
        let params = QueryParams::new()
            .with("is_official", true)
            .with("limit", 25)
            .with("entity_types", json!(["vp", "tu"]))
            .with("status", Value::Null);

        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("is_official".to_string(), "true".to_string()),
                ("limit".to_string(), "25".to_string()),
                ("entity_types".to_string(), "vp,tu".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_replaces_existing() {
        let params = QueryParams::new().with("limit", 10).with("limit", 20);
        assert_eq!(params.get("limit"), Some(&json!(20)));
        assert_eq!(params.to_query_pairs().len(), 1);
    }

    #[test]
    fn test_from_iterator() {
        let params: QueryParams = [("a", json!(1)), ("b", Value::Null)].into_iter().collect();
        assert_eq!(params.effective().len(), 1);
        assert!(!params.is_empty());
    }
}
