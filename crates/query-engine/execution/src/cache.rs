//! Results of the statements already run for one request.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

/// The rendered statement and its parameters serialized as a JSON object.
type CacheKey = (String, String);

/// Owned by a single request. Any write drops every entry.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: HashMap<CacheKey, Vec<Value>>,
}

impl RequestCache {
    pub fn new() -> RequestCache {
        RequestCache::default()
    }

    pub fn get(&self, statement: &str, parameters: &IndexMap<String, Value>) -> Option<&Vec<Value>> {
        self.entries.get(&cache_key(statement, parameters))
    }

    pub fn insert(&mut self, statement: &str, parameters: &IndexMap<String, Value>, rows: Vec<Value>) {
        self.entries.insert(cache_key(statement, parameters), rows);
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(statement: &str, parameters: &IndexMap<String, Value>) -> CacheKey {
    let parameters: serde_json::Map<String, Value> = parameters
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    (statement.to_string(), Value::Object(parameters).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> IndexMap<String, Value> {
        IndexMap::from([("param0".to_string(), value)])
    }

    #[test]
    fn parameters_are_part_of_the_key() {
        let mut cache = RequestCache::new();
        cache.insert("RETURN $param0 AS this", &params(json!(1)), vec![json!(1)]);
        assert_eq!(
            cache.get("RETURN $param0 AS this", &params(json!(1))),
            Some(&vec![json!(1)])
        );
        assert_eq!(cache.get("RETURN $param0 AS this", &params(json!(2))), None);
    }

    #[test]
    fn entries_are_told_apart_by_their_full_text() {
        let mut cache = RequestCache::new();
        cache.insert("RETURN 1 AS this", &IndexMap::new(), vec![json!(1)]);
        cache.insert("RETURN 2 AS this", &IndexMap::new(), vec![json!(2)]);
        let nested = IndexMap::from([("param0".to_string(), json!({ "a": "b" }))]);
        cache.insert("RETURN $param0 AS this", &nested, vec![json!(3)]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("RETURN 1 AS this", &IndexMap::new()), Some(&vec![json!(1)]));
        assert_eq!(cache.get("RETURN 2 AS this", &IndexMap::new()), Some(&vec![json!(2)]));
        assert_eq!(cache.get("RETURN $param0 AS this", &params(json!("{\"a\":\"b\"}"))), None);
        assert_eq!(
            cache_key("RETURN $param0 AS this", &nested),
            (
                "RETURN $param0 AS this".to_string(),
                r#"{"param0":{"a":"b"}}"#.to_string()
            )
        );
    }

    #[test]
    fn invalidate_drops_everything() {
        let mut cache = RequestCache::new();
        cache.insert("a", &IndexMap::new(), vec![]);
        cache.insert("b", &IndexMap::new(), vec![]);
        cache.invalidate();
        assert!(cache.is_empty());
    }
}
