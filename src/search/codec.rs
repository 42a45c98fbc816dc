//! Query string encoding.
//!
//! # Responsibilities
//! - Parse `?a=1&b=%22x%22` into a JSON map, reading each value as JSON when
//!   it parses and as a plain string otherwise
//! - Collect repeated keys into arrays
//! - Serialize back, JSON-encoding objects, arrays and ambiguous strings

use std::collections::HashSet;

use serde_json::Value;
use url::form_urlencoded;

use crate::search::Search;

/// Parse a query string, with or without the leading `?`.
pub fn parse_search(query: &str) -> Search {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut search = Search::new();
    // keys whose value is an array collected from repeats
    let mut repeated = HashSet::new();
    for (key, raw) in form_urlencoded::parse(query.as_bytes()) {
        let value = parse_value(&raw);
        match search.get_mut(key.as_ref()) {
            Some(Value::Array(items)) if repeated.contains(key.as_ref()) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
                repeated.insert(key.into_owned());
            }
            None => {
                search.insert(key.into_owned(), value);
            }
        }
    }
    search
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Serialize a search map. Returns an empty string for an empty map and
/// `?...` otherwise.
pub fn stringify_search(search: &Search) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in search {
        serializer.append_pair(key, &stringify_value(value));
    }
    let encoded = serializer.finish();
    if encoded.is_empty() {
        encoded
    } else {
        format!("?{encoded}")
    }
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) if serde_json::from_str::<Value>(s).is_ok() => value.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reads_json_values() {
        let search = parse_search("?page=2&draft=true&q=hello%20world&filter=%7B%22tag%22%3A%22rust%22%7D");
        assert_eq!(search["page"], json!(2));
        assert_eq!(search["draft"], json!(true));
        assert_eq!(search["q"], json!("hello world"));
        assert_eq!(search["filter"], json!({"tag": "rust"}));
    }

    #[test]
    fn test_repeated_keys_collect() {
        let search = parse_search("tag=a&tag=b&tag=c");
        assert_eq!(search["tag"], json!(["a", "b", "c"]));

        let search = parse_search("a=%5B1%5D&a=2&a=%5B3%5D");
        assert_eq!(search["a"], json!([[1], 2, [3]]));
    }

    #[test]
    fn test_stringify_quotes_ambiguous_strings() {
        let mut search = Search::new();
        search.insert("id".into(), json!("123"));
        search.insert("n".into(), json!(123));
        search.insert("name".into(), json!("ada"));
        let s = stringify_search(&search);
        assert_eq!(s, "?id=%22123%22&n=123&name=ada");
        assert_eq!(parse_search(&s), search);
    }

    #[test]
    fn test_empty() {
        assert_eq!(stringify_search(&Search::new()), "");
        assert!(parse_search("").is_empty());
        assert!(parse_search("?").is_empty());
    }
}
