//! Search middlewares.
//!
//! A middleware wraps the computation of the next search: it receives the
//! current search plus `next` and returns the search to use. Middlewares run
//! root route first, and the innermost `next` applies the caller's update.

use std::sync::Arc;

use crate::search::Search;

/// `(search, next) -> search`.
pub type SearchMiddleware = Arc<dyn Fn(Search, &dyn Fn(Search) -> Search) -> Search + Send + Sync>;

/// Run `middlewares` around `resolve`, starting from `current`.
pub fn apply_middlewares(
    middlewares: &[SearchMiddleware],
    current: Search,
    resolve: &dyn Fn(Search) -> Search,
) -> Search {
    match middlewares.split_first() {
        None => resolve(current),
        Some((first, rest)) => first(current, &|search| apply_middlewares(rest, search, resolve)),
    }
}

/// Which keys a built-in middleware acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKeys {
    All,
    Keys(Vec<String>),
}

/// Carry keys of the current search over to the next one unless the update
/// set them.
pub fn retain_search_params(keys: SearchKeys) -> SearchMiddleware {
    Arc::new(move |search: Search, next: &dyn Fn(Search) -> Search| {
        let mut result = next(search.clone());
        match &keys {
            SearchKeys::All => {
                for (key, value) in search {
                    result.entry(key).or_insert(value);
                }
            }
            SearchKeys::Keys(keys) => {
                for key in keys {
                    if !result.contains_key(key) {
                        if let Some(value) = search.get(key) {
                            result.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        result
    })
}

/// What `strip_search_params` removes.
#[derive(Debug, Clone, PartialEq)]
pub enum StripSearch {
    /// Drop everything.
    All,
    /// Drop the named keys.
    Keys(Vec<String>),
    /// Drop keys whose value equals the given default.
    Defaults(Search),
}

/// Remove keys from the next search, typically values equal to a default.
pub fn strip_search_params(input: StripSearch) -> SearchMiddleware {
    Arc::new(move |search: Search, next: &dyn Fn(Search) -> Search| {
        if input == StripSearch::All {
            return Search::new();
        }
        let mut result = next(search);
        match &input {
            StripSearch::All => {}
            StripSearch::Keys(keys) => {
                for key in keys {
                    result.remove(key);
                }
            }
            StripSearch::Defaults(defaults) => {
                for (key, default) in defaults {
                    if result.get(key) == Some(default) {
                        result.remove(key);
                    }
                }
            }
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search(value: serde_json::Value) -> Search {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Search::new(),
        }
    }

    #[test]
    fn test_no_middlewares_applies_update() {
        let out = apply_middlewares(&[], search(json!({"a": 1})), &|_| search(json!({"b": 2})));
        assert_eq!(out, search(json!({"b": 2})));
    }

    #[test]
    fn test_retain_keeps_listed_keys() {
        let mw = retain_search_params(SearchKeys::Keys(vec!["theme".into()]));
        let out = apply_middlewares(
            &[mw],
            search(json!({"theme": "dark", "page": 3})),
            &|_| search(json!({"q": "x"})),
        );
        assert_eq!(out, search(json!({"theme": "dark", "q": "x"})));
    }

    #[test]
    fn test_retain_does_not_override_update() {
        let mw = retain_search_params(SearchKeys::All);
        let out = apply_middlewares(&[mw], search(json!({"page": 3})), &|_| search(json!({"page": 4})));
        assert_eq!(out, search(json!({"page": 4})));
    }

    #[test]
    fn test_strip_defaults_and_keys() {
        let strip = strip_search_params(StripSearch::Defaults(search(json!({"page": 1, "sort": "asc"}))));
        let out = apply_middlewares(&[strip], Search::new(), &|_| search(json!({"page": 1, "sort": "desc"})));
        assert_eq!(out, search(json!({"sort": "desc"})));

        let strip = strip_search_params(StripSearch::Keys(vec!["debug".into()]));
        let out = apply_middlewares(&[strip], Search::new(), &|_| search(json!({"debug": true, "q": 1})));
        assert_eq!(out, search(json!({"q": 1})));

        let strip = strip_search_params(StripSearch::All);
        assert!(apply_middlewares(&[strip], Search::new(), &|_| search(json!({"q": 1}))).is_empty());
    }

    #[test]
    fn test_outer_middleware_sees_inner_result() {
        let retain = retain_search_params(SearchKeys::All);
        let strip = strip_search_params(StripSearch::Keys(vec!["page".into()]));
        let out = apply_middlewares(
            &[retain, strip],
            search(json!({"page": 2, "theme": "dark"})),
            &|s| s,
        );
        // strip runs inside retain, so retain puts `page` back
        assert_eq!(out, search(json!({"page": 2, "theme": "dark"})));
    }
}
