//! Per-route search validation.

use std::sync::Arc;

use crate::navigation::signal::BoxError;
use crate::search::Search;

/// Validates and normalizes the search visible to a route.
pub type SearchValidator = Arc<dyn Fn(&Search) -> Result<Search, BoxError> + Send + Sync>;

/// Apply a route's validator to the search accumulated from its ancestors.
///
/// The result is the accumulated search with the validated keys laid over it,
/// which is what the route and its descendants see.
pub fn validate_route_search(validator: Option<&SearchValidator>, accumulated: &Search) -> Result<Search, BoxError> {
    let Some(validator) = validator else {
        return Ok(accumulated.clone());
    };
    let validated = validator(accumulated)?;
    let mut merged = accumulated.clone();
    merged.extend(validated);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn page_validator() -> SearchValidator {
        Arc::new(|search: &Search| -> Result<Search, BoxError> {
            let page = match search.get("page") {
                None => 1,
                Some(Value::Number(n)) => n.as_u64().ok_or("page must be a positive integer")?,
                Some(_) => return Err("page must be a number".into()),
            };
            let mut out = Search::new();
            out.insert("page".into(), json!(page));
            Ok(out)
        })
    }

    #[test]
    fn test_no_validator_passes_through() {
        let mut search = Search::new();
        search.insert("q".into(), json!("x"));
        assert_eq!(validate_route_search(None, &search).unwrap(), search);
    }

    #[test]
    fn test_validated_keys_overlay() {
        let mut search = Search::new();
        search.insert("q".into(), json!("x"));
        let validator = page_validator();
        let out = validate_route_search(Some(&validator), &search).unwrap();
        assert_eq!(out["page"], json!(1));
        assert_eq!(out["q"], json!("x"));
    }

    #[test]
    fn test_failure_surfaces() {
        let mut search = Search::new();
        search.insert("page".into(), json!("abc"));
        let validator = page_validator();
        let err = validate_route_search(Some(&validator), &search).unwrap_err();
        assert_eq!(err.to_string(), "page must be a number");
    }
}
