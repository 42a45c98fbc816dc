//! Per-route match records.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::navigation::error::RouteError;
use crate::navigation::signal::NotFound;
use crate::path::Params;
use crate::routing::Context;
use crate::search::Search;

/// Why a match is being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchCause {
    /// Not part of the previously committed list.
    Enter,
    /// Same route, params and deps as a committed match.
    Stay,
    Preload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStatus {
    Pending,
    Resolved,
    Error,
    Redirected,
    NotFound,
}

/// Cache identity of a match: route, rendered params, loader deps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub route_id: String,
    pub params_fingerprint: String,
    pub deps_fingerprint: String,
}

impl MatchKey {
    pub fn new(route_id: impl Into<String>, pathname: impl Into<String>, deps: &Value) -> Self {
        Self {
            route_id: route_id.into(),
            params_fingerprint: pathname.into(),
            deps_fingerprint: deps.to_string(),
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.route_id, self.params_fingerprint, self.deps_fingerprint)
    }
}

/// State of one route within a navigation.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub key: MatchKey,
    pub route_id: String,
    /// The route's own path rendered with its params.
    pub pathname: String,
    pub params: Params,
    pub search: Search,
    /// Context after this match's contributions, inherited by descendants.
    pub context: Context,
    /// What this route's `context` callback contributed.
    pub route_context: Context,
    pub loader_deps: Value,
    pub loader_data: Option<Value>,
    pub status: MatchStatus,
    pub error: Option<RouteError>,
    pub not_found: Option<NotFound>,
    pub cause: MatchCause,
    pub preload: bool,
    /// Navigation that produced this record.
    pub generation: u64,
    pub updated_at: Option<Instant>,
}

impl RouteMatch {
    /// JSON view for logs and the CLI.
    pub fn summary(&self) -> Value {
        json!({
            "routeId": self.route_id,
            "pathname": self.pathname,
            "params": self.params,
            "search": self.search,
            "status": self.status,
            "cause": self.cause,
            "loaderData": self.loader_data,
            "error": self.error.as_ref().map(ToString::to_string),
            "notFound": self.not_found.as_ref().map(|nf| json!({"routeId": nf.route_id, "data": nf.data, "global": nf.global})),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_changes_with_deps() {
        let a = MatchKey::new("/posts", "/posts", &json!({"page": 1}));
        let b = MatchKey::new("/posts", "/posts", &json!({"page": 2}));
        let c = MatchKey::new("/posts", "/posts", &json!({"page": 1}));
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.to_string(), "/posts/posts{\"page\":1}");
    }
}
