//! Navigation and per-match error types.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigValidationError;
use crate::path::PatternError;
use crate::routing::TreeError;

/// Error shared between clones of a match.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Lifecycle phase a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Context,
    BeforeLoad,
    Loader,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Context => write!(f, "context"),
            Phase::BeforeLoad => write!(f, "before_load"),
            Phase::Loader => write!(f, "loader"),
        }
    }
}

/// Failure recorded on a single match. Halts only that branch of the list.
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    #[error("invalid search for route `{route_id}`: {error}")]
    InvalidSearch { route_id: String, error: SharedError },

    #[error("invalid params for route `{route_id}`: {error}")]
    InvalidParams { route_id: String, error: SharedError },

    #[error("{phase} failed for route `{route_id}`: {error}")]
    Lifecycle {
        route_id: String,
        phase: Phase,
        error: SharedError,
    },

    #[error("route `{route_id}` skipped because `{ancestor}` failed")]
    AncestorFailed { route_id: String, ancestor: String },
}

impl RouteError {
    pub fn route_id(&self) -> &str {
        match self {
            RouteError::InvalidSearch { route_id, .. }
            | RouteError::InvalidParams { route_id, .. }
            | RouteError::Lifecycle { route_id, .. }
            | RouteError::AncestorFailed { route_id, .. } => route_id,
        }
    }
}

/// Errors returned to callers of `Router::navigate` and friends.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("exceeded {limit} redirects while navigating to `{href}`")]
    RedirectLimit { limit: u32, href: String },

    #[error("missing params {missing:?} for path `{path}`")]
    MissingParams { path: String, missing: Vec<String> },

    #[error("unknown route `{0}`")]
    UnknownRoute(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Errors raised while assembling a router.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("invalid route mask: {0}")]
    Mask(#[from] PatternError),

    #[error("invalid config: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Config(Vec<ConfigValidationError>),
}
