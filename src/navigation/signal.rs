//! Control-flow outcomes of route callbacks.
//!
//! Callbacks return `RouteResult<T>`: `Ok`, or one of a redirect, a not-found
//! or an error. Redirect and not-found are control flow, not failures.

use std::sync::Arc;

use serde_json::Value;

use crate::navigation::error::SharedError;
use crate::navigation::location::NavigateOptions;

/// Boxed error accepted from user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a route callback.
pub type RouteResult<T> = Result<T, RouteSignal>;

/// Default status attached to redirects.
pub const DEFAULT_REDIRECT_STATUS: u16 = 307;

/// Request to navigate somewhere else instead.
#[derive(Debug, Clone)]
pub struct Redirect {
    pub options: NavigateOptions,
    pub status: u16,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self::with_options(NavigateOptions::to(path))
    }

    pub fn with_options(options: NavigateOptions) -> Self {
        Self {
            options,
            status: DEFAULT_REDIRECT_STATUS,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Signal that the requested resource does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotFound {
    /// Route that should handle the not-found; defaults to the signaler.
    pub route_id: Option<String>,
    /// Payload handed to whoever renders the not-found.
    pub data: Option<Value>,
    /// Raised by the matcher rather than a callback.
    pub global: bool,
}

impl NotFound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Non-`Ok` callback outcome.
#[derive(Debug, Clone)]
pub enum RouteSignal {
    Redirect(Redirect),
    NotFound(NotFound),
    Error(SharedError),
}

impl RouteSignal {
    pub fn redirect(to: impl Into<String>) -> Self {
        RouteSignal::Redirect(Redirect::to(to))
    }

    pub fn not_found() -> Self {
        RouteSignal::NotFound(NotFound::new())
    }

    pub fn error(err: impl Into<BoxError>) -> Self {
        RouteSignal::Error(Arc::from(err.into()))
    }
}

impl From<Redirect> for RouteSignal {
    fn from(redirect: Redirect) -> Self {
        RouteSignal::Redirect(redirect)
    }
}

impl From<NotFound> for RouteSignal {
    fn from(not_found: NotFound) -> Self {
        RouteSignal::NotFound(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        match RouteSignal::redirect("/login") {
            RouteSignal::Redirect(r) => {
                assert_eq!(r.options.to.as_deref(), Some("/login"));
                assert_eq!(r.status, 307);
            }
            other => panic!("unexpected {other:?}"),
        }

        let signal: RouteSignal = NotFound::new().route("/posts").into();
        assert!(matches!(signal, RouteSignal::NotFound(NotFound { route_id: Some(ref id), .. }) if id == "/posts"));

        match RouteSignal::error("boom") {
            RouteSignal::Error(e) => assert_eq!(e.to_string(), "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
