//! Router lifecycle events.

use serde::Serialize;

/// Broadcast to `Router::events` subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouterEvent {
    /// A navigation started.
    #[serde(rename_all = "camelCase")]
    BeforeNavigate { from_href: String, to_href: String },
    /// Matches are about to load.
    #[serde(rename_all = "camelCase")]
    BeforeLoad { from_href: String, to_href: String },
    /// A navigation committed.
    #[serde(rename_all = "camelCase")]
    Resolved {
        from_href: String,
        to_href: String,
        path_changed: bool,
        status_code: u16,
    },
}

impl RouterEvent {
    pub fn to_href(&self) -> &str {
        match self {
            RouterEvent::BeforeNavigate { to_href, .. }
            | RouterEvent::BeforeLoad { to_href, .. }
            | RouterEvent::Resolved { to_href, .. } => to_href,
        }
    }
}
