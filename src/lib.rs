//! Route Navigator Library
//!
//! A client-side navigation engine: a ranked route tree, a path matcher and
//! a cancellable, cache-aware data-loading state machine.

pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod masking;
pub mod navigation;
pub mod observability;
pub mod path;
pub mod routing;
pub mod search;

pub use config::schema::RouterConfig;
pub use lifecycle::Shutdown;
pub use navigation::{NavigateOptions, NavigationError, NavigationOutcome, Router, RouterBuilder, RouterState};
pub use routing::{RouteDef, RouteTree};
