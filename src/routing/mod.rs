//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at router construction):
//!     RouteDef (nested)
//!     → tree.rs (ids, full paths, compiled segments, arena of RouteNode)
//!     → rank.rs (total order over routable nodes)
//!     → immutable RouteTree
//!
//! Pathname lookup:
//!     "/posts/42/edit"
//!     → matcher.rs (first ranked full match, backtracking over optionals)
//!     → PathMatch::Found(chain root → leaf) or PathMatch::NotFound(scope)
//! ```
//!
//! # Design Decisions
//! - Routes compiled and ranked once, immutable afterwards
//! - Deterministic: same pathname always yields the same match list
//! - First match wins; ranking decides static > param > optional > splat
//! - Lazily attached options are the only part filled in after build

pub mod matcher;
mod rank;
pub mod route;
pub mod tree;

pub use matcher::{match_segments, MatchList, MatchedRoute, Matcher, NotFoundMode, PathMatch};
pub use route::{
    BeforeLoadArgs, Context, ContextArgs, LoaderArgs, RouteDef, RouteOptions, ShouldReloadArgs,
};
pub use tree::{RouteNode, RouteTree, TreeError, TreeOptions, ROOT_ROUTE_ID};
