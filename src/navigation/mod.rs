//! Navigation subsystem.
//!
//! # Data Flow
//! ```text
//! Router::navigate(NavigateOptions)
//!     → router.rs (resolve `to` against `from`, params, search middlewares)
//!     → history push/replace (masked if a mask applies)
//!     → router.rs (generation += 1, abort previous, status = pending)
//!     → loader.rs (match, then per route outer → inner:
//!                  context → before_load → loader via the cache)
//!         ├─ redirect  → history replace, run again (bounded)
//!         ├─ not found → truncate at the handling route, 404
//!         └─ error     → mark route and descendants, 500
//!     → state.rs (commit if still current, notify subscribers)
//! ```
//!
//! # Design Decisions
//! - Last navigation wins; writes from older generations are dropped
//! - Subscribers are notified at start and at commit, never per loader
//! - Callbacks get an abort signal; cancellation is cooperative
//! - Lifecycle errors stay on the failing branch; ancestors keep results

pub mod abort;
pub mod error;
pub mod events;
pub mod history;
mod loader;
pub mod location;
pub mod matches;
pub mod router;
pub mod signal;
pub mod state;

pub use abort::{AbortController, AbortSignal};
pub use error::{BuildError, NavigationError, Phase, RouteError};
pub use events::RouterEvent;
pub use history::{History, HistoryAction, HistoryEvent, HistoryLocation, MemoryHistory};
pub use location::{HistoryState, Location, NavigateOptions, ParamsUpdate, SearchUpdate};
pub use matches::{MatchCause, MatchKey, MatchStatus, RouteMatch};
pub use router::{NavigationOutcome, Router, RouterBuilder};
pub use signal::{BoxError, NotFound, Redirect, RouteResult, RouteSignal};
pub use state::{RouterState, RouterStatus, StateStore};
