//! Search (query string) subsystem.
//!
//! # Data Flow
//! ```text
//! "?page=2&filter=%7B%22tag%22%3A%22rust%22%7D"
//!     → codec.rs (form-decoding, JSON per value)
//!     → Search map
//!     → validate.rs (per-route validators, ancestors first, shallow merge)
//!     → per-match search slices
//!
//! Building a location:
//!     previous Search
//!     → middleware.rs (route middlewares wrapped around the requested update)
//!     → codec.rs (stringify)
//!     → "?..." search string
//! ```
//!
//! # Design Decisions
//! - Search values are `serde_json::Value`; strings that would read back as
//!   another JSON type are quoted so the codec round-trips
//! - Keys are kept sorted, so equal searches serialize identically

pub mod codec;
pub mod middleware;
pub mod validate;

pub use codec::{parse_search, stringify_search};
pub use middleware::{
    apply_middlewares, retain_search_params, strip_search_params, SearchKeys, SearchMiddleware,
    StripSearch,
};
pub use validate::{validate_route_search, SearchValidator};

/// Parsed query string.
pub type Search = serde_json::Map<String, serde_json::Value>;
