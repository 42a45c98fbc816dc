//! Path pattern subsystem.
//!
//! # Data Flow
//! ```text
//! Route path string ("/files/{-$lang}/$")
//!     → pattern.rs (compile into PathSegment list)
//!     → routing (concatenated into full-path segments per node)
//!
//! Navigation target ("../$postId", params)
//!     → resolve.rs (relative resolution, trailing-slash policy)
//!     → interpolate.rs (params substituted, percent-encoded via codec.rs)
//!     → concrete pathname
//! ```
//!
//! # Design Decisions
//! - Patterns are compiled once at tree construction; malformed patterns are
//!   rejected there, never at match time
//! - Static literals are stored decoded; encoding happens only when rendering
//! - Splat values keep `/` in both directions

use std::collections::BTreeMap;

pub mod codec;
pub mod interpolate;
pub mod pattern;
pub mod resolve;

pub use interpolate::{interpolate_path, InterpolatedPath};
pub use pattern::{compile, CompiledPattern, PathSegment, PatternError, SegmentKind, SPLAT_PARAM};
pub use resolve::{
    clean_path, join_paths, normalize_pathname, resolve_path, split_pathname, trim_path,
    trim_path_left, trim_path_right, TrailingSlash,
};

/// Path params keyed by name. Ordered so fingerprints are stable.
pub type Params = BTreeMap<String, String>;
