//! Match cache subsystem.
//!
//! # Data Flow
//! ```text
//! Navigation / preload needs loader data for MatchKey
//!     → store.rs get() (fresh entry? reuse)
//!     → store.rs get_or_create() (join in-flight load or spawn one)
//!     → loader task finishes → entry written, in-flight slot released
//!
//! Background:
//!     gc.rs ticker → store.rs sweep(committed keys) → expired entries evicted
//! ```
//!
//! # Design Decisions
//! - Entries and in-flight loads live in `DashMap`s shared via `Arc`
//! - Loads run on spawned tasks, so a superseded navigation never cancels a
//!   load that a preload (or a newer navigation) is also waiting on
//! - Invalidation marks entries instead of deleting them

pub mod gc;
pub mod store;

pub use gc::GcSweeper;
pub use store::{CacheEntry, EntrySeed, LoaderOutcome, MatchCache, SharedLoad};
