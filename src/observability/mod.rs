//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Navigation, cache and history events produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Consumers:
//!     → stderr via tracing-subscriber
//!     → whatever recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured fields (`route_id`, `href`, `generation`) on every event
//! - No recorder is installed here; without one, metric calls are no-ops
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;
