//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, masks and route tree compiled)
//!     → RouterConfig (validated, immutable)
//!     → RouterBuilder::config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a router is built from one snapshot
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Callbacks cannot be expressed in TOML; `RouteSpec` covers the static
//!   subset (paths, cache timings, search retention, fixed loader data)

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, LogFormat, MatchingConfig, NavigationConfig, ObservabilityConfig, RouteMaskConfig, RouteSpec,
    RouterConfig,
};
pub use validation::{validate_config, ConfigValidationError};
