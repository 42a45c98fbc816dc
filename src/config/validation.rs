//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile mask patterns and the declarative route tree
//! - Validate value ranges (redirect limit, GC interval)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ConfigValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::path::PatternError;
use crate::routing::tree::{RouteTree, TreeError, TreeOptions};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("navigation.max_redirects must be greater than 0")]
    ZeroRedirectLimit,

    #[error("cache.gc_interval_ms must be greater than 0")]
    ZeroGcInterval,

    #[error("matching.path_params_allowed_characters contains `{0}`, which is never encoded")]
    RedundantAllowedCharacter(char),

    #[error("route_masks[{index}]: {source}")]
    Mask {
        index: usize,
        #[source]
        source: PatternError,
    },

    #[error("routes: {0}")]
    Routes(#[from] TreeError),
}

/// Check `config`, reporting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ConfigValidationError>> {
    let mut errors = Vec::new();

    if config.navigation.max_redirects == 0 {
        errors.push(ConfigValidationError::ZeroRedirectLimit);
    }
    if config.cache.gc_interval_ms == 0 {
        errors.push(ConfigValidationError::ZeroGcInterval);
    }
    for &ch in &config.matching.path_params_allowed_characters {
        if ch.is_ascii_alphanumeric() {
            errors.push(ConfigValidationError::RedundantAllowedCharacter(ch));
        }
    }
    for (index, mask) in config.route_masks.iter().enumerate() {
        if let Err(source) = mask.to_mask() {
            errors.push(ConfigValidationError::Mask { index, source });
        }
    }
    if let Some(routes) = &config.routes {
        let opts = TreeOptions {
            case_sensitive: config.matching.case_sensitive,
        };
        if let Err(err) = RouteTree::build_with(routes.to_root(), opts) {
            errors.push(err.into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
