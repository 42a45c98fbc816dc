//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::masking::RouteMask;
use crate::navigation::signal::RouteSignal;
use crate::path::{PatternError, TrailingSlash};
use crate::routing::matcher::NotFoundMode;
use crate::routing::route::{Context, LoaderArgs, RouteDef};
use crate::search::{retain_search_params, strip_search_params, SearchKeys, StripSearch};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Pathname matching and rendering.
    pub matching: MatchingConfig,

    /// Navigation limits and defaults.
    pub navigation: NavigationConfig,

    /// Loader cache freshness and garbage collection.
    pub cache: CacheConfig,

    /// Masks applied to navigations, first match wins.
    pub route_masks: Vec<RouteMaskConfig>,

    /// Declarative route tree, used by the CLI.
    pub routes: Option<RouteSpec>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Matching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Trailing slash policy for rendered pathnames.
    pub trailing_slash: TrailingSlash,

    /// Default case sensitivity for routes that do not set one.
    pub case_sensitive: bool,

    /// Where unmatched pathnames are scoped.
    pub not_found_mode: NotFoundMode,

    /// Characters left unencoded in rendered params (e.g. `@`).
    pub path_params_allowed_characters: Vec<char>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            trailing_slash: TrailingSlash::Never,
            case_sensitive: false,
            not_found_mode: NotFoundMode::Fuzzy,
            path_params_allowed_characters: Vec::new(),
        }
    }
}

/// Navigation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Redirects followed by one navigation before it fails.
    pub max_redirects: u32,

    /// Default for masks that do not say whether they unmask on reload.
    pub unmask_on_reload: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            unmask_on_reload: false,
        }
    }
}

/// Cache configuration. Route options override these per route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which navigation data is reloaded.
    pub stale_time_ms: u64,

    /// Age after which preloaded data is reloaded.
    pub preload_stale_time_ms: u64,

    /// How long unused navigation data is kept.
    pub gc_time_ms: u64,

    /// How long unused preloaded data is kept.
    pub preload_gc_time_ms: u64,

    /// Interval between garbage collection sweeps.
    pub gc_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 0,
            preload_stale_time_ms: 30_000,
            gc_time_ms: 1_800_000,
            preload_gc_time_ms: 1_800_000,
            gc_interval_ms: 60_000,
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn preload_stale_time(&self) -> Duration {
        Duration::from_millis(self.preload_stale_time_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_millis(self.gc_time_ms)
    }

    pub fn preload_gc_time(&self) -> Duration {
        Duration::from_millis(self.preload_gc_time_ms)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }
}

/// A route mask.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteMaskConfig {
    /// Pattern the real location must match.
    pub from: String,

    /// Pattern rendered as the displayed location.
    pub to: String,

    #[serde(default)]
    pub keep_search: bool,

    #[serde(default)]
    pub keep_hash: bool,

    #[serde(default)]
    pub unmask_on_reload: Option<bool>,
}

impl RouteMaskConfig {
    pub fn to_mask(&self) -> Result<RouteMask, PatternError> {
        let mut mask = RouteMask::new(&self.from, &self.to)?;
        mask.keep_search = self.keep_search;
        mask.keep_hash = self.keep_hash;
        mask.unmask_on_reload = self.unmask_on_reload;
        Ok(mask)
    }
}

/// Declarative route. The top-level spec is the root route; its `path` is
/// ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteSpec {
    /// Explicit id; required for pathless routes.
    pub id: Option<String>,

    /// Path relative to the parent. `None` makes a pathless layout, `"/"` an
    /// index route.
    pub path: Option<String>,

    pub case_sensitive: Option<bool>,

    /// Render not-found for unmatched descendants here.
    pub handles_not_found: bool,

    pub stale_time_ms: Option<u64>,

    pub preload_stale_time_ms: Option<u64>,

    pub gc_time_ms: Option<u64>,

    /// Set to `false` to skip the loader during preloads.
    pub preload: Option<bool>,

    /// Search keys carried over from the current location; `"*"` keeps all.
    pub retain_search: Vec<String>,

    /// Search keys dropped from generated locations.
    pub strip_search: Vec<String>,

    /// Static loader result.
    pub loader_data: Option<Value>,

    /// Redirect target raised from `before_load`.
    pub redirect: Option<String>,

    pub children: Vec<RouteSpec>,
}

impl RouteSpec {
    /// Convert into a root `RouteDef`.
    pub fn to_root(&self) -> RouteDef {
        let mut root = self.apply(RouteDef::root());
        if let Some(id) = &self.id {
            root = root.id(id.clone());
        }
        root
    }

    fn to_route_def(&self) -> RouteDef {
        let def = match &self.path {
            Some(path) => {
                let def = RouteDef::new(path.clone());
                match &self.id {
                    Some(id) => def.id(id.clone()),
                    None => def,
                }
            }
            None => RouteDef::pathless(self.id.clone().unwrap_or_default()),
        };
        self.apply(def)
    }

    fn apply(&self, mut def: RouteDef) -> RouteDef {
        if let Some(case_sensitive) = self.case_sensitive {
            def = def.case_sensitive(case_sensitive);
        }
        if self.handles_not_found {
            def = def.handles_not_found();
        }
        if let Some(ms) = self.stale_time_ms {
            def = def.stale_time(Duration::from_millis(ms));
        }
        if let Some(ms) = self.preload_stale_time_ms {
            def = def.preload_stale_time(Duration::from_millis(ms));
        }
        if let Some(ms) = self.gc_time_ms {
            def = def.gc_time(Duration::from_millis(ms));
        }
        if let Some(preload) = self.preload {
            def = def.preload(preload);
        }
        if !self.retain_search.is_empty() {
            let keys = if self.retain_search.iter().any(|k| k == "*") {
                SearchKeys::All
            } else {
                SearchKeys::Keys(self.retain_search.clone())
            };
            def = def.search_middleware(retain_search_params(keys));
        }
        if !self.strip_search.is_empty() {
            def = def.search_middleware(strip_search_params(StripSearch::Keys(self.strip_search.clone())));
        }
        if let Some(data) = self.loader_data.clone() {
            def = def.loader(move |_: LoaderArgs| {
                let data = data.clone();
                async move { Ok::<_, RouteSignal>(data) }
            });
        }
        if let Some(target) = self.redirect.clone() {
            def = def.before_load(move |_| {
                let target = target.clone();
                async move { Err::<Context, _>(RouteSignal::redirect(target)) }
            });
        }
        def.children(self.children.iter().map(RouteSpec::to_route_def))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::tree::RouteTree;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.navigation.max_redirects, 10);
        assert_eq!(config.cache.preload_stale_time(), Duration::from_secs(30));
        assert_eq!(config.cache.gc_time(), Duration::from_secs(30 * 60));
        assert_eq!(config.matching.not_found_mode, NotFoundMode::Fuzzy);
        assert!(config.routes.is_none());
    }

    #[test]
    fn test_minimal_toml() {
        let config: RouterConfig = toml::from_str(
            r#"
            [matching]
            trailing_slash = "always"

            [routes]
            [[routes.children]]
            path = "posts"
            [[routes.children.children]]
            path = "$postId"
            loader_data = { title = "hello" }
            [[routes.children]]
            id = "_auth"
            [[routes.children.children]]
            path = "dashboard"
            "#,
        )
        .unwrap();
        assert_eq!(config.matching.trailing_slash, TrailingSlash::Always);
        assert_eq!(config.cache.stale_time_ms, 0);

        let tree = RouteTree::build(config.routes.unwrap().to_root()).unwrap();
        assert!(tree.lookup_by_id("/posts/$postId").is_some());
        assert!(tree.lookup_by_id("/_auth/dashboard").is_some());
    }
}
