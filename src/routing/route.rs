//! Route definitions.
//!
//! # Responsibilities
//! - Typed option bag with optional callback slots (`RouteOptions`)
//! - Builder for nested route definitions (`RouteDef`)
//! - Argument structs handed to each callback
//!
//! # Design Decisions
//! - Every callback is an `Arc<dyn Fn>` so options can be cloned into
//!   matches and spawned loader tasks
//! - Async callbacks return boxed futures; `context` and validators are sync
//! - Lazy options fill only the slots the skeleton left empty

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::navigation::abort::AbortSignal;
use crate::navigation::error::RouteError;
use crate::navigation::location::Location;
use crate::navigation::matches::MatchCause;
use crate::navigation::signal::{BoxError, RouteResult};
use crate::path::Params;
use crate::search::{Search, SearchMiddleware, SearchValidator};

/// Context accumulated from the root down the match list.
pub type Context = serde_json::Map<String, Value>;

/// Arguments to a route's synchronous `context` callback.
#[derive(Debug, Clone)]
pub struct ContextArgs {
    pub route_id: String,
    pub params: Params,
    pub deps: Value,
    /// Context inherited from the parent match.
    pub context: Context,
    pub cause: MatchCause,
}

/// Arguments to `before_load`.
#[derive(Debug, Clone)]
pub struct BeforeLoadArgs {
    pub route_id: String,
    pub params: Params,
    pub search: Search,
    pub context: Context,
    pub location: Location,
    pub cause: MatchCause,
    pub preload: bool,
    pub abort: AbortSignal,
}

/// Arguments to `loader`.
#[derive(Debug, Clone)]
pub struct LoaderArgs {
    pub route_id: String,
    pub params: Params,
    pub deps: Value,
    pub context: Context,
    pub location: Location,
    pub cause: MatchCause,
    pub preload: bool,
    pub abort: AbortSignal,
}

/// Arguments to `should_reload`.
#[derive(Debug, Clone)]
pub struct ShouldReloadArgs {
    pub route_id: String,
    pub params: Params,
    pub deps: Value,
    pub cause: MatchCause,
    /// Time since the cached loader data was produced.
    pub age: Duration,
}

pub type ContextFn = Arc<dyn Fn(&ContextArgs) -> RouteResult<Context> + Send + Sync>;
pub type BeforeLoadFn = Arc<dyn Fn(BeforeLoadArgs) -> BoxFuture<'static, RouteResult<Context>> + Send + Sync>;
pub type LoaderFn = Arc<dyn Fn(LoaderArgs) -> BoxFuture<'static, RouteResult<Value>> + Send + Sync>;
pub type LoaderDepsFn = Arc<dyn Fn(&Search) -> Value + Send + Sync>;
pub type ParseParamsFn = Arc<dyn Fn(&Params) -> Result<Params, BoxError> + Send + Sync>;
pub type StringifyParamsFn = Arc<dyn Fn(&Params) -> Params + Send + Sync>;
pub type ShouldReloadFn = Arc<dyn Fn(&ShouldReloadArgs) -> bool + Send + Sync>;
pub type OnErrorFn = Arc<dyn Fn(&RouteError) + Send + Sync>;
pub type LazyFn = Arc<dyn Fn() -> BoxFuture<'static, RouteOptions> + Send + Sync>;

/// Per-route options. Every slot is optional.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub validate_search: Option<SearchValidator>,
    pub search_middlewares: Vec<SearchMiddleware>,
    pub parse_params: Option<ParseParamsFn>,
    pub stringify_params: Option<StringifyParamsFn>,
    pub context: Option<ContextFn>,
    pub before_load: Option<BeforeLoadFn>,
    pub loader_deps: Option<LoaderDepsFn>,
    pub loader: Option<LoaderFn>,
    pub should_reload: Option<ShouldReloadFn>,
    pub on_error: Option<OnErrorFn>,
    pub stale_time: Option<Duration>,
    pub preload_stale_time: Option<Duration>,
    pub gc_time: Option<Duration>,
    pub preload_gc_time: Option<Duration>,
    /// `Some(false)` keeps the loader out of preloads.
    pub preload: Option<bool>,
    /// Whether this route renders not-found for its subtree.
    pub handles_not_found: Option<bool>,
}

impl RouteOptions {
    /// Fill every empty slot of `self` from `other`.
    pub fn merge_missing(mut self, other: RouteOptions) -> RouteOptions {
        fn fill<T>(slot: &mut Option<T>, other: Option<T>) {
            if slot.is_none() {
                *slot = other;
            }
        }
        fill(&mut self.validate_search, other.validate_search);
        if self.search_middlewares.is_empty() {
            self.search_middlewares = other.search_middlewares;
        }
        fill(&mut self.parse_params, other.parse_params);
        fill(&mut self.stringify_params, other.stringify_params);
        fill(&mut self.context, other.context);
        fill(&mut self.before_load, other.before_load);
        fill(&mut self.loader_deps, other.loader_deps);
        fill(&mut self.loader, other.loader);
        fill(&mut self.should_reload, other.should_reload);
        fill(&mut self.on_error, other.on_error);
        fill(&mut self.stale_time, other.stale_time);
        fill(&mut self.preload_stale_time, other.preload_stale_time);
        fill(&mut self.gc_time, other.gc_time);
        fill(&mut self.preload_gc_time, other.preload_gc_time);
        fill(&mut self.preload, other.preload);
        fill(&mut self.handles_not_found, other.handles_not_found);
        self
    }

    pub fn handles_not_found(&self) -> bool {
        self.handles_not_found.unwrap_or(false)
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("validate_search", &self.validate_search.is_some())
            .field("search_middlewares", &self.search_middlewares.len())
            .field("context", &self.context.is_some())
            .field("before_load", &self.before_load.is_some())
            .field("loader", &self.loader.is_some())
            .field("loader_deps", &self.loader_deps.is_some())
            .field("stale_time", &self.stale_time)
            .field("preload_stale_time", &self.preload_stale_time)
            .field("gc_time", &self.gc_time)
            .field("preload", &self.preload)
            .field("handles_not_found", &self.handles_not_found)
            .finish_non_exhaustive()
    }
}

/// What kind of node a definition describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RouteKind {
    Root,
    /// Has a path; `/` under a parent means index.
    Path(String),
    /// Layout without a path; needs an explicit id.
    Pathless,
}

/// Declarative route definition, nested through `children`.
#[derive(Clone)]
pub struct RouteDef {
    pub(crate) kind: RouteKind,
    pub(crate) id: Option<String>,
    pub(crate) case_sensitive: Option<bool>,
    pub(crate) options: RouteOptions,
    pub(crate) lazy: Option<LazyFn>,
    pub(crate) children: Vec<RouteDef>,
}

impl RouteDef {
    fn with_kind(kind: RouteKind) -> Self {
        Self {
            kind,
            id: None,
            case_sensitive: None,
            options: RouteOptions::default(),
            lazy: None,
            children: Vec::new(),
        }
    }

    /// The single root of a tree.
    pub fn root() -> Self {
        Self::with_kind(RouteKind::Root)
    }

    /// Route matching `path` relative to its parent.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_kind(RouteKind::Path(path.into()))
    }

    /// Index route: matches exactly its parent's path.
    pub fn index() -> Self {
        Self::new("/")
    }

    /// Layout route that consumes no path segment.
    pub fn pathless(id: impl Into<String>) -> Self {
        let mut def = Self::with_kind(RouteKind::Pathless);
        def.id = Some(id.into());
        def
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    pub fn child(mut self, child: RouteDef) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RouteDef>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate_search(
        mut self,
        f: impl Fn(&Search) -> Result<Search, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.options.validate_search = Some(Arc::new(f));
        self
    }

    pub fn search_middleware(mut self, middleware: SearchMiddleware) -> Self {
        self.options.search_middlewares.push(middleware);
        self
    }

    /// Params parse and stringify pair.
    pub fn params(
        mut self,
        parse: impl Fn(&Params) -> Result<Params, BoxError> + Send + Sync + 'static,
        stringify: impl Fn(&Params) -> Params + Send + Sync + 'static,
    ) -> Self {
        self.options.parse_params = Some(Arc::new(parse));
        self.options.stringify_params = Some(Arc::new(stringify));
        self
    }

    pub fn context(mut self, f: impl Fn(&ContextArgs) -> RouteResult<Context> + Send + Sync + 'static) -> Self {
        self.options.context = Some(Arc::new(f));
        self
    }

    pub fn before_load<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(BeforeLoadArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouteResult<Context>> + Send + 'static,
    {
        self.options.before_load = Some(Arc::new(move |args| f(args).boxed()));
        self
    }

    pub fn loader_deps(mut self, f: impl Fn(&Search) -> Value + Send + Sync + 'static) -> Self {
        self.options.loader_deps = Some(Arc::new(f));
        self
    }

    pub fn loader<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(LoaderArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouteResult<Value>> + Send + 'static,
    {
        self.options.loader = Some(Arc::new(move |args| f(args).boxed()));
        self
    }

    pub fn should_reload(mut self, f: impl Fn(&ShouldReloadArgs) -> bool + Send + Sync + 'static) -> Self {
        self.options.should_reload = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&RouteError) + Send + Sync + 'static) -> Self {
        self.options.on_error = Some(Arc::new(f));
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.options.stale_time = Some(stale_time);
        self
    }

    pub fn preload_stale_time(mut self, stale_time: Duration) -> Self {
        self.options.preload_stale_time = Some(stale_time);
        self
    }

    pub fn gc_time(mut self, gc_time: Duration) -> Self {
        self.options.gc_time = Some(gc_time);
        self
    }

    pub fn preload_gc_time(mut self, gc_time: Duration) -> Self {
        self.options.preload_gc_time = Some(gc_time);
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.options.preload = Some(preload);
        self
    }

    pub fn handles_not_found(mut self) -> Self {
        self.options.handles_not_found = Some(true);
        self
    }

    /// Options resolved on first use and merged into the empty slots.
    pub fn lazy<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouteOptions> + Send + 'static,
    {
        self.lazy = Some(Arc::new(move || f().boxed()));
        self
    }
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("options", &self.options)
            .field("lazy", &self.lazy.is_some())
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_missing_keeps_existing_slots() {
        let base = RouteOptions {
            stale_time: Some(Duration::from_secs(5)),
            ..RouteOptions::default()
        };
        let lazy = RouteOptions {
            stale_time: Some(Duration::from_secs(60)),
            preload: Some(false),
            ..RouteOptions::default()
        };
        let merged = base.merge_missing(lazy);
        assert_eq!(merged.stale_time, Some(Duration::from_secs(5)));
        assert_eq!(merged.preload, Some(false));
    }

    #[test]
    fn test_builder_sets_slots() {
        let def = RouteDef::new("posts")
            .loader(|_args| async { Ok(Value::Null) })
            .handles_not_found()
            .child(RouteDef::index());
        assert!(def.options.loader.is_some());
        assert!(def.options.handles_not_found());
        assert_eq!(def.children.len(), 1);
        assert_eq!(def.children[0].kind, RouteKind::Path("/".into()));
    }
}
