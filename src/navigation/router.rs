//! The router.
//!
//! # Responsibilities
//! - Assemble tree, matcher, cache, state and history from a config
//! - Turn navigation requests into locations and history entries
//! - Start, supersede, redirect and commit navigations
//! - Preload routes into the cache and invalidate cached results
//! - Run the background tasks (history listener, cache gc)
//!
//! # Design Decisions
//! - `Router` is a cheap handle over `Arc<RouterInner>`
//! - Starting a navigation bumps the generation and swaps the abort
//!   controller under the state writer lock, so two navigations can never
//!   both believe they are current
//! - History is the source of truth for the location: navigations write
//!   the entry first, then load whatever history reports

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::cache::{GcSweeper, MatchCache};
use crate::config::schema::{RouteMaskConfig, RouterConfig};
use crate::config::validation::validate_config;
use crate::lifecycle::Shutdown;
use crate::masking::{apply_mask, encode_masked_state, resolve_mask, RouteMask};
use crate::navigation::abort::AbortController;
use crate::navigation::error::{BuildError, NavigationError};
use crate::navigation::events::RouterEvent;
use crate::navigation::history::{History, HistoryAction, HistoryEvent, MemoryHistory};
use crate::navigation::loader::{LoadRun, RunOutcome};
use crate::navigation::location::{Location, NavigateOptions};
use crate::navigation::matches::{MatchKey, RouteMatch};
use crate::navigation::signal::Redirect;
use crate::navigation::state::{RouterState, RouterStatus, StateStore};
use crate::observability::metrics;
use crate::path::{compile, resolve_path, Params};
use crate::routing::matcher::{Matcher, PathMatch};
use crate::routing::route::{Context, RouteDef};
use crate::routing::tree::{RouteNode, RouteTree, TreeOptions};
use crate::search::{apply_middlewares, Search};

/// How a navigation call ended.
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
    /// The navigation committed this state.
    Committed(Arc<RouterState>),
    /// A newer navigation started before this one could commit.
    Superseded,
}

impl NavigationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, NavigationOutcome::Committed(_))
    }

    pub fn state(&self) -> Option<&RouterState> {
        match self {
            NavigationOutcome::Committed(state) => Some(state),
            NavigationOutcome::Superseded => None,
        }
    }
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    root: RouteDef,
    config: RouterConfig,
    history: Option<Arc<dyn History>>,
    masks: Vec<RouteMask>,
    context: Context,
}

impl RouterBuilder {
    pub fn new(root: RouteDef) -> Self {
        Self {
            root,
            config: RouterConfig::default(),
            history: None,
            masks: Vec::new(),
            context: Context::new(),
        }
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// History backend; defaults to a `MemoryHistory` at `/`.
    pub fn history(mut self, history: Arc<dyn History>) -> Self {
        self.history = Some(history);
        self
    }

    /// Mask tried after the configured ones.
    pub fn mask(mut self, mask: RouteMask) -> Self {
        self.masks.push(mask);
        self
    }

    /// Context handed to the root route.
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Result<Router, BuildError> {
        let config = self.config;
        validate_config(&config).map_err(BuildError::Config)?;
        let tree = RouteTree::build_with(
            self.root,
            TreeOptions {
                case_sensitive: config.matching.case_sensitive,
            },
        )?;
        let matcher = Matcher::new(
            config.matching.trailing_slash,
            config.matching.not_found_mode,
            config.matching.path_params_allowed_characters.clone(),
        );
        let mut masks = config
            .route_masks
            .iter()
            .map(RouteMaskConfig::to_mask)
            .collect::<Result<Vec<_>, _>>()?;
        masks.extend(self.masks);

        let history = self.history.unwrap_or_else(|| Arc::new(MemoryHistory::new("/")));
        let temp_key = Uuid::new_v4().to_string();
        let location = read_location(history.as_ref(), &temp_key);
        let (events, _) = broadcast::channel(64);

        tracing::info!(routes = tree.len(), masks = masks.len(), href = %location.href, "Router built");

        Ok(Router {
            inner: Arc::new(RouterInner {
                tree,
                matcher,
                config,
                cache: MatchCache::new(),
                store: Arc::new(StateStore::new(RouterState::new(location))),
                base_context: self.context,
                history,
                masks,
                events,
                abort: Mutex::new(None),
                temp_key,
            }),
        })
    }
}

pub(crate) struct RouterInner {
    pub(crate) tree: RouteTree,
    pub(crate) matcher: Matcher,
    pub(crate) config: RouterConfig,
    pub(crate) cache: MatchCache,
    pub(crate) store: Arc<StateStore>,
    pub(crate) base_context: Context,
    history: Arc<dyn History>,
    masks: Vec<RouteMask>,
    events: broadcast::Sender<RouterEvent>,
    /// Controller of the current navigation.
    abort: Mutex<Option<AbortController>>,
    /// Identifies entries this router masked with unmask-on-reload.
    temp_key: String,
}

/// Handle to a router. Clones share everything.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder(root: RouteDef) -> RouterBuilder {
        RouterBuilder::new(root)
    }

    pub fn tree(&self) -> &RouteTree {
        &self.inner.tree
    }

    pub fn matcher(&self) -> &Matcher {
        &self.inner.matcher
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &MatchCache {
        &self.inner.cache
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.inner.history
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<RouterState> {
        self.inner.store.snapshot()
    }

    /// Wakes once per published state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.store.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<RouterEvent> {
        self.inner.events.subscribe()
    }

    /// Match a pathname without loading anything.
    pub fn match_route(&self, pathname: &str) -> PathMatch {
        self.inner.matcher.match_pathname(&self.inner.tree, pathname)
    }

    /// Render the path of route `route_id` with `params`.
    pub fn href(&self, route_id: &str, params: &Params) -> Result<String, NavigationError> {
        let node = self
            .inner
            .tree
            .lookup_by_id(route_id)
            .ok_or_else(|| NavigationError::UnknownRoute(route_id.to_string()))?;
        let rendered = self.inner.matcher.build_path(node, params);
        if !rendered.is_complete() {
            return Err(NavigationError::MissingParams {
                path: node.full_path().to_string(),
                missing: rendered.missing_params,
            });
        }
        Ok(rendered.path)
    }

    /// Resolve a navigation request into a location, masked if a mask
    /// applies.
    pub async fn build_location(&self, options: &NavigateOptions) -> Result<Location, NavigationError> {
        self.inner.build_location(options).await
    }

    /// Write the request to history and load it.
    pub async fn navigate(&self, options: NavigateOptions) -> Result<NavigationOutcome, NavigationError> {
        let location = match self.inner.build_location(&options).await {
            Ok(location) => location,
            Err(e) => {
                metrics::record_navigation("failed");
                return Err(e);
            }
        };
        self.inner.write_history(&location, options.replace);
        self.load().await
    }

    /// Load whatever location history currently reports.
    pub async fn load(&self) -> Result<NavigationOutcome, NavigationError> {
        let location = self.inner.read_location();
        self.inner.navigate_to(location).await
    }

    /// Run the pipeline for a location, writing only to the cache. Redirects
    /// end the preload without following them.
    pub async fn preload_route(&self, options: NavigateOptions) -> Result<Vec<RouteMatch>, NavigationError> {
        let location = self.inner.build_location(&options).await?;
        tracing::debug!(href = %location.href, "Preloading");
        let controller = AbortController::new();
        match LoadRun::preload(&self.inner, location, controller.signal()).run().await {
            RunOutcome::Settled { matches, .. } => Ok(matches),
            RunOutcome::Redirect(redirect) => {
                tracing::debug!(to = ?redirect.options.to, "Preload redirected, not following");
                Ok(Vec::new())
            }
            RunOutcome::Superseded => Ok(Vec::new()),
        }
    }

    /// Mark cached loader results stale and reload the current location.
    /// `context` and `before_load` results are reused.
    pub async fn invalidate(
        &self,
        predicate: impl Fn(&MatchKey) -> bool,
    ) -> Result<NavigationOutcome, NavigationError> {
        let marked = self.inner.cache.invalidate(false, predicate);
        tracing::info!(marked, "Invalidated cached matches");
        self.load().await
    }

    /// Like `invalidate`, but route `context` callbacks rerun too.
    pub async fn invalidate_with_context(
        &self,
        predicate: impl Fn(&MatchKey) -> bool,
    ) -> Result<NavigationOutcome, NavigationError> {
        let marked = self.inner.cache.invalidate(true, predicate);
        tracing::info!(marked, "Invalidated cached matches and contexts");
        self.load().await
    }

    /// Reload on every history pop until shutdown.
    pub fn listen(&self, shutdown: &Shutdown) {
        let router = self.clone();
        let mut history_events = self.inner.history.subscribe();
        shutdown.spawn("history-listener", move |mut stop| async move {
            loop {
                tokio::select! {
                    event = history_events.recv() => match event {
                        Ok(HistoryEvent { action: HistoryAction::Pop, location }) => {
                            tracing::debug!(href = %location.href, "History popped");
                            if let Err(e) = router.load().await {
                                tracing::warn!(error = %e, "Navigation after history pop failed");
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "History listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.recv() => {
                        tracing::info!("History listener received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        });
    }

    /// Start the history listener and cache gc.
    pub fn start(&self, shutdown: &Shutdown) {
        let sweeper = GcSweeper::new(
            self.inner.cache.clone(),
            self.inner.store.clone(),
            self.inner.config.cache.gc_interval(),
        );
        shutdown.spawn("cache-gc", move |stop| sweeper.run(stop));
        self.listen(shutdown);
    }
}

impl RouterInner {
    fn read_location(&self) -> Location {
        read_location(self.history.as_ref(), &self.temp_key)
    }

    fn write_history(&self, location: &Location, replace: bool) {
        let (href, state) = match &location.masked_location {
            Some(display) => {
                let temp_key = display.unmask_on_reload.then_some(self.temp_key.as_str());
                (
                    display.href.as_str(),
                    encode_masked_state(display.state.clone(), location, temp_key),
                )
            }
            None => (location.href.as_str(), location.state.clone()),
        };
        if replace {
            self.history.replace(href, state);
        } else {
            self.history.push(href, state);
        }
    }

    async fn build_location(&self, options: &NavigateOptions) -> Result<Location, NavigationError> {
        let mut location = self.build_unmasked(options).await?;
        let unmask_default = self.config.navigation.unmask_on_reload;

        let display = match &options.mask {
            Some(mask) => {
                let mut display = self.build_unmasked(mask).await?;
                display.unmask_on_reload = options
                    .unmask_on_reload
                    .or(mask.unmask_on_reload)
                    .unwrap_or(unmask_default);
                Some(display)
            }
            None => apply_mask(&self.masks, &location, &self.matcher, unmask_default).map(|mut display| {
                if let Some(unmask) = options.unmask_on_reload {
                    display.unmask_on_reload = unmask;
                }
                display
            }),
        };

        if let Some(display) = display {
            location.unmask_on_reload = display.unmask_on_reload;
            location.masked_location = Some(Box::new(display));
        }
        Ok(location)
    }

    async fn build_unmasked(&self, options: &NavigateOptions) -> Result<Location, NavigationError> {
        let current = self.store.snapshot();
        let active = current.resolved_location.as_ref().unwrap_or(&current.location);

        let base = match &options.from {
            Some(from) => self
                .tree
                .lookup_by_id(from)
                .map(|node| node.full_path().to_string())
                .ok_or_else(|| NavigationError::Invariant(format!("`from` names unknown route `{from}`")))?,
            None => active.pathname.clone(),
        };
        let to = options.to.as_deref().unwrap_or(".");
        let resolved = resolve_path(&base, to, self.matcher.trailing_slash);
        let pattern = compile(&resolved)?;

        let active_params = current.leaf().map(|m| m.params.clone()).unwrap_or_default();
        let mut params = options.params.apply(&active_params);
        let mut middlewares = Vec::new();
        for node in self.destination_chain(&resolved) {
            let route_options = node.options().await;
            if let Some(stringify) = &route_options.stringify_params {
                let stringified = stringify(&params);
                params.extend(stringified);
            }
            middlewares.extend(route_options.search_middlewares.iter().cloned());
        }

        let rendered = self.matcher.render(pattern.segments(), &params);
        if !rendered.is_complete() {
            return Err(NavigationError::MissingParams {
                path: resolved,
                missing: rendered.missing_params,
            });
        }

        let search = apply_middlewares(&middlewares, active.search.clone(), &|search: Search| {
            options.search.apply(&search)
        });
        Ok(Location::new(
            rendered.path,
            search,
            options.hash.clone().unwrap_or_default(),
            options.state.clone().unwrap_or_default(),
        ))
    }

    /// Routes, root first, of the route a resolved path points at. Accepts
    /// route paths (`/posts/$postId`) and concrete pathnames.
    fn destination_chain(&self, resolved: &str) -> Vec<&RouteNode> {
        let leaf = match self.tree.lookup_by_path(resolved) {
            Some(node) => node,
            None => {
                let path_match = self.matcher.match_pathname(&self.tree, resolved);
                match path_match.list().leaf().and_then(|l| self.tree.lookup_by_id(&l.route_id)) {
                    Some(node) => node,
                    None => self.tree.root(),
                }
            }
        };
        self.tree.ancestors_of(leaf.id())
    }

    async fn navigate_to(&self, location: Location) -> Result<NavigationOutcome, NavigationError> {
        let previous = self.store.snapshot();
        let from = previous.resolved_location.clone();
        let from_href = from.as_ref().map_or_else(String::new, |l| l.href.clone());

        let controller = AbortController::new();
        let mut generation = 0;
        self.store.update(|s| {
            s.generation += 1;
            generation = s.generation;
            s.status = RouterStatus::Pending;
            s.location = location.clone();
            s.pending_matches = None;
            let replaced = self
                .abort
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(controller.clone());
            if let Some(previous) = replaced {
                previous.abort();
            }
        });

        tracing::info!(generation, from = %from_href, to = %location.href, "Navigation started");
        self.emit(RouterEvent::BeforeNavigate {
            from_href: from_href.clone(),
            to_href: location.href.clone(),
        });
        self.emit(RouterEvent::BeforeLoad {
            from_href: from_href.clone(),
            to_href: location.href.clone(),
        });

        let mut location = location;
        let mut redirects = 0u32;
        let mut last_redirect: Option<Redirect> = None;

        loop {
            let run = LoadRun::navigation(self, location.clone(), generation, controller.signal());
            match run.run().await {
                RunOutcome::Settled { matches, status_code } => {
                    let outcome = self.commit(generation, location, matches, status_code, last_redirect);
                    if let NavigationOutcome::Committed(state) = &outcome {
                        self.emit(RouterEvent::Resolved {
                            from_href,
                            to_href: state.location.href.clone(),
                            path_changed: from.as_ref().map_or(true, |l| l.pathname != state.location.pathname),
                            status_code: state.status_code,
                        });
                    }
                    return Ok(outcome);
                }
                RunOutcome::Superseded => {
                    tracing::debug!(generation, href = %location.href, "Navigation superseded");
                    metrics::record_navigation("superseded");
                    return Ok(NavigationOutcome::Superseded);
                }
                RunOutcome::Redirect(redirect) => {
                    redirects += 1;
                    metrics::record_redirect();
                    let limit = self.config.navigation.max_redirects;
                    if redirects > limit {
                        tracing::warn!(generation, limit, href = %location.href, "Redirect limit exceeded");
                        self.abandon(generation);
                        metrics::record_navigation("redirect_limit");
                        return Err(NavigationError::RedirectLimit {
                            limit,
                            href: location.href,
                        });
                    }

                    let target = match self.build_location(&redirect.options).await {
                        Ok(target) => target,
                        Err(e) => {
                            self.abandon(generation);
                            metrics::record_navigation("failed");
                            return Err(e);
                        }
                    };
                    if self.store.snapshot().generation != generation {
                        metrics::record_navigation("superseded");
                        return Ok(NavigationOutcome::Superseded);
                    }

                    tracing::info!(generation, from = %location.href, to = %target.href, status = redirect.status, "Following redirect");
                    self.write_history(&target, true);
                    location = self.read_location();
                    let next = location.clone();
                    self.store
                        .update_quiet_if(|s| s.generation == generation, move |s| s.location = next);
                    last_redirect = Some(redirect);
                }
            }
        }
    }

    fn commit(
        &self,
        generation: u64,
        location: Location,
        matches: Vec<RouteMatch>,
        status_code: u16,
        redirect: Option<Redirect>,
    ) -> NavigationOutcome {
        let href = location.href.clone();
        let match_count = matches.len();
        let mut committed = None;
        self.store.update_if(
            |s| s.generation == generation,
            |s| {
                s.status = RouterStatus::Idle;
                s.resolved_location = Some(location.clone());
                s.location = location;
                s.matches = matches;
                s.pending_matches = None;
                s.status_code = status_code;
                s.redirect = redirect;
                committed = Some(Arc::new(s.clone()));
            },
        );

        match committed {
            Some(state) => {
                tracing::info!(generation, href = %href, status_code, matches = match_count, "Navigation committed");
                metrics::record_navigation("committed");
                NavigationOutcome::Committed(state)
            }
            None => {
                tracing::debug!(generation, href = %href, "Navigation superseded at commit");
                metrics::record_navigation("superseded");
                NavigationOutcome::Superseded
            }
        }
    }

    /// Drop a failed navigation's pending state, keeping the committed one.
    /// The current history entry is pointed back at the committed location.
    fn abandon(&self, generation: u64) {
        let mut restored = None;
        self.store.update_if(
            |s| s.generation == generation,
            |s| {
                s.status = RouterStatus::Idle;
                s.pending_matches = None;
                if let Some(resolved) = &s.resolved_location {
                    s.location = resolved.clone();
                    restored = Some(resolved.clone());
                }
            },
        );
        if let Some(resolved) = restored {
            tracing::debug!(generation, href = %resolved.href, "History entry restored");
            self.write_history(&resolved, true);
        }
    }

    fn emit(&self, event: RouterEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

fn read_location(history: &dyn History, temp_key: &str) -> Location {
    let entry = history.location();
    resolve_mask(&entry, temp_key).unwrap_or_else(|| Location::parse(&entry.href, entry.state.clone()))
}
