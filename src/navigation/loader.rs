//! Per-navigation load pipeline.
//!
//! # Responsibilities
//! - Turn a location into match records (params, search, deps, cache key)
//! - Run `context`, `before_load` and the loader outer to inner, one match
//!   at a time
//! - Turn callback signals into redirects, not-found scopes and errors
//! - Reuse fresh cache entries and share in-flight loads with preloads
//!
//! # Design Decisions
//! - The generation is checked before every state write; a superseded run
//!   stops at its next step and never writes again
//! - Pending progress is written quietly; only start and commit notify
//! - Preload runs share the pipeline but never touch router state

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::cache::{CacheEntry, EntrySeed};
use crate::navigation::abort::AbortSignal;
use crate::navigation::error::{Phase, RouteError};
use crate::navigation::location::Location;
use crate::navigation::matches::{MatchCause, MatchKey, MatchStatus, RouteMatch};
use crate::navigation::router::RouterInner;
use crate::navigation::signal::{NotFound, Redirect, RouteSignal};
use crate::observability::metrics;
use crate::path::Params;
use crate::routing::route::{BeforeLoadArgs, Context, ContextArgs, LoaderArgs, RouteOptions, ShouldReloadArgs};
use crate::routing::tree::RouteNode;
use crate::search::validate_route_search;

/// How a run ended.
pub(crate) enum RunOutcome {
    /// Every match settled; the list is ready to commit.
    Settled { matches: Vec<RouteMatch>, status_code: u16 },
    Redirect(Redirect),
    /// A newer navigation took over.
    Superseded,
}

/// Why a match stopped short of resolving.
enum Halt {
    Signal(Phase, RouteSignal),
    Aborted,
}

struct Planned<'r> {
    node: &'r RouteNode,
    options: &'r RouteOptions,
    record: RouteMatch,
    /// Params or search validation failure, raised when the match runs.
    invalid: Option<RouteError>,
}

pub(crate) struct LoadRun<'r> {
    router: &'r RouterInner,
    location: Location,
    generation: u64,
    preload: bool,
    abort: AbortSignal,
}

impl<'r> LoadRun<'r> {
    pub(crate) fn navigation(router: &'r RouterInner, location: Location, generation: u64, abort: AbortSignal) -> Self {
        Self {
            router,
            location,
            generation,
            preload: false,
            abort,
        }
    }

    pub(crate) fn preload(router: &'r RouterInner, location: Location, abort: AbortSignal) -> Self {
        Self {
            router,
            location,
            generation: 0,
            preload: true,
            abort,
        }
    }

    fn is_current(&self) -> bool {
        self.preload || self.router.store.snapshot().generation == self.generation
    }

    pub(crate) async fn run(self) -> RunOutcome {
        let (mut planned, global_not_found) = self.plan().await;
        self.publish_pending(&planned);

        let mut context = self.router.base_context.clone();
        let mut status_code = 200;
        let mut failed: Option<String> = None;
        let mut scoped_not_found = false;
        let mut index = 0;

        while index < planned.len() {
            if !self.is_current() {
                return RunOutcome::Superseded;
            }

            if let Some(ancestor) = &failed {
                let record = &mut planned[index].record;
                record.status = MatchStatus::Error;
                record.error = Some(RouteError::AncestorFailed {
                    route_id: record.route_id.clone(),
                    ancestor: ancestor.clone(),
                });
                index += 1;
                continue;
            }

            if let Some(error) = planned[index].invalid.take() {
                self.fail(&mut planned[index], error);
                failed = Some(planned[index].record.route_id.clone());
                status_code = 500;
                self.publish_pending(&planned);
                index += 1;
                continue;
            }

            let outcome = self.execute(&mut planned[index], &context).await;
            match outcome {
                Ok(()) => {
                    let record = &mut planned[index].record;
                    record.status = MatchStatus::Resolved;
                    record.updated_at = Some(Instant::now());
                    context = record.context.clone();
                }
                Err(Halt::Aborted) => return RunOutcome::Superseded,
                Err(Halt::Signal(_, RouteSignal::Redirect(redirect))) => {
                    tracing::debug!(
                        route_id = %planned[index].record.route_id,
                        to = ?redirect.options.to,
                        "Route redirected"
                    );
                    planned[index].record.status = MatchStatus::Redirected;
                    return RunOutcome::Redirect(redirect);
                }
                Err(Halt::Signal(phase, RouteSignal::NotFound(not_found))) => {
                    let target = not_found_target(&planned, index, phase, &not_found);
                    tracing::debug!(
                        route_id = %planned[index].record.route_id,
                        handler = %planned[target].record.route_id,
                        "Route not found"
                    );
                    planned.truncate(target + 1);
                    let record = &mut planned[target].record;
                    record.status = MatchStatus::NotFound;
                    record.not_found = Some(NotFound {
                        route_id: Some(record.route_id.clone()),
                        ..not_found
                    });
                    status_code = 404;
                    scoped_not_found = true;
                    self.publish_pending(&planned);
                    break;
                }
                Err(Halt::Signal(phase, RouteSignal::Error(error))) => {
                    let route_id = planned[index].record.route_id.clone();
                    let error = RouteError::Lifecycle {
                        route_id: route_id.clone(),
                        phase,
                        error,
                    };
                    self.fail(&mut planned[index], error);
                    failed = Some(route_id);
                    status_code = 500;
                }
            }

            self.publish_pending(&planned);
            index += 1;
        }

        if !scoped_not_found {
            if let (Some(not_found), Some(target)) = (global_not_found, planned.last_mut()) {
                if target.record.status == MatchStatus::Resolved {
                    target.record.status = MatchStatus::NotFound;
                    target.record.not_found = Some(not_found);
                    status_code = 404;
                }
            }
        }

        if !self.is_current() {
            return RunOutcome::Superseded;
        }
        if !self.preload {
            self.remember(&planned);
        }
        RunOutcome::Settled {
            matches: planned.into_iter().map(|p| p.record).collect(),
            status_code,
        }
    }

    /// Build one pending record per matched route.
    async fn plan(&self) -> (Vec<Planned<'r>>, Option<NotFound>) {
        let router: &'r RouterInner = self.router;
        let path_match = router.matcher.match_pathname(&router.tree, &self.location.pathname);
        let found = path_match.is_found();
        let list = path_match.into_list();
        let committed = router.store.snapshot();

        let mut params = Params::new();
        let mut search = self.location.search.clone();
        let mut planned = Vec::with_capacity(list.routes.len());

        for matched in list.routes {
            let Some(node) = router.tree.lookup_by_id(&matched.route_id) else {
                continue;
            };
            let options = node.options().await;
            let mut invalid = None;

            let mut raw = params.clone();
            raw.extend(matched.params);
            let pathname = router.matcher.render(node.segments(), &raw).path;
            params = match &options.parse_params {
                Some(parse) => match parse(&raw) {
                    Ok(parsed) => {
                        let mut merged = raw;
                        merged.extend(parsed);
                        merged
                    }
                    Err(error) => {
                        invalid = Some(RouteError::InvalidParams {
                            route_id: node.id().to_string(),
                            error: Arc::from(error),
                        });
                        raw
                    }
                },
                None => raw,
            };

            match validate_route_search(options.validate_search.as_ref(), &search) {
                Ok(validated) => search = validated,
                Err(error) => {
                    if invalid.is_none() {
                        invalid = Some(RouteError::InvalidSearch {
                            route_id: node.id().to_string(),
                            error: Arc::from(error),
                        });
                    }
                }
            }

            let deps = options.loader_deps.as_ref().map_or(Value::Null, |f| f(&search));
            let key = MatchKey::new(node.id(), pathname.clone(), &deps);
            let cause = if self.preload {
                MatchCause::Preload
            } else if committed.matches.iter().any(|m| m.key == key) {
                MatchCause::Stay
            } else {
                MatchCause::Enter
            };

            planned.push(Planned {
                node,
                options,
                record: RouteMatch {
                    key,
                    route_id: node.id().to_string(),
                    pathname,
                    params: params.clone(),
                    search: search.clone(),
                    context: Context::new(),
                    route_context: Context::new(),
                    loader_deps: deps,
                    loader_data: None,
                    status: MatchStatus::Pending,
                    error: None,
                    not_found: None,
                    cause,
                    preload: self.preload,
                    generation: self.generation,
                    updated_at: None,
                },
                invalid,
            });
        }

        if found {
            return (planned, None);
        }

        let target = planned.iter().rposition(|p| p.options.handles_not_found()).unwrap_or(0);
        planned.truncate(target + 1);
        let not_found = planned.get(target).map(|p| NotFound {
            route_id: Some(p.record.route_id.clone()),
            data: None,
            global: true,
        });
        tracing::debug!(pathname = %self.location.pathname, scope = ?not_found.as_ref().and_then(|nf| nf.route_id.clone()), "Global not found");
        (planned, not_found)
    }

    /// Run one match's callbacks, filling in its context and loader data.
    async fn execute(&self, planned: &mut Planned<'r>, inherited: &Context) -> Result<(), Halt> {
        let options: &'r RouteOptions = planned.options;
        let record = &mut planned.record;
        let cached = self.router.cache.get(&record.key);

        let route_context = match (&options.context, &cached) {
            (Some(_), Some(entry)) if !entry.context_invalid => entry.route_context.clone(),
            (Some(context_fn), _) => context_fn(&ContextArgs {
                route_id: record.route_id.clone(),
                params: record.params.clone(),
                deps: record.loader_deps.clone(),
                context: inherited.clone(),
                cause: record.cause,
            })
            .map_err(|signal| Halt::Signal(Phase::Context, signal))?,
            (None, _) => Context::new(),
        };
        let mut context = inherited.clone();
        context.extend(route_context.clone());

        if let Some(before_load) = &options.before_load {
            let pending = before_load(BeforeLoadArgs {
                route_id: record.route_id.clone(),
                params: record.params.clone(),
                search: record.search.clone(),
                context: context.clone(),
                location: self.location.clone(),
                cause: record.cause,
                preload: self.preload,
                abort: self.abort.clone(),
            });
            let extra = tokio::select! {
                outcome = pending => outcome.map_err(|signal| Halt::Signal(Phase::BeforeLoad, signal))?,
                _ = self.abort.aborted() => return Err(Halt::Aborted),
            };
            context.extend(extra);
        }

        record.context = context;
        record.route_context = route_context;
        record.loader_data = self.load(options, record).await?;
        Ok(())
    }

    async fn load(&self, options: &RouteOptions, record: &RouteMatch) -> Result<Option<Value>, Halt> {
        let Some(loader) = &options.loader else {
            return Ok(None);
        };
        if self.preload && options.preload == Some(false) {
            tracing::debug!(route_id = %record.route_id, "Route opted out of preloading");
            return Ok(None);
        }

        // read after `before_load` so a preload finished meanwhile is seen
        if let Some(entry) = self.router.cache.get(&record.key) {
            if entry.loader_data.is_some() && self.is_fresh(options, record, &entry) {
                tracing::debug!(route_id = %record.route_id, preload = self.preload, "Reusing cached loader data");
                metrics::record_cache_hit(&record.route_id);
                if !self.preload {
                    self.router.cache.mark_used(&record.key, self.gc_time(options));
                }
                return Ok(entry.loader_data);
            }
        }

        let seed = EntrySeed {
            route_context: record.route_context.clone(),
            preload: self.preload,
            gc_time: self.gc_time(options),
        };
        let args = LoaderArgs {
            route_id: record.route_id.clone(),
            params: record.params.clone(),
            deps: record.loader_deps.clone(),
            context: record.context.clone(),
            location: self.location.clone(),
            cause: record.cause,
            preload: self.preload,
            abort: self.abort.clone(),
        };
        let route_id = record.route_id.as_str();
        let reuse = |entry: &CacheEntry| self.is_fresh(options, record, entry);
        let load = self.router.cache.get_or_create(&record.key, seed, reuse, || {
            tracing::debug!(route_id, preload = self.preload, "Invoking loader");
            metrics::record_loader_invocation(route_id);
            loader(args)
        });

        let data = tokio::select! {
            outcome = load => outcome.map_err(|signal| Halt::Signal(Phase::Loader, signal))?,
            _ = self.abort.aborted() => return Err(Halt::Aborted),
        };
        if !self.preload {
            self.router.cache.mark_used(&record.key, self.gc_time(options));
        }
        Ok(Some(data))
    }

    fn is_fresh(&self, options: &RouteOptions, record: &RouteMatch, entry: &CacheEntry) -> bool {
        if entry.invalid {
            return false;
        }
        let age = entry.age(Instant::now());
        if let Some(should_reload) = &options.should_reload {
            return !should_reload(&ShouldReloadArgs {
                route_id: record.route_id.clone(),
                params: record.params.clone(),
                deps: record.loader_deps.clone(),
                cause: record.cause,
                age,
            });
        }
        if record.cause == MatchCause::Stay {
            return true;
        }
        age < self.stale_time(options, entry.preload)
    }

    fn stale_time(&self, options: &RouteOptions, entry_preloaded: bool) -> Duration {
        let cache = &self.router.config.cache;
        if self.preload || entry_preloaded {
            options.preload_stale_time.unwrap_or_else(|| cache.preload_stale_time())
        } else {
            options.stale_time.unwrap_or_else(|| cache.stale_time())
        }
    }

    fn gc_time(&self, options: &RouteOptions) -> Duration {
        let cache = &self.router.config.cache;
        if self.preload {
            options.preload_gc_time.unwrap_or_else(|| cache.preload_gc_time())
        } else {
            options.gc_time.unwrap_or_else(|| cache.gc_time())
        }
    }

    fn fail(&self, planned: &mut Planned<'r>, error: RouteError) {
        tracing::warn!(
            route_id = %planned.record.route_id,
            path = %planned.node.full_path(),
            error = %error,
            preload = self.preload,
            "Route failed"
        );
        if !self.preload {
            if let Some(on_error) = &planned.options.on_error {
                on_error(&error);
            }
        }
        planned.record.status = MatchStatus::Error;
        planned.record.error = Some(error);
    }

    /// Record settled matches so the next navigation can reuse them.
    /// Loader results are already cached by the load itself; adopting one
    /// that a preload produced resets its gc time.
    fn remember(&self, planned: &[Planned<'r>]) {
        let cache = &self.router.cache;
        let settled = planned
            .iter()
            .filter(|p| matches!(p.record.status, MatchStatus::Resolved | MatchStatus::NotFound));
        for p in settled {
            let gc_time = self.gc_time(p.options);
            if p.options.loader.is_some() && cache.get(&p.record.key).is_some() {
                cache.mark_used(&p.record.key, gc_time);
                continue;
            }
            cache.insert(
                p.record.key.clone(),
                CacheEntry {
                    loader_data: p.record.loader_data.clone(),
                    route_context: p.record.route_context.clone(),
                    updated_at: p.record.updated_at.unwrap_or_else(Instant::now),
                    preload: false,
                    invalid: false,
                    context_invalid: false,
                    gc_time,
                },
            );
        }
    }

    fn publish_pending(&self, planned: &[Planned<'r>]) {
        if self.preload {
            return;
        }
        let pending: Vec<RouteMatch> = planned.iter().map(|p| p.record.clone()).collect();
        let generation = self.generation;
        self.router
            .store
            .update_quiet_if(|s| s.generation == generation, move |s| s.pending_matches = Some(pending));
    }
}

/// Index of the match that renders a not-found raised at `signaler`.
///
/// The scope is the named route, else the signaler; a not-found raised
/// before the signaler's loader ran is scoped to its parent. From the scope
/// the nearest route handling not-found wins, falling back to the root.
fn not_found_target(planned: &[Planned<'_>], signaler: usize, phase: Phase, not_found: &NotFound) -> usize {
    let scope = match &not_found.route_id {
        Some(id) => planned
            .iter()
            .position(|p| p.record.route_id == *id)
            .unwrap_or(signaler),
        None if phase == Phase::Loader => signaler,
        None => signaler.saturating_sub(1),
    };
    planned[..=scope.min(signaler)]
        .iter()
        .rposition(|p| p.options.handles_not_found())
        .unwrap_or(0)
}
