//! Keyed store of loader results with in-flight deduplication.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde_json::Value;
use tokio::time::Instant;

use crate::navigation::matches::MatchKey;
use crate::navigation::signal::{RouteResult, RouteSignal};
use crate::observability::metrics;
use crate::routing::Context;

/// Result of one loader invocation.
pub type LoaderOutcome = RouteResult<Value>;

/// Handle to a load other callers can await too.
pub type SharedLoad = Shared<BoxFuture<'static, LoaderOutcome>>;

/// A cached match result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub loader_data: Option<Value>,
    /// Contribution of the route's `context` callback.
    pub route_context: Context,
    pub updated_at: Instant,
    /// Produced by a preload and not yet used by a navigation.
    pub preload: bool,
    /// Loader must run again on next access.
    pub invalid: bool,
    /// `context` callback must run again on next access.
    pub context_invalid: bool,
    pub gc_time: Duration,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.updated_at)
    }
}

/// What to record when a spawned load succeeds.
#[derive(Debug, Clone)]
pub struct EntrySeed {
    pub route_context: Context,
    pub preload: bool,
    pub gc_time: Duration,
}

/// Match cache shared by navigations and preloads. Cloning shares the maps.
#[derive(Clone, Default)]
pub struct MatchCache {
    entries: Arc<DashMap<MatchKey, CacheEntry>>,
    inflight: Arc<DashMap<MatchKey, (u64, SharedLoad)>>,
    next_load: Arc<AtomicU64>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MatchKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn insert(&self, key: MatchKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
        metrics::set_cache_entries(self.entries.len());
    }

    /// A navigation adopted a preloaded entry; it now ages like any other.
    pub fn mark_used(&self, key: &MatchKey, gc_time: Duration) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.preload = false;
            entry.gc_time = gc_time;
        }
    }

    pub fn is_loading(&self, key: &MatchKey) -> bool {
        self.inflight.contains_key(key)
    }

    /// Join the in-flight load for `key`, or start one from `make`.
    ///
    /// The load runs on its own task. On success it writes an entry built
    /// from `seed`; either way it releases the in-flight slot. A cached
    /// entry accepted by `reuse` is returned instead, checked while the
    /// slot is held so a load finishing concurrently is never repeated.
    pub fn get_or_create(
        &self,
        key: &MatchKey,
        seed: EntrySeed,
        reuse: impl FnOnce(&CacheEntry) -> bool,
        make: impl FnOnce() -> BoxFuture<'static, LoaderOutcome>,
    ) -> SharedLoad {
        match self.inflight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                tracing::debug!(route_id = %key.route_id, "Joining in-flight load");
                existing.get().1.clone()
            }
            Entry::Vacant(slot) => {
                let cached = self
                    .entries
                    .get(key)
                    .and_then(|entry| entry.loader_data.clone().filter(|_| reuse(entry.value())));
                if let Some(data) = cached {
                    tracing::debug!(route_id = %key.route_id, "Load finished before slot was taken");
                    return futures_util::future::ready(Ok(data)).boxed().shared();
                }
                let id = self.next_load.fetch_add(1, Ordering::Relaxed);
                let load = make();
                let entries = self.entries.clone();
                let inflight = self.inflight.clone();
                let task_key = key.clone();
                let handle = tokio::spawn(async move {
                    let outcome = load.await;
                    if let Ok(data) = &outcome {
                        entries.insert(
                            task_key.clone(),
                            CacheEntry {
                                loader_data: Some(data.clone()),
                                route_context: seed.route_context,
                                updated_at: Instant::now(),
                                preload: seed.preload,
                                invalid: false,
                                context_invalid: false,
                                gc_time: seed.gc_time,
                            },
                        );
                        metrics::set_cache_entries(entries.len());
                    }
                    inflight.remove_if(&task_key, |_, (load_id, _)| *load_id == id);
                    outcome
                });
                let shared = async move {
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => Err(RouteSignal::error(format!("loader task failed: {e}"))),
                    }
                }
                .boxed()
                .shared();
                slot.insert((id, shared.clone()));
                shared
            }
        }
    }

    /// Mark matching entries stale. With `context` the route `context`
    /// callback reruns as well. Returns how many entries were marked.
    pub fn invalidate(&self, context: bool, predicate: impl Fn(&MatchKey) -> bool) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if predicate(entry.key()) {
                entry.invalid = true;
                entry.context_invalid |= context;
                marked += 1;
            }
        }
        tracing::debug!(marked, "Cache entries invalidated");
        marked
    }

    /// Evict entries older than their gc time, except those in `keep`.
    pub fn sweep(&self, now: Instant, keep: &HashSet<MatchKey>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| keep.contains(key) || entry.age(now) <= entry.gc_time);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.entries.len(), "Cache swept");
            metrics::record_cache_evictions(evicted);
        }
        metrics::set_cache_entries(self.entries.len());
        evicted
    }
}
