//! Periodic cache garbage collection.
//!
//! # Responsibilities
//! - Sweep the match cache on a fixed interval
//! - Never evict entries backing the committed match list

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cache::store::MatchCache;
use crate::navigation::state::StateStore;

pub struct GcSweeper {
    cache: MatchCache,
    state: Arc<StateStore>,
    interval: Duration,
}

impl GcSweeper {
    pub fn new(cache: MatchCache, state: Arc<StateStore>, interval: Duration) -> Self {
        Self { cache, state, interval }
    }

    /// Sweep once. Returns the number of evicted entries.
    pub fn sweep(&self) -> usize {
        let snapshot = self.state.snapshot();
        let keep: HashSet<_> = snapshot
            .matches
            .iter()
            .chain(snapshot.pending_matches.iter().flatten())
            .map(|m| m.key.clone())
            .collect();
        self.cache.sweep(Instant::now(), &keep)
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Cache gc starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache gc received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
