//! Router state and its store.
//!
//! # Responsibilities
//! - Hold the committed and pending navigation state
//! - Serve lock-free snapshots to readers
//! - Apply writes only while the writer's generation is current
//! - Count notifications so subscribers wake once per publish
//!
//! # Design Decisions
//! - Snapshots are `Arc<RouterState>` swapped atomically (`arc-swap`)
//! - Writers serialize on a mutex; the generation check and the write happen
//!   under the same lock, so a superseded navigation can never write
//! - Quiet writes update the snapshot without notifying subscribers

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::navigation::location::Location;
use crate::navigation::matches::RouteMatch;
use crate::navigation::signal::Redirect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStatus {
    Idle,
    Pending,
}

/// Everything a renderer needs to know about the router.
#[derive(Debug, Clone)]
pub struct RouterState {
    pub status: RouterStatus,
    /// Location being navigated to, or the committed one when idle.
    pub location: Location,
    pub resolved_location: Option<Location>,
    pub matches: Vec<RouteMatch>,
    pub pending_matches: Option<Vec<RouteMatch>>,
    pub status_code: u16,
    /// Last redirect followed to reach the current state.
    pub redirect: Option<Redirect>,
    /// Latest navigation started.
    pub generation: u64,
}

impl RouterState {
    pub fn new(location: Location) -> Self {
        Self {
            status: RouterStatus::Idle,
            location,
            resolved_location: None,
            matches: Vec::new(),
            pending_matches: None,
            status_code: 200,
            redirect: None,
            generation: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == RouterStatus::Pending
    }

    pub fn leaf(&self) -> Option<&RouteMatch> {
        self.matches.last()
    }

    pub fn find_match(&self, route_id: &str) -> Option<&RouteMatch> {
        self.matches.iter().find(|m| m.route_id == route_id)
    }
}

/// Shared, versioned router state.
pub struct StateStore {
    current: ArcSwap<RouterState>,
    writer: Mutex<()>,
    version: watch::Sender<u64>,
}

impl StateStore {
    pub fn new(initial: RouterState) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
            version,
        }
    }

    pub fn snapshot(&self) -> Arc<RouterState> {
        self.current.load_full()
    }

    /// Receiver whose value is the number of publishes so far.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn publish_count(&self) -> u64 {
        *self.version.borrow()
    }

    /// Apply `f` unconditionally and notify.
    pub fn update(&self, f: impl FnOnce(&mut RouterState)) {
        self.write(|_| true, f, true);
    }

    /// Apply `f` and notify if `guard` accepts the current state.
    pub fn update_if(&self, guard: impl FnOnce(&RouterState) -> bool, f: impl FnOnce(&mut RouterState)) -> bool {
        self.write(guard, f, true)
    }

    /// Like `update_if` but without notifying.
    pub fn update_quiet_if(
        &self,
        guard: impl FnOnce(&RouterState) -> bool,
        f: impl FnOnce(&mut RouterState),
    ) -> bool {
        self.write(guard, f, false)
    }

    fn write(
        &self,
        guard: impl FnOnce(&RouterState) -> bool,
        f: impl FnOnce(&mut RouterState),
        publish: bool,
    ) -> bool {
        let _lock = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current.load_full();
        if !guard(&current) {
            return false;
        }
        let mut next = RouterState::clone(&current);
        f(&mut next);
        self.current.store(Arc::new(next));
        if publish {
            self.version.send_modify(|v| *v += 1);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::location::HistoryState;

    fn store() -> StateStore {
        StateStore::new(RouterState::new(Location::parse("/", HistoryState::new())))
    }

    #[test]
    fn test_guarded_writes() {
        let store = store();
        store.update(|s| s.generation = 2);
        assert!(!store.update_if(|s| s.generation == 1, |s| s.status_code = 500));
        assert_eq!(store.snapshot().status_code, 200);
        assert!(store.update_if(|s| s.generation == 2, |s| s.status_code = 404));
        assert_eq!(store.snapshot().status_code, 404);
    }

    #[test]
    fn test_quiet_writes_do_not_publish() {
        let store = store();
        let rx = store.subscribe();
        store.update_quiet_if(|_| true, |s| s.status = RouterStatus::Pending);
        assert_eq!(store.publish_count(), 0);
        assert!(store.snapshot().is_loading());
        store.update(|s| s.status = RouterStatus::Idle);
        assert_eq!(store.publish_count(), 1);
        assert_eq!(*rx.borrow(), 1);
    }
}
