//! History collaborator.
//!
//! # Responsibilities
//! - Expose the current href and state
//! - Record pushes and replacements
//! - Broadcast every change so the router can react to back/forward
//!
//! `MemoryHistory` keeps entries in memory and backs tests and the CLI.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::navigation::location::{HistoryState, STATE_KEY};

/// Raw history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLocation {
    pub href: String,
    pub state: HistoryState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Push,
    Replace,
    /// Back, forward or an arbitrary jump.
    Pop,
}

#[derive(Debug, Clone)]
pub struct HistoryEvent {
    pub action: HistoryAction,
    pub location: HistoryLocation,
}

/// History backend used by the router.
pub trait History: Send + Sync + fmt::Debug {
    fn location(&self) -> HistoryLocation;
    fn push(&self, href: &str, state: HistoryState);
    fn replace(&self, href: &str, state: HistoryState);
    fn subscribe(&self) -> broadcast::Receiver<HistoryEvent>;
}

struct Entries {
    stack: Vec<HistoryLocation>,
    index: usize,
}

/// In-memory history stack.
pub struct MemoryHistory {
    entries: Mutex<Entries>,
    events: broadcast::Sender<HistoryEvent>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self::with_entries([initial], 0)
    }

    /// Start from several entries with `index` active. An out-of-range index
    /// selects the last entry.
    pub fn with_entries<S: AsRef<str>>(hrefs: impl IntoIterator<Item = S>, index: usize) -> Self {
        let mut stack: Vec<HistoryLocation> = hrefs
            .into_iter()
            .map(|href| HistoryLocation {
                href: href.as_ref().to_string(),
                state: keyed(HistoryState::new()),
            })
            .collect();
        if stack.is_empty() {
            stack.push(HistoryLocation {
                href: "/".to_string(),
                state: keyed(HistoryState::new()),
            });
        }
        let index = index.min(stack.len() - 1);
        let (events, _) = broadcast::channel(64);
        Self {
            entries: Mutex::new(Entries { stack, index }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().stack.is_empty()
    }

    pub fn index(&self) -> usize {
        self.lock().index
    }

    /// Hrefs of all entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().stack.iter().map(|e| e.href.clone()).collect()
    }

    pub fn back(&self) {
        self.go(-1);
    }

    pub fn forward(&self) {
        self.go(1);
    }

    /// Move `delta` entries, clamped to the stack. Moving nowhere is silent.
    pub fn go(&self, delta: isize) {
        let location = {
            let mut entries = self.lock();
            let max = entries.stack.len() as isize - 1;
            let target = (entries.index as isize + delta).clamp(0, max) as usize;
            if target == entries.index {
                return;
            }
            entries.index = target;
            entries.stack[target].clone()
        };
        self.emit(HistoryAction::Pop, location);
    }

    fn emit(&self, action: HistoryAction, location: HistoryLocation) {
        tracing::trace!(action = ?action, href = %location.href, "History changed");
        let _ = self.events.send(HistoryEvent { action, location });
    }
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        f.debug_struct("MemoryHistory")
            .field("index", &entries.index)
            .field("len", &entries.stack.len())
            .finish()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> HistoryLocation {
        let entries = self.lock();
        entries.stack[entries.index].clone()
    }

    fn push(&self, href: &str, state: HistoryState) {
        let location = HistoryLocation {
            href: href.to_string(),
            state: keyed(state),
        };
        {
            let mut entries = self.lock();
            let next = entries.index + 1;
            entries.stack.truncate(next);
            entries.stack.push(location.clone());
            entries.index = next;
        }
        self.emit(HistoryAction::Push, location);
    }

    fn replace(&self, href: &str, state: HistoryState) {
        let location = HistoryLocation {
            href: href.to_string(),
            state: keyed(state),
        };
        {
            let mut entries = self.lock();
            let index = entries.index;
            entries.stack[index] = location.clone();
        }
        self.emit(HistoryAction::Replace, location);
    }

    fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }
}

fn keyed(mut state: HistoryState) -> HistoryState {
    if !state.contains_key(STATE_KEY) {
        state.insert(STATE_KEY.to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    state
}
