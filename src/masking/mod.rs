//! Route masking.
//!
//! A masked navigation writes the display location to history and tucks the
//! real one into the entry's state under `__tempLocation`. Reading history
//! back recovers the real location with the display one attached.
//!
//! # Data Flow
//! ```text
//! navigate(internal)
//!     → apply_mask (first RouteMask whose `from` matches)
//!     → encode_masked_state (display state + __tempLocation [+ __tempKey])
//!     → history.push(display href)
//!
//! history entry
//!     → resolve_mask (internal location, masked_location = display)
//! ```
//!
//! `__tempKey` is only written when the mask unmasks on reload. A router
//! only honors it when the key is its own, so a fresh router (a reload)
//! shows the display location as-is.

use serde_json::{json, Value};

use crate::navigation::history::HistoryLocation;
use crate::navigation::location::{HistoryState, Location, STATE_KEY};
use crate::path::{compile, CompiledPattern, PatternError};
use crate::routing::matcher::{match_segments, Matcher};
use crate::search::Search;

/// History state key carrying the real location.
pub const TEMP_LOCATION_KEY: &str = "__tempLocation";

/// History state key tying a masked entry to the router that wrote it.
pub const TEMP_KEY: &str = "__tempKey";

/// Rewrites how matching locations are displayed.
#[derive(Debug, Clone)]
pub struct RouteMask {
    from: CompiledPattern,
    to: CompiledPattern,
    pub keep_search: bool,
    pub keep_hash: bool,
    pub unmask_on_reload: Option<bool>,
}

impl RouteMask {
    /// Mask locations matching `from` as `to`. Params captured by `from`
    /// fill `to`.
    pub fn new(from: &str, to: &str) -> Result<Self, PatternError> {
        Ok(Self {
            from: compile(from)?,
            to: compile(to)?,
            keep_search: false,
            keep_hash: false,
            unmask_on_reload: None,
        })
    }

    pub fn keep_search(mut self) -> Self {
        self.keep_search = true;
        self
    }

    pub fn keep_hash(mut self) -> Self {
        self.keep_hash = true;
        self
    }

    pub fn unmask_on_reload(mut self, unmask: bool) -> Self {
        self.unmask_on_reload = Some(unmask);
        self
    }

    fn display(&self, internal: &Location, matcher: &Matcher, default_unmask: bool) -> Option<Location> {
        let params = match_segments(self.from.segments(), &internal.pathname, false)?;
        let rendered = matcher.render(self.to.segments(), &params);
        if !rendered.is_complete() {
            tracing::debug!(
                from = self.from.raw(),
                to = self.to.raw(),
                missing = ?rendered.missing_params,
                "Route mask skipped"
            );
            return None;
        }

        let search = if self.keep_search {
            internal.search.clone()
        } else {
            Search::new()
        };
        let hash = if self.keep_hash { internal.hash.as_str() } else { "" };
        let mut display = Location::new(rendered.path, search, hash, HistoryState::new());
        display.unmask_on_reload = self.unmask_on_reload.unwrap_or(default_unmask);
        Some(display)
    }
}

/// Display location for `internal` under the first matching mask.
pub fn apply_mask(
    masks: &[RouteMask],
    internal: &Location,
    matcher: &Matcher,
    default_unmask: bool,
) -> Option<Location> {
    masks.iter().find_map(|mask| mask.display(internal, matcher, default_unmask))
}

/// History state for a masked entry: the display state plus the real
/// location, and `temp_key` when the entry should unmask on reload.
pub fn encode_masked_state(display_state: HistoryState, internal: &Location, temp_key: Option<&str>) -> HistoryState {
    let mut state = display_state;
    let mut inner = internal.state.clone();
    inner.remove(STATE_KEY);
    inner.remove(TEMP_LOCATION_KEY);
    inner.remove(TEMP_KEY);

    state.insert(
        TEMP_LOCATION_KEY.to_string(),
        json!({ "href": internal.href, "state": Value::Object(inner) }),
    );
    if let Some(key) = temp_key {
        state.insert(TEMP_KEY.to_string(), Value::String(key.to_string()));
    }
    state
}

/// Recover the real location from a masked history entry.
///
/// Returns `None` for unmasked entries and for entries written with another
/// router's `__tempKey`.
pub fn resolve_mask(entry: &HistoryLocation, temp_key: &str) -> Option<Location> {
    let temp = entry.state.get(TEMP_LOCATION_KEY)?.as_object()?;
    let entry_key = entry.state.get(TEMP_KEY).and_then(Value::as_str);
    if entry_key.is_some_and(|key| key != temp_key) {
        tracing::debug!(href = %entry.href, "Masked entry from another session, showing display location");
        return None;
    }

    let href = temp.get("href")?.as_str()?;
    let mut inner_state = temp.get("state").and_then(Value::as_object).cloned().unwrap_or_default();
    if let Some(key) = entry.state.get(STATE_KEY) {
        inner_state.insert(STATE_KEY.to_string(), key.clone());
    }

    let mut display = Location::parse(&entry.href, entry.state.clone());
    display.unmask_on_reload = entry_key.is_some();

    let mut internal = Location::parse(href, inner_state);
    internal.unmask_on_reload = display.unmask_on_reload;
    internal.masked_location = Some(Box::new(display));
    Some(internal)
}
