//! Locations and navigation requests.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::path::Params;
use crate::search::{parse_search, stringify_search, Search};

/// Out-of-band state stored with a history entry.
pub type HistoryState = serde_json::Map<String, Value>;

/// History state key holding the entry's unique key.
pub const STATE_KEY: &str = "key";

/// A parsed location: `pathname?search#hash` plus history state.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub href: String,
    /// Percent-encoded pathname.
    pub pathname: String,
    pub search: Search,
    /// Serialized search, `""` or `?...`.
    pub search_str: String,
    /// Fragment without the `#`.
    pub hash: String,
    pub state: HistoryState,
    /// Location shown to the user when this one is masked.
    pub masked_location: Option<Box<Location>>,
    pub unmask_on_reload: bool,
}

impl Location {
    pub fn new(pathname: impl Into<String>, search: Search, hash: impl Into<String>, state: HistoryState) -> Self {
        let pathname = pathname.into();
        let hash = hash.into();
        let search_str = stringify_search(&search);
        let href = build_href(&pathname, &search_str, &hash);
        Self {
            href,
            pathname,
            search,
            search_str,
            hash,
            state,
            masked_location: None,
            unmask_on_reload: false,
        }
    }

    /// Parse an href such as `/posts?page=2#top`.
    pub fn parse(href: &str, state: HistoryState) -> Self {
        let (rest, hash) = match href.split_once('#') {
            Some((rest, hash)) => (rest, hash),
            None => (href, ""),
        };
        let (pathname, query) = match rest.split_once('?') {
            Some((pathname, query)) => (pathname, query),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };
        let search = parse_search(query);
        let search_str = if query.is_empty() { String::new() } else { format!("?{query}") };
        Self {
            href: build_href(pathname, &search_str, hash),
            pathname: pathname.to_string(),
            search,
            search_str,
            hash: hash.to_string(),
            state,
            masked_location: None,
            unmask_on_reload: false,
        }
    }

    /// Href shown to the user: the mask's when masked.
    pub fn display_href(&self) -> &str {
        self.masked_location.as_deref().map_or(&self.href, |m| &m.href)
    }
}

fn build_href(pathname: &str, search_str: &str, hash: &str) -> String {
    if hash.is_empty() {
        format!("{pathname}{search_str}")
    } else {
        format!("{pathname}{search_str}#{hash}")
    }
}

/// How the next search is derived from the current one.
#[derive(Clone, Default)]
pub enum SearchUpdate {
    /// Start from an empty search.
    #[default]
    Clear,
    /// Keep the current search.
    Keep,
    /// Replace with the given search.
    Set(Search),
    /// Compute from the current search.
    Update(Arc<dyn Fn(&Search) -> Search + Send + Sync>),
}

impl SearchUpdate {
    pub fn apply(&self, current: &Search) -> Search {
        match self {
            SearchUpdate::Clear => Search::new(),
            SearchUpdate::Keep => current.clone(),
            SearchUpdate::Set(search) => search.clone(),
            SearchUpdate::Update(f) => f(current),
        }
    }
}

impl fmt::Debug for SearchUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchUpdate::Clear => write!(f, "Clear"),
            SearchUpdate::Keep => write!(f, "Keep"),
            SearchUpdate::Set(search) => f.debug_tuple("Set").field(search).finish(),
            SearchUpdate::Update(_) => write!(f, "Update(..)"),
        }
    }
}

/// How the next params are derived from the active ones.
#[derive(Clone, Default)]
pub enum ParamsUpdate {
    /// Reuse the active params.
    #[default]
    Inherit,
    /// Active params with the given ones laid over them.
    Merge(Params),
    /// Active params with the function's result laid over them.
    Update(Arc<dyn Fn(&Params) -> Params + Send + Sync>),
}

impl ParamsUpdate {
    pub fn apply(&self, current: &Params) -> Params {
        let mut next = current.clone();
        match self {
            ParamsUpdate::Inherit => {}
            ParamsUpdate::Merge(params) => next.extend(params.clone()),
            ParamsUpdate::Update(f) => next.extend(f(current)),
        }
        next
    }
}

impl fmt::Debug for ParamsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsUpdate::Inherit => write!(f, "Inherit"),
            ParamsUpdate::Merge(params) => f.debug_tuple("Merge").field(params).finish(),
            ParamsUpdate::Update(_) => write!(f, "Update(..)"),
        }
    }
}

/// A navigation request.
#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
    /// Target path, absolute or relative; `None` means the current path.
    pub to: Option<String>,
    /// Route id or path that relative `to` resolves against.
    pub from: Option<String>,
    pub params: ParamsUpdate,
    pub search: SearchUpdate,
    pub hash: Option<String>,
    pub state: Option<HistoryState>,
    pub replace: bool,
    /// Location to display instead of the real one.
    pub mask: Option<Box<NavigateOptions>>,
    pub unmask_on_reload: Option<bool>,
}

impl NavigateOptions {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            to: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_route(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let params = params.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.params = ParamsUpdate::Merge(params);
        self
    }

    pub fn search(mut self, search: Search) -> Self {
        self.search = SearchUpdate::Set(search);
        self
    }

    pub fn keep_search(mut self) -> Self {
        self.search = SearchUpdate::Keep;
        self
    }

    pub fn update_search(mut self, f: impl Fn(&Search) -> Search + Send + Sync + 'static) -> Self {
        self.search = SearchUpdate::Update(Arc::new(f));
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn state(mut self, state: HistoryState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn mask(mut self, mask: NavigateOptions) -> Self {
        self.mask = Some(Box::new(mask));
        self
    }

    pub fn unmask_on_reload(mut self, unmask: bool) -> Self {
        self.unmask_on_reload = Some(unmask);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_href() {
        let loc = Location::parse("/posts?page=2&q=%22x%22#top", HistoryState::new());
        assert_eq!(loc.pathname, "/posts");
        assert_eq!(loc.search["page"], json!(2));
        assert_eq!(loc.search["q"], json!("x"));
        assert_eq!(loc.hash, "top");
        assert_eq!(loc.href, "/posts?page=2&q=%22x%22#top");
    }

    #[test]
    fn test_parse_bare() {
        let loc = Location::parse("", HistoryState::new());
        assert_eq!(loc.pathname, "/");
        assert_eq!(loc.href, "/");
        assert!(loc.search.is_empty());
    }

    #[test]
    fn test_new_builds_href() {
        let mut search = Search::new();
        search.insert("page".into(), json!(3));
        let loc = Location::new("/posts", search, "", HistoryState::new());
        assert_eq!(loc.href, "/posts?page=3");
        assert_eq!(loc.display_href(), "/posts?page=3");
    }

    #[test]
    fn test_updates() {
        let mut current = Search::new();
        current.insert("a".into(), json!(1));
        assert!(SearchUpdate::Clear.apply(&current).is_empty());
        assert_eq!(SearchUpdate::Keep.apply(&current), current);

        let params: Params = [("id".to_string(), "1".to_string())].into_iter().collect();
        let merged = ParamsUpdate::Merge([("tab".to_string(), "x".to_string())].into_iter().collect()).apply(&params);
        assert_eq!(merged.len(), 2);
        assert_eq!(ParamsUpdate::Inherit.apply(&params), params);
    }
}
