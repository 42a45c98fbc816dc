//! Pathname matching.
//!
//! # Responsibilities
//! - Walk the ranked routes and return the first full match with its
//!   ancestor chain (layouts included)
//! - Fall back to a not-found match scoped per `NotFoundMode`
//! - Render a route's path back from params
//!
//! # Design Decisions
//! - Matching compares decoded components against decoded literals
//! - Optional params try "present" first, then backtrack to "absent"
//! - Case-insensitive unless the route says otherwise
//! - Trailing slashes never affect matching; they are applied on rendering

use serde::{Deserialize, Serialize};

use crate::path::codec::{decode_component, decode_splat};
use crate::path::{
    interpolate_path, normalize_pathname, split_pathname, InterpolatedPath, Params, PathSegment, SegmentKind,
    TrailingSlash, SPLAT_PARAM,
};
use crate::routing::tree::{RouteNode, RouteTree};

/// Where an unmatched pathname is scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundMode {
    /// Deepest route whose path matched a prefix of the pathname.
    #[default]
    Fuzzy,
    /// Always the root route.
    Root,
}

/// One route of a match list with the params visible to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pub route_id: String,
    /// Params named by this route's full path.
    pub params: Params,
}

/// Routes from root to leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchList {
    pub routes: Vec<MatchedRoute>,
    /// Every captured param.
    pub params: Params,
}

impl MatchList {
    pub fn leaf(&self) -> Option<&MatchedRoute> {
        self.routes.last()
    }

    pub fn route_ids(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.route_id.as_str()).collect()
    }
}

/// Result of matching a pathname against a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    Found(MatchList),
    /// Nothing matched; the list ends at the route the not-found is scoped to.
    NotFound(MatchList),
}

impl PathMatch {
    pub fn list(&self) -> &MatchList {
        match self {
            PathMatch::Found(list) | PathMatch::NotFound(list) => list,
        }
    }

    pub fn into_list(self) -> MatchList {
        match self {
            PathMatch::Found(list) | PathMatch::NotFound(list) => list,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathMatch::Found(_))
    }
}

/// Matches pathnames and renders paths under one router's settings.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    pub trailing_slash: TrailingSlash,
    pub not_found_mode: NotFoundMode,
    /// Characters left unencoded in rendered params.
    pub allowed_characters: Vec<char>,
}

impl Matcher {
    pub fn new(trailing_slash: TrailingSlash, not_found_mode: NotFoundMode, allowed_characters: Vec<char>) -> Self {
        Self {
            trailing_slash,
            not_found_mode,
            allowed_characters,
        }
    }

    /// Match `pathname` against the ranked routes of `tree`.
    pub fn match_pathname(&self, tree: &RouteTree, pathname: &str) -> PathMatch {
        let parts = split_pathname(pathname);

        for node in tree.flatten() {
            let mut params = Params::new();
            if walk(node.segments(), &parts, node.case_sensitive(), false, &mut params) == Some(0) {
                tracing::trace!(pathname, route_id = %node.id(), "Route matched");
                return PathMatch::Found(match_list(tree, node, params));
            }
        }

        let scope = match self.not_found_mode {
            NotFoundMode::Root => None,
            NotFoundMode::Fuzzy => fuzzy_scope(tree, &parts),
        };
        let (node, params) = scope.unwrap_or_else(|| (tree.root(), Params::new()));
        tracing::debug!(pathname, scope = %node.id(), "No route matched");
        PathMatch::NotFound(match_list(tree, node, params))
    }

    /// Render `node`'s full path with `params`, normalized per the trailing
    /// slash policy.
    pub fn build_path(&self, node: &RouteNode, params: &Params) -> InterpolatedPath {
        self.render(node.segments(), params)
    }

    /// Render arbitrary segments with this matcher's encoding and trailing
    /// slash policy.
    pub fn render(&self, segments: &[PathSegment], params: &Params) -> InterpolatedPath {
        let mut out = interpolate_path(segments, params, &self.allowed_characters);
        out.path = normalize_pathname(&out.path, self.trailing_slash);
        out
    }
}

/// Match a full pathname against a standalone pattern.
pub fn match_segments(segments: &[PathSegment], pathname: &str, case_sensitive: bool) -> Option<Params> {
    let parts = split_pathname(pathname);
    let mut params = Params::new();
    (walk(segments, &parts, case_sensitive, false, &mut params) == Some(0)).then_some(params)
}

fn fuzzy_scope<'t>(tree: &'t RouteTree, parts: &[&str]) -> Option<(&'t RouteNode, Params)> {
    let mut best: Option<(usize, &RouteNode, Params)> = None;
    for node in tree.flatten().filter(|n| !n.is_index() && !n.segments().is_empty()) {
        let mut params = Params::new();
        if let Some(remaining) = walk(node.segments(), parts, node.case_sensitive(), true, &mut params) {
            let consumed = parts.len() - remaining;
            if best.as_ref().map_or(true, |(c, _, _)| consumed > *c) {
                best = Some((consumed, node, params));
            }
        }
    }
    best.map(|(_, node, params)| (node, params))
}

fn match_list(tree: &RouteTree, leaf: &RouteNode, params: Params) -> MatchList {
    let routes = tree
        .ancestors_of(leaf.id())
        .into_iter()
        .map(|node| MatchedRoute {
            route_id: node.id().to_string(),
            params: node
                .segments()
                .iter()
                .filter_map(PathSegment::param_name)
                .filter_map(|name| params.get(name).map(|v| (name.to_string(), v.clone())))
                .collect(),
        })
        .collect();
    MatchList { routes, params }
}

/// Match `segments` against `parts`, returning how many parts were left over.
/// Without `prefix_only` a match must consume every part.
fn walk(
    segments: &[PathSegment],
    parts: &[&str],
    case_sensitive: bool,
    prefix_only: bool,
    params: &mut Params,
) -> Option<usize> {
    let Some((seg, rest)) = segments.split_first() else {
        return (prefix_only || parts.is_empty()).then_some(parts.len());
    };

    match &seg.kind {
        SegmentKind::Static(literal) => {
            let (part, tail) = parts.split_first()?;
            if !eq(&decode_component(part), literal, case_sensitive) {
                return None;
            }
            walk(rest, tail, case_sensitive, prefix_only, params)
        }
        SegmentKind::Param(name) => {
            let (part, tail) = parts.split_first()?;
            let value = strip_affixes(seg, &decode_component(part), case_sensitive).filter(|v| !v.is_empty())?;
            params.insert(name.clone(), value);
            let result = walk(rest, tail, case_sensitive, prefix_only, params);
            if result.is_none() {
                params.remove(name);
            }
            result
        }
        SegmentKind::OptionalParam(name) => {
            if let Some((part, tail)) = parts.split_first() {
                let value = strip_affixes(seg, &decode_component(part), case_sensitive).filter(|v| !v.is_empty());
                if let Some(value) = value {
                    params.insert(name.clone(), value);
                    if let Some(remaining) = walk(rest, tail, case_sensitive, prefix_only, params) {
                        return Some(remaining);
                    }
                    params.remove(name);
                }
            }
            walk(rest, parts, case_sensitive, prefix_only, params)
        }
        SegmentKind::Splat => {
            let has_affix = seg.prefix.is_some() || seg.suffix.is_some();
            if parts.is_empty() && has_affix {
                return None;
            }
            let value = strip_affixes(seg, &decode_splat(&parts.join("/")), case_sensitive)?;
            params.insert(SPLAT_PARAM.to_string(), value);
            Some(0)
        }
    }
}

fn eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a == b || a.to_lowercase() == b.to_lowercase()
    }
}

fn strip_affixes(seg: &PathSegment, value: &str, case_sensitive: bool) -> Option<String> {
    let mut value = value;
    if let Some(prefix) = &seg.prefix {
        let head = value.get(..prefix.len())?;
        if !eq(head, prefix, case_sensitive) {
            return None;
        }
        value = &value[prefix.len()..];
    }
    if let Some(suffix) = &seg.suffix {
        let cut = value.len().checked_sub(suffix.len())?;
        let tail = value.get(cut..)?;
        if !eq(tail, suffix, case_sensitive) {
            return None;
        }
        value = &value[..cut];
    }
    Some(value.to_string())
}
