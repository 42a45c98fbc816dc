//! Route tree construction.
//!
//! # Responsibilities
//! - Flatten nested `RouteDef`s into an arena of `RouteNode`s (pre-order)
//! - Derive ids and full paths from tree position
//! - Compile every path pattern and reject malformed trees
//! - Rank routable nodes once, at build time
//!
//! # Design Decisions
//! - Nodes live in a `Vec` and refer to each other by index
//! - Options beyond the skeleton are resolved lazily, at most once per node

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::path::{
    compile, join_paths, trim_path, trim_path_left, trim_path_right, PathSegment, PatternError, SegmentKind,
};
use crate::routing::rank::{self, RankEntry, RankToken};
use crate::routing::route::{LazyFn, RouteDef, RouteKind, RouteOptions};

/// Id of the root route.
pub const ROOT_ROUTE_ID: &str = "__root__";

/// Errors raised while building a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("the top-level definition must be the root route")]
    MissingRoot,

    #[error("root route nested under `{parent}`")]
    NestedRoot { parent: String },

    #[error("duplicate route id `{id}`")]
    DuplicateId { id: String },

    #[error("route under `{parent}` has an empty path")]
    EmptyPath { parent: String },

    #[error("pathless route under `{parent}` needs an id")]
    PathlessWithoutId { parent: String },

    #[error("route `{id}` ends in a splat and cannot have routed children")]
    SplatWithChildren { id: String },

    #[error("index route `{id}` cannot have children")]
    IndexWithChildren { id: String },

    #[error("route `{id}`: {source}")]
    Pattern {
        id: String,
        #[source]
        source: PatternError,
    },
}

/// Build-time settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    /// Default for routes that do not set `case_sensitive` themselves.
    pub case_sensitive: bool,
}

/// A route in the built tree.
pub struct RouteNode {
    id: String,
    path: Option<String>,
    full_path: String,
    parent: Option<usize>,
    children: Vec<usize>,
    position: usize,
    is_index: bool,
    case_sensitive: bool,
    segments: Vec<PathSegment>,
    options: RouteOptions,
    lazy: Option<LazyFn>,
    resolved: OnceCell<RouteOptions>,
}

impl RouteNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path as written, trimmed; `None` for the root and pathless layouts.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Joined pattern of all ancestors. Index routes end with `/`.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_index(&self) -> bool {
        self.is_index
    }

    pub fn is_pathless(&self) -> bool {
        self.path.is_none() && !self.is_root()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Segments of the full path, ancestors' included.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Complete options, resolving the lazy part on first call.
    pub async fn options(&self) -> &RouteOptions {
        self.resolved
            .get_or_init(|| async {
                match &self.lazy {
                    Some(lazy) => {
                        tracing::debug!(route_id = %self.id, "Resolving lazy route options");
                        self.options.clone().merge_missing(lazy().await)
                    }
                    None => self.options.clone(),
                }
            })
            .await
    }

    fn rank_tokens(&self) -> Vec<RankToken<'_>> {
        let mut tokens: Vec<RankToken<'_>> = self.segments.iter().map(RankToken::Segment).collect();
        if self.is_index {
            tokens.push(RankToken::Slash);
        }
        tokens
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("id", &self.id)
            .field("full_path", &self.full_path)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Immutable route tree with precomputed ranking.
#[derive(Debug)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
    by_id: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
    ranked: Vec<usize>,
}

impl RouteTree {
    /// Build with case-insensitive matching by default.
    pub fn build(root: RouteDef) -> Result<Self, TreeError> {
        Self::build_with(root, TreeOptions::default())
    }

    pub fn build_with(root: RouteDef, opts: TreeOptions) -> Result<Self, TreeError> {
        if root.kind != RouteKind::Root {
            return Err(TreeError::MissingRoot);
        }

        let mut builder = Builder {
            nodes: Vec::new(),
            by_id: HashMap::new(),
            opts,
        };
        builder.add(root, None)?;
        let Builder { nodes, by_id, .. } = builder;

        let mut by_path = HashMap::new();
        for node in nodes.iter().filter(|n| n.path.is_some()) {
            let key = trim_path_right(&node.full_path).to_string();
            if !by_path.contains_key(&key) || node.full_path.ends_with('/') {
                by_path.insert(key, node.position);
            }
        }

        let entries = nodes
            .iter()
            .filter(|n| n.path.is_some())
            .map(|n| RankEntry::new(n.position, &n.rank_tokens()))
            .collect();
        let ranked = rank::rank(entries);

        tracing::debug!(routes = nodes.len(), routable = ranked.len(), "Route tree built");

        Ok(Self {
            nodes,
            by_id,
            by_path,
            ranked,
        })
    }

    pub fn root(&self) -> &RouteNode {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&RouteNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    /// Node whose full path is `path`, trailing slash ignored. Index routes
    /// win over their layout.
    pub fn lookup_by_path(&self, path: &str) -> Option<&RouteNode> {
        self.by_path.get(trim_path_right(path)).map(|&i| &self.nodes[i])
    }

    /// Chain from the root down to and including `id`.
    pub fn ancestors_of(&self, id: &str) -> Vec<&RouteNode> {
        let mut chain = Vec::new();
        let mut current = self.by_id.get(id).copied();
        while let Some(i) = current {
            chain.push(&self.nodes[i]);
            current = self.nodes[i].parent;
        }
        chain.reverse();
        chain
    }

    /// Routable nodes in match order.
    pub fn flatten(&self) -> impl Iterator<Item = &RouteNode> + '_ {
        self.ranked.iter().map(|&i| &self.nodes[i])
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteNode> + '_ {
        self.nodes.iter()
    }
}

struct Builder {
    nodes: Vec<RouteNode>,
    by_id: HashMap<String, usize>,
    opts: TreeOptions,
}

impl Builder {
    fn add(&mut self, def: RouteDef, parent: Option<usize>) -> Result<(), TreeError> {
        let parent_node = parent.map(|p| &self.nodes[p]);
        let parent_id = parent_node.map_or("", |p| p.id.as_str());
        let parent_base = parent_node.map_or("/", |p| trim_path_right(&p.full_path)).to_string();
        let parent_id_base = match parent_node {
            Some(p) if !p.is_root() => p.id.clone(),
            _ => String::new(),
        };
        let mut segments = parent_node.map(|p| p.segments.clone()).unwrap_or_default();
        let parent_case = parent_node.map(|p| p.case_sensitive);

        let (id, path, full_path, is_index) = match &def.kind {
            RouteKind::Root => {
                if parent.is_some() {
                    return Err(TreeError::NestedRoot {
                        parent: parent_id.to_string(),
                    });
                }
                let id = def.id.clone().unwrap_or_else(|| ROOT_ROUTE_ID.to_string());
                (id, None, "/".to_string(), false)
            }
            RouteKind::Pathless => {
                let token = def.id.clone().unwrap_or_default();
                if trim_path(&token).trim_matches('/').is_empty() {
                    return Err(TreeError::PathlessWithoutId {
                        parent: parent_id.to_string(),
                    });
                }
                let id = join_paths(&[parent_id_base.as_str(), "/", token.as_str()]);
                (id, None, parent_base.clone(), false)
            }
            RouteKind::Path(raw) if raw.is_empty() => {
                return Err(TreeError::EmptyPath {
                    parent: parent_id.to_string(),
                });
            }
            RouteKind::Path(raw) if trim_path_right(raw) == "/" => {
                let token = def.id.clone().unwrap_or_else(|| "/".to_string());
                let id = join_paths(&[parent_id_base.as_str(), "/", token.as_str()]);
                let full_path = if parent_base == "/" {
                    "/".to_string()
                } else {
                    format!("{parent_base}/")
                };
                (id, Some("/".to_string()), full_path, true)
            }
            RouteKind::Path(raw) => {
                let trimmed = trim_path_right(trim_path_left(raw)).to_string();
                let token = def.id.clone().unwrap_or_else(|| trimmed.clone());
                let id = join_paths(&[parent_id_base.as_str(), "/", token.as_str()]);
                let full_path = join_paths(&[parent_base.as_str(), "/", trimmed.as_str()]);
                let compiled = compile(&trimmed).map_err(|source| TreeError::Pattern {
                    id: id.clone(),
                    source,
                })?;
                segments.extend(compiled.into_segments());
                (id, Some(trimmed), full_path, false)
            }
        };

        if self.by_id.contains_key(&id) {
            return Err(TreeError::DuplicateId { id });
        }
        check_segments(&id, &full_path, &segments)?;

        let ends_in_splat = segments.last().is_some_and(|s| s.kind == SegmentKind::Splat);
        if is_index && !def.children.is_empty() {
            return Err(TreeError::IndexWithChildren { id });
        }
        if ends_in_splat && path.is_some() && has_routed_child(&def.children) {
            return Err(TreeError::SplatWithChildren { id });
        }

        let position = self.nodes.len();
        let case_sensitive = def
            .case_sensitive
            .or(parent_case)
            .unwrap_or(self.opts.case_sensitive);
        self.nodes.push(RouteNode {
            id: id.clone(),
            path,
            full_path,
            parent,
            children: Vec::new(),
            position,
            is_index,
            case_sensitive,
            segments,
            options: def.options,
            lazy: def.lazy,
            resolved: OnceCell::new(),
        });
        self.by_id.insert(id, position);
        if let Some(p) = parent {
            self.nodes[p].children.push(position);
        }

        for child in def.children {
            self.add(child, Some(position))?;
        }
        Ok(())
    }
}

fn has_routed_child(children: &[RouteDef]) -> bool {
    children.iter().any(|c| match c.kind {
        RouteKind::Path(_) => true,
        RouteKind::Pathless => has_routed_child(&c.children),
        RouteKind::Root => false,
    })
}

fn check_segments(id: &str, full_path: &str, segments: &[PathSegment]) -> Result<(), TreeError> {
    let pattern_error = |source| TreeError::Pattern {
        id: id.to_string(),
        source,
    };
    if let Some(pos) = segments.iter().position(|s| s.kind == SegmentKind::Splat) {
        if pos + 1 != segments.len() {
            return Err(pattern_error(PatternError::SplatNotLast {
                pattern: full_path.to_string(),
            }));
        }
    }
    let mut seen = HashSet::new();
    for name in segments.iter().filter_map(PathSegment::param_name) {
        if !seen.insert(name) {
            return Err(pattern_error(PatternError::DuplicateParam {
                pattern: full_path.to_string(),
                name: name.to_string(),
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RouteTree {
        RouteTree::build(
            RouteDef::root().children([
                RouteDef::index(),
                RouteDef::new("posts").children([
                    RouteDef::index(),
                    RouteDef::new("$postId").child(RouteDef::new("edit")),
                ]),
                RouteDef::pathless("_auth").child(RouteDef::new("dashboard")),
                RouteDef::new("files/$"),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_ids_and_full_paths() {
        let tree = sample();
        let ids: Vec<(&str, &str)> = tree.iter().map(|n| (n.id(), n.full_path())).collect();
        assert_eq!(
            ids,
            vec![
                ("__root__", "/"),
                ("/", "/"),
                ("/posts", "/posts"),
                ("/posts/", "/posts/"),
                ("/posts/$postId", "/posts/$postId"),
                ("/posts/$postId/edit", "/posts/$postId/edit"),
                ("/_auth", "/"),
                ("/_auth/dashboard", "/dashboard"),
                ("/files/$", "/files/$"),
            ]
        );
    }

    #[test]
    fn test_ancestors_include_layouts() {
        let tree = sample();
        let chain: Vec<&str> = tree.ancestors_of("/_auth/dashboard").iter().map(|n| n.id()).collect();
        assert_eq!(chain, vec!["__root__", "/_auth", "/_auth/dashboard"]);
        assert!(tree.lookup_by_id("/_auth").unwrap().is_pathless());
        assert!(tree.ancestors_of("/missing").is_empty());
    }

    #[test]
    fn test_flatten_is_ranked() {
        let tree = sample();
        let order: Vec<&str> = tree.flatten().map(|n| n.id()).collect();
        assert_eq!(
            order,
            vec![
                "/posts/",
                "/posts/$postId/edit",
                "/posts/$postId",
                "/_auth/dashboard",
                "/posts",
                "/files/$",
                "/",
            ]
        );
        assert!(tree.flatten().all(|n| !n.is_root() && !n.is_pathless()));
    }

    #[test]
    fn test_lookup_by_path_prefers_index() {
        let tree = sample();
        assert_eq!(tree.lookup_by_path("/posts").unwrap().id(), "/posts/");
        assert_eq!(tree.lookup_by_path("/dashboard").unwrap().id(), "/_auth/dashboard");
    }

    #[test]
    fn test_rejects_malformed_trees() {
        assert_eq!(RouteTree::build(RouteDef::new("a")).unwrap_err(), TreeError::MissingRoot);

        let dup = RouteDef::root().children([RouteDef::new("a"), RouteDef::new("/a/")]);
        assert_eq!(RouteTree::build(dup).unwrap_err(), TreeError::DuplicateId { id: "/a".into() });

        let splat = RouteDef::root().child(RouteDef::new("files/$").child(RouteDef::new("x")));
        assert!(matches!(RouteTree::build(splat), Err(TreeError::SplatWithChildren { .. })));

        let dup_param = RouteDef::root().child(RouteDef::new("$id").child(RouteDef::new("$id")));
        assert!(matches!(
            RouteTree::build(dup_param),
            Err(TreeError::Pattern {
                source: PatternError::DuplicateParam { .. },
                ..
            })
        ));

        let bad = RouteDef::root().child(RouteDef::new("{$oops"));
        assert!(matches!(RouteTree::build(bad), Err(TreeError::Pattern { .. })));

        let anonymous = RouteDef::root().child(RouteDef::pathless(""));
        assert!(matches!(RouteTree::build(anonymous), Err(TreeError::PathlessWithoutId { .. })));

        let nested = RouteDef::root().child(RouteDef::root());
        assert!(matches!(RouteTree::build(nested), Err(TreeError::NestedRoot { .. })));
    }

    #[test]
    fn test_case_sensitivity_inherits() {
        let tree = RouteTree::build(
            RouteDef::root().child(RouteDef::new("Docs").case_sensitive(true).child(RouteDef::new("Intro"))),
        )
        .unwrap();
        assert!(tree.lookup_by_id("/Docs/Intro").unwrap().case_sensitive());
        assert!(!tree.root().case_sensitive());
    }

    #[tokio::test]
    async fn test_lazy_options_resolve_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let tree = RouteTree::build(RouteDef::root().child(RouteDef::new("lazy").stale_time(Duration::from_secs(1)).lazy(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    RouteOptions {
                        stale_time: Some(Duration::from_secs(99)),
                        preload: Some(false),
                        ..RouteOptions::default()
                    }
                }
            },
        )))
        .unwrap();

        let node = tree.lookup_by_id("/lazy").unwrap();
        let options = node.options().await;
        assert_eq!(options.stale_time, Some(Duration::from_secs(1)));
        assert_eq!(options.preload, Some(false));
        node.options().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
