//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use route_navigator::navigation::MemoryHistory;
use route_navigator::routing::Context;
use route_navigator::search::Search;
use route_navigator::{RouteDef, Router, RouterConfig};
use serde_json::Value;

/// Thread-safe call counter.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ordered record of callback invocations.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Search map from a JSON object literal.
pub fn search(value: Value) -> Search {
    value.as_object().cloned().unwrap_or_default()
}

/// Context map from a JSON object literal.
pub fn context(value: Value) -> Context {
    value.as_object().cloned().unwrap_or_default()
}

/// Router over an in-memory history starting at `href`.
pub fn router_at(root: RouteDef, href: &str) -> (Router, Arc<MemoryHistory>) {
    router_with(root, href, RouterConfig::default())
}

pub fn router_with(root: RouteDef, href: &str, config: RouterConfig) -> (Router, Arc<MemoryHistory>) {
    let history = Arc::new(MemoryHistory::new(href));
    let router = Router::builder(root)
        .config(config)
        .history(history.clone())
        .build()
        .unwrap();
    (router, history)
}

/// Small blog-shaped tree without callbacks.
pub fn blog_tree() -> RouteDef {
    RouteDef::root().children([
        RouteDef::index(),
        RouteDef::new("posts").children([
            RouteDef::index(),
            RouteDef::new("$postId").child(RouteDef::new("edit")),
        ]),
        RouteDef::new("archive/{-$category}/{-$slug}"),
        RouteDef::pathless("_auth").child(RouteDef::new("dashboard")),
        RouteDef::new("files/$"),
        RouteDef::new("users/user-{$id}.json"),
    ])
}
