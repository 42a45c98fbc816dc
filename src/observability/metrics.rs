//! Router metrics.
//!
//! # Metrics
//! - `router_navigations_total` (counter): navigations by `outcome`
//!   (`committed`, `superseded`, `redirect_limit`, `failed`)
//! - `router_redirects_total` (counter): redirects followed
//! - `router_loader_invocations_total` (counter): loader calls by `route`
//! - `router_cache_hits_total` (counter): loader results reused by `route`
//! - `router_cache_entries` (gauge): entries in the match cache
//! - `router_cache_evictions_total` (counter): entries removed by gc sweeps

use metrics::{counter, gauge};

pub fn record_navigation(outcome: &'static str) {
    counter!("router_navigations_total", "outcome" => outcome).increment(1);
}

pub fn record_redirect() {
    counter!("router_redirects_total").increment(1);
}

pub fn record_loader_invocation(route_id: &str) {
    counter!("router_loader_invocations_total", "route" => route_id.to_string()).increment(1);
}

pub fn record_cache_hit(route_id: &str) {
    counter!("router_cache_hits_total", "route" => route_id.to_string()).increment(1);
}

pub fn set_cache_entries(entries: usize) {
    gauge!("router_cache_entries").set(entries as f64);
}

pub fn record_cache_evictions(evicted: usize) {
    counter!("router_cache_evictions_total").increment(evicted as u64);
}
