//! Route masks: display locations in history, real locations in state.

use std::sync::Arc;

use route_navigator::masking::RouteMask;
use route_navigator::navigation::{History, MemoryHistory};
use route_navigator::{NavigateOptions, RouteDef, Router, RouterConfig};

mod common;

fn photo_tree() -> RouteDef {
    RouteDef::root().children([
        RouteDef::index(),
        RouteDef::new("photos/$id").child(RouteDef::new("modal")),
    ])
}

fn router_on(history: Arc<MemoryHistory>, mask: RouteMask) -> Router {
    Router::builder(photo_tree())
        .history(history)
        .mask(mask)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_masked_navigation_shows_display_href() {
    let history = Arc::new(MemoryHistory::new("/"));
    let router = router_on(history.clone(), RouteMask::new("/photos/$id/modal", "/photos/$id").unwrap());

    let outcome = router.navigate(NavigateOptions::to("/photos/5/modal")).await.unwrap();
    let state = outcome.state().unwrap();

    assert_eq!(state.location.pathname, "/photos/5/modal");
    assert_eq!(state.location.display_href(), "/photos/5");
    assert_eq!(state.leaf().unwrap().route_id, "/photos/$id/modal");
    assert_eq!(history.entries(), vec!["/", "/photos/5"]);
    assert_eq!(history.location().href, "/photos/5");
}

#[tokio::test(start_paused = true)]
async fn test_explicit_mask_option() {
    let (router, history) = common::router_at(photo_tree(), "/");

    let options = NavigateOptions::to("/photos/5/modal").mask(NavigateOptions::to("/photos/5"));
    let location = router.build_location(&options).await.unwrap();
    assert_eq!(location.masked_location.as_ref().unwrap().href, "/photos/5");

    router.navigate(options).await.unwrap();
    assert_eq!(history.entries(), vec!["/", "/photos/5"]);
    assert_eq!(router.state().location.pathname, "/photos/5/modal");
}

#[tokio::test(start_paused = true)]
async fn test_reload_keeps_mask_by_default() {
    let history = Arc::new(MemoryHistory::new("/"));
    let mask = RouteMask::new("/photos/$id/modal", "/photos/$id").unwrap();
    let router = router_on(history.clone(), mask.clone());
    router.navigate(NavigateOptions::to("/photos/5/modal")).await.unwrap();

    let reloaded = router_on(history.clone(), mask);
    let state = reloaded.load().await.unwrap();
    assert_eq!(state.state().unwrap().leaf().unwrap().route_id, "/photos/$id/modal");
}

#[tokio::test(start_paused = true)]
async fn test_reload_unmasks_when_asked() {
    let history = Arc::new(MemoryHistory::new("/"));
    let mask = RouteMask::new("/photos/$id/modal", "/photos/$id")
        .unwrap()
        .unmask_on_reload(true);
    let router = router_on(history.clone(), mask.clone());
    router.navigate(NavigateOptions::to("/photos/5/modal")).await.unwrap();

    // same router still sees the real location
    router.load().await.unwrap();
    assert_eq!(router.state().location.pathname, "/photos/5/modal");

    let reloaded = router_on(history.clone(), mask);
    let state = reloaded.load().await.unwrap();
    let state = state.state().unwrap();
    assert_eq!(state.location.pathname, "/photos/5");
    assert_eq!(state.leaf().unwrap().route_id, "/photos/$id");
}

#[tokio::test(start_paused = true)]
async fn test_configured_masks_apply() {
    let mut config = RouterConfig::default();
    config.route_masks = vec![route_navigator::config::RouteMaskConfig {
        from: "/photos/$id/modal".into(),
        to: "/photos/$id".into(),
        keep_search: true,
        keep_hash: false,
        unmask_on_reload: None,
    }];
    let (router, history) = common::router_with(photo_tree(), "/", config);

    router
        .navigate(NavigateOptions::to("/photos/3/modal").search(common::search(serde_json::json!({ "zoom": 2 }))))
        .await
        .unwrap();
    assert_eq!(history.location().href, "/photos/3?zoom=2");
}
