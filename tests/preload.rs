//! Preloading: cache sharing with navigations, opt-outs and gc.

use std::time::Duration;

use serde_json::{json, Value};

use route_navigator::navigation::{MatchKey, MatchStatus, RouteSignal};
use route_navigator::routing::{Context, LoaderArgs};
use route_navigator::{NavigateOptions, RouteDef, RouterConfig, Shutdown};

mod common;
use common::Counter;

fn to(path: &str) -> NavigateOptions {
    NavigateOptions::to(path)
}

fn post_key(id: &str) -> MatchKey {
    MatchKey::new("/posts/$postId", format!("/posts/{id}"), &Value::Null)
}

fn slow_posts(loads: &Counter) -> RouteDef {
    let loads = loads.clone();
    RouteDef::root().children([
        RouteDef::index(),
        RouteDef::new("posts/$postId").loader(move |args: LoaderArgs| {
            loads.hit();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!({ "id": args.params["postId"], "preload": args.preload }))
            }
        }),
    ])
}

#[tokio::test(start_paused = true)]
async fn test_navigation_joins_in_flight_preload() {
    let loads = Counter::default();
    let (router, _) = common::router_at(slow_posts(&loads), "/");

    let (preloaded, navigated) = tokio::join!(router.preload_route(to("/posts/1")), router.navigate(to("/posts/1")));
    let preloaded = preloaded.unwrap();
    let state = navigated.unwrap();

    assert_eq!(loads.get(), 1);
    assert_eq!(preloaded.last().unwrap().status, MatchStatus::Resolved);
    let leaf = state.state().unwrap().leaf().unwrap().clone();
    assert_eq!(leaf.loader_data, Some(json!({ "id": "1", "preload": true })));
}

#[tokio::test(start_paused = true)]
async fn test_preload_finishing_during_before_load_is_reused() {
    let loads = Counter::default();
    let counted = loads.clone();
    let tree = RouteDef::root().children([
        RouteDef::index(),
        RouteDef::new("posts/$postId")
            .before_load(|args| async move {
                if !args.preload {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Ok::<_, RouteSignal>(Context::new())
            })
            .loader(move |args: LoaderArgs| {
                counted.hit();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(json!({ "id": args.params["postId"] }))
                }
            }),
    ]);
    let (router, _) = common::router_at(tree, "/");

    let (preloaded, navigated) = tokio::join!(router.preload_route(to("/posts/1")), router.navigate(to("/posts/1")));
    preloaded.unwrap();
    let state = navigated.unwrap();

    assert_eq!(loads.get(), 1);
    let leaf = state.state().unwrap().leaf().unwrap().clone();
    assert_eq!(leaf.loader_data, Some(json!({ "id": "1" })));
    assert!(!router.cache().get(&post_key("1")).unwrap().preload);
}

#[tokio::test(start_paused = true)]
async fn test_preloaded_data_is_reused_then_adopted() {
    let loads = Counter::default();
    let (router, _) = common::router_at(slow_posts(&loads), "/");

    let matches = router.preload_route(to("/posts/1")).await.unwrap();
    assert_eq!(loads.get(), 1);
    assert!(matches.iter().all(|m| m.preload));
    assert!(router.cache().get(&post_key("1")).unwrap().preload);

    router.navigate(to("/posts/1")).await.unwrap();
    assert_eq!(loads.get(), 1);
    assert!(!router.cache().get(&post_key("1")).unwrap().preload);
}

#[tokio::test(start_paused = true)]
async fn test_preload_leaves_router_state_alone() {
    let loads = Counter::default();
    let (router, history) = common::router_at(slow_posts(&loads), "/");
    router.load().await.unwrap();
    let rx = router.subscribe();
    let before = *rx.borrow();

    router.preload_route(to("/posts/9")).await.unwrap();

    assert_eq!(*rx.borrow(), before);
    let state = router.state();
    assert_eq!(state.location.pathname, "/");
    assert!(state.pending_matches.is_none());
    assert_eq!(history.entries(), vec!["/"]);
}

#[tokio::test(start_paused = true)]
async fn test_preload_opt_out_skips_loader() {
    let loads = Counter::default();
    let counted = loads.clone();
    let tree = RouteDef::root().child(RouteDef::new("live").preload(false).loader(move |_| {
        counted.hit();
        async { Ok(json!("ticker")) }
    }));
    let (router, _) = common::router_at(tree, "/");

    let matches = router.preload_route(to("/live")).await.unwrap();
    assert_eq!(loads.get(), 0);
    assert_eq!(matches.last().unwrap().loader_data, None);

    router.navigate(to("/live")).await.unwrap();
    assert_eq!(loads.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_preload_ignores_redirects_and_error_hooks() {
    let errors = Counter::default();
    let on_error = errors.clone();
    let tree = RouteDef::root().children([
        RouteDef::index(),
        RouteDef::new("old").before_load(|_| async { Err::<Context, _>(RouteSignal::redirect("/")) }),
        RouteDef::new("broken")
            .loader(|_| async { Err(RouteSignal::error("boom")) })
            .on_error(move |_| {
                on_error.hit();
            }),
    ]);
    let (router, history) = common::router_at(tree, "/");

    assert!(router.preload_route(to("/old")).await.unwrap().is_empty());
    assert_eq!(history.entries(), vec!["/"]);

    let matches = router.preload_route(to("/broken")).await.unwrap();
    assert_eq!(matches.last().unwrap().status, MatchStatus::Error);
    assert_eq!(errors.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_gc_evicts_unused_preloads() {
    let loads = Counter::default();
    let mut config = RouterConfig::default();
    config.cache.gc_interval_ms = 100;
    config.cache.preload_gc_time_ms = 1_000;
    let (router, _) = common::router_with(slow_posts(&loads), "/", config);
    let shutdown = Shutdown::new();
    router.start(&shutdown);

    router.navigate(to("/posts/1")).await.unwrap();
    router.preload_route(to("/posts/2")).await.unwrap();
    assert!(router.cache().get(&post_key("2")).is_some());

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(router.cache().get(&post_key("2")).is_none());
    assert!(router.cache().get(&post_key("1")).is_some());

    shutdown.shutdown(Duration::from_secs(1)).await;
}
