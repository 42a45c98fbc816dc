//! Route Navigator CLI
//!
//! Inspect and exercise a declarative route tree from a TOML config.
//!
//! ```text
//! route-navigator --config router.toml match /posts/42
//! route-navigator --config router.toml rank
//! route-navigator --config router.toml href /posts/$postId --param postId=42
//! route-navigator --config router.toml navigate "/posts?page=2"
//! ```
//!
//! Output is JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use route_navigator::config::load_config;
use route_navigator::navigation::{MemoryHistory, NavigationOutcome};
use route_navigator::observability::logging::init_logging;
use route_navigator::path::Params;
use route_navigator::routing::PathMatch;
use route_navigator::{Router, RouterConfig};

#[derive(Parser)]
#[command(name = "route-navigator")]
#[command(about = "Match, rank and navigate a declarative route tree", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a pathname against the route tree
    Match { path: String },
    /// List routes in match order
    Rank,
    /// Render the path of a route
    Href {
        route_id: String,
        /// Param as key=value, repeatable
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Load an href and print the committed state
    Navigate { href: String },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.observability)?;

    tracing::info!(config = %cli.config.display(), "route-navigator v0.1.0 starting");

    let output = match cli.command {
        Commands::Match { path } => {
            let router = build_router(&config, "/")?;
            let (found, list) = match router.match_route(&path) {
                PathMatch::Found(list) => (true, list),
                PathMatch::NotFound(list) => (false, list),
            };
            json!({
                "found": found,
                "routes": list.routes.iter().map(|r| json!({"routeId": r.route_id, "params": r.params})).collect::<Vec<_>>(),
                "params": list.params,
            })
        }
        Commands::Rank => {
            let router = build_router(&config, "/")?;
            let ranked: Vec<Value> = router
                .tree()
                .flatten()
                .map(|node| json!({"id": node.id(), "fullPath": node.full_path()}))
                .collect();
            Value::Array(ranked)
        }
        Commands::Href { route_id, params } => {
            let router = build_router(&config, "/")?;
            let params: Params = params.into_iter().collect();
            json!({ "href": router.href(&route_id, &params)? })
        }
        Commands::Navigate { href } => {
            let router = build_router(&config, &href)?;
            match router.load().await? {
                NavigationOutcome::Committed(state) => json!({
                    "href": state.location.href,
                    "displayHref": state.location.display_href(),
                    "statusCode": state.status_code,
                    "matches": state.matches.iter().map(|m| m.summary()).collect::<Vec<_>>(),
                }),
                NavigationOutcome::Superseded => json!({ "superseded": true }),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_router(config: &RouterConfig, href: &str) -> Result<Router, Box<dyn std::error::Error>> {
    let routes = config
        .routes
        .as_ref()
        .ok_or("config has no [routes] table")?;
    let router = Router::builder(routes.to_root())
        .config(config.clone())
        .history(Arc::new(MemoryHistory::new(href)))
        .build()?;
    Ok(router)
}
