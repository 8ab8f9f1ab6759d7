use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};
use tracing::info;

use shared::{domain::Channel, protocol::EventEnvelope};
use state_core::{
    deep_merge, normalize_sparse, AnalyticsSink, ChannelSet, DispatchOptions, Dispatcher, Effects,
    HandlerPipeline, LensedView, Reaction, Reducer, RouteTable, SnapshotPair, StateStore, UrlSink,
};

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Navigation point to visit during the demo session.
    #[arg(long, default_value = "dashboard")]
    point: String,
    /// Log every dispatched event (overrides shell.toml / env).
    #[arg(long)]
    debug_events: bool,
}

struct StaticRoutes;

impl RouteTable for StaticRoutes {
    fn url_for(&self, payload: &Value) -> Option<String> {
        payload
            .get("point")
            .and_then(Value::as_str)
            .map(|point| format!("/{point}"))
    }
}

struct LoggingUrlSink;

impl UrlSink for LoggingUrlSink {
    fn set_canonical_url(&self, url: &str) {
        info!(url, "canonical URL set");
    }

    fn reset_scroll_containers(&self) {
        info!("scroll containers reset");
    }
}

struct LoggingAnalytics;

impl AnalyticsSink for LoggingAnalytics {
    fn track(&self, event: &str, payload: &Value) {
        info!(event, %payload, "analytics");
    }
}

/// Reports every committed navigation to the analytics collaborator.
struct TrackNavigation;

#[async_trait]
impl Reaction for TrackNavigation {
    async fn react(
        &self,
        event: &str,
        payload: &Value,
        _snapshot: &SnapshotPair,
        fx: &Effects,
    ) -> Result<()> {
        fx.analytics.track(event, payload);
        Ok(())
    }
}

fn nav_reducer() -> Arc<dyn Reducer> {
    Arc::new(|mut state: Value, _: &str, payload: &Value| -> Result<Value> {
        state["current-route"] = payload.get("point").cloned().unwrap_or(Value::Null);
        Ok(state)
    })
}

fn api_reducer() -> Arc<dyn Reducer> {
    Arc::new(|mut state: Value, _: &str, payload: &Value| -> Result<Value> {
        let entities = normalize_sparse(payload.get("entities").cloned().unwrap_or(json!({})));
        let caches = state
            .as_object_mut()
            .and_then(|map| map.remove("caches"))
            .unwrap_or(json!({}));
        state["caches"] = deep_merge(caches, entities);
        Ok(state)
    })
}

fn controls_reducer() -> Arc<dyn Reducer> {
    Arc::new(|mut state: Value, event: &str, payload: &Value| -> Result<Value> {
        state["ui"][event] = payload.clone();
        Ok(state)
    })
}

fn errors_reducer() -> Arc<dyn Reducer> {
    Arc::new(|mut state: Value, _: &str, payload: &Value| -> Result<Value> {
        if let Some(toasts) = state["ui"]["toasts"].as_array_mut() {
            toasts.push(payload.clone());
        }
        Ok(state)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();
    let args = Args::parse();

    let store = StateStore::new(json!({
        "current-route": "home",
        "caches": {},
        "ui": {"toasts": []},
    }));
    let (tx, rx) = ChannelSet::new();
    let fx = Effects::new(tx.downgrade())
        .with_routes(Arc::new(StaticRoutes))
        .with_url_sink(Arc::new(LoggingUrlSink))
        .with_analytics(Arc::new(LoggingAnalytics));

    let mut dispatcher = Dispatcher::new(
        store.clone(),
        rx,
        fx,
        DispatchOptions {
            policy: settings.selection_policy(),
            debug_events: settings.debug_events || args.debug_events,
        },
    );
    dispatcher.register(HandlerPipeline::new(
        Channel::Nav,
        nav_reducer(),
        Arc::new(TrackNavigation),
    ));
    dispatcher.register(HandlerPipeline::reduce_only(Channel::Api, api_reducer()));
    dispatcher.register(HandlerPipeline::reduce_only(
        Channel::Controls,
        controls_reducer(),
    ));
    dispatcher.register(HandlerPipeline::reduce_only(
        Channel::Errors,
        errors_reducer(),
    ));

    // A legacy-facing slice of the tree, watching route changes only.
    let route_view = LensedView::new(store.clone(), ["current-route"]);
    route_view.subscribe(Arc::new(|old, new| {
        info!(%old, %new, "route changed");
        Ok(())
    }));

    // Scripted demo session: navigate, fetch, toggle.
    tx.put(EventEnvelope::correlated(
        Channel::Nav,
        "navigate",
        json!({"point": args.point}),
    ))?;
    tx.put(EventEnvelope::correlated(
        Channel::Api,
        "fetch-user",
        json!({"entities": {"users": {"7": {"id": 7, "name": "Ada"}}}}),
    ))?;
    tx.put(EventEnvelope::correlated(
        Channel::Controls,
        "sidebar-open",
        json!(true),
    ))?;

    let loop_task = tokio::spawn(dispatcher.run());
    drop(tx);
    loop_task.await?;

    println!("{}", serde_json::to_string_pretty(&store.read())?);
    Ok(())
}
