use std::sync::Arc;

use serde_json::Value;

use crate::channels::WeakChannelSender;
use crate::clock::ClockOffset;

/// Maps a `nav` payload to a canonical URL string. Route matching itself
/// lives with the collaborator; the core only forwards the result.
pub trait RouteTable: Send + Sync {
    fn url_for(&self, payload: &Value) -> Option<String>;
}

/// Where the canonical URL and scroll positions are pushed after a `nav`
/// reduction commits.
pub trait UrlSink: Send + Sync {
    fn set_canonical_url(&self, url: &str);
    fn reset_scroll_containers(&self);
}

pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, payload: &Value);
}

/// No-op collaborators for wiring slots a deployment leaves empty.
pub struct NoopCollaborator;

impl RouteTable for NoopCollaborator {
    fn url_for(&self, _payload: &Value) -> Option<String> {
        None
    }
}

impl UrlSink for NoopCollaborator {
    fn set_canonical_url(&self, _url: &str) {}
    fn reset_scroll_containers(&self) {}
}

impl AnalyticsSink for NoopCollaborator {
    fn track(&self, _event: &str, _payload: &Value) {}
}

/// Everything a reaction may touch besides the state snapshots: the channel
/// producer handle (for follow-up messages), the collaborator seams, and
/// the shared clock-offset estimate.
#[derive(Clone)]
pub struct Effects {
    pub channels: WeakChannelSender,
    pub routes: Arc<dyn RouteTable>,
    pub url_sink: Arc<dyn UrlSink>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub clock: ClockOffset,
}

impl Effects {
    pub fn new(channels: WeakChannelSender) -> Self {
        let noop = Arc::new(NoopCollaborator);
        Self {
            channels,
            routes: noop.clone(),
            url_sink: noop.clone(),
            analytics: noop,
            clock: ClockOffset::new(),
        }
    }

    pub fn with_routes(mut self, routes: Arc<dyn RouteTable>) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_url_sink(mut self, url_sink: Arc<dyn UrlSink>) -> Self {
        self.url_sink = url_sink;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_clock(mut self, clock: ClockOffset) -> Self {
        self.clock = clock;
        self
    }
}
