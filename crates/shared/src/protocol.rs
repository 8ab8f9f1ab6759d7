use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Channel, CorrelationId};

/// A single message on one of the event channels. The payload shape is
/// defined by the producing collaborator; the core only routes on `channel`
/// and hands `event`/`payload` to the registered pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub channel: Channel,
    pub event: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl EventEnvelope {
    pub fn new(channel: Channel, event: impl Into<String>, payload: Value) -> Self {
        Self {
            channel,
            event: event.into(),
            payload,
            correlation_id: None,
        }
    }

    /// Attach a fresh correlation id for diagnostic log stitching.
    pub fn correlated(channel: Channel, event: impl Into<String>, payload: Value) -> Self {
        Self::new(channel, event, payload).with_correlation_id(CorrelationId::new())
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }
}
