use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Channel, CorrelationId};
use crate::protocol::EventEnvelope;

/// Where inside one message's handling a contained fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPhase {
    Reduce,
    React,
    Notify,
}

/// A contained fault from one message's reduction or reaction. Terminal only
/// to that message; the dispatch loop keeps running. Serializable so a
/// collaborator can re-post it onto the `errors` channel for a visible
/// degradation path (a toast, a banner).
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{phase:?} fault on {channel} event `{event}`: {message}")]
pub struct HandlerFault {
    pub channel: Channel,
    pub event: String,
    pub phase: FaultPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl HandlerFault {
    pub fn new(
        channel: Channel,
        event: impl Into<String>,
        phase: FaultPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            event: event.into(),
            phase,
            message: message.into(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: Option<CorrelationId>) -> Self {
        self.correlation_id = id;
        self
    }

    /// Package the fault as an `errors`-channel message, preserving the
    /// correlation id of the message that faulted.
    pub fn into_envelope(self) -> EventEnvelope {
        let correlation_id = self.correlation_id;
        let payload = serde_json::to_value(&self).unwrap_or(Value::Null);
        let mut envelope = EventEnvelope::new(Channel::Errors, "handler-fault", payload);
        envelope.correlation_id = correlation_id;
        envelope
    }
}

/// Producing onto a channel whose receiving side has been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel {0} is closed")]
pub struct ChannelClosed(pub Channel);
