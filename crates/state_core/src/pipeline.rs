use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error};

use shared::{
    domain::Channel,
    error::{FaultPhase, HandlerFault},
    protocol::EventEnvelope,
};

use crate::collab::Effects;
use crate::store::{panic_message, SnapshotPair, StateStore, UpdateOrigin};

/// Pure state transition for one channel: next state from current state and
/// an event. Must not perform side effects; those belong in the reaction.
pub trait Reducer: Send + Sync {
    fn reduce(&self, state: Value, event: &str, payload: &Value) -> Result<Value>;
}

impl<F> Reducer for F
where
    F: Fn(Value, &str, &Value) -> Result<Value> + Send + Sync,
{
    fn reduce(&self, state: Value, event: &str, payload: &Value) -> Result<Value> {
        self(state, event, payload)
    }
}

/// Side-effecting phase run strictly after the reduction commits, given the
/// immutable before/after snapshots. Long-running work must be spawned and
/// post its results back as channel messages instead of blocking the loop.
#[async_trait]
pub trait Reaction: Send + Sync {
    async fn react(
        &self,
        event: &str,
        payload: &Value,
        snapshot: &SnapshotPair,
        fx: &Effects,
    ) -> Result<()>;
}

/// Reaction that does nothing, for channels that only reduce.
pub struct NoReaction;

#[async_trait]
impl Reaction for NoReaction {
    async fn react(&self, _: &str, _: &Value, _: &SnapshotPair, _: &Effects) -> Result<()> {
        Ok(())
    }
}

/// One channel's two-phase handler: reduce through the store's atomic
/// update, then react. The whole unit is fault-contained: an `Err` or panic
/// in either phase becomes a [`HandlerFault`] naming the phase, and the
/// store is never left partially updated (the reduction either fully
/// committed or did not).
pub struct HandlerPipeline {
    channel: Channel,
    reducer: Arc<dyn Reducer>,
    reaction: Arc<dyn Reaction>,
}

impl HandlerPipeline {
    pub fn new(channel: Channel, reducer: Arc<dyn Reducer>, reaction: Arc<dyn Reaction>) -> Self {
        Self {
            channel,
            reducer,
            reaction,
        }
    }

    /// Channel with a pure reducer and no reaction.
    pub fn reduce_only(channel: Channel, reducer: Arc<dyn Reducer>) -> Self {
        Self::new(channel, reducer, Arc::new(NoReaction))
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub async fn execute(
        &self,
        store: &StateStore,
        envelope: &EventEnvelope,
        fx: &Effects,
    ) -> Result<SnapshotPair, HandlerFault> {
        let fault = |phase: FaultPhase, message: String| {
            HandlerFault::new(self.channel, envelope.event.clone(), phase, message)
                .with_correlation_id(envelope.correlation_id)
        };

        let reducer = Arc::clone(&self.reducer);
        let origin = UpdateOrigin {
            channel: self.channel,
            event: envelope.event.clone(),
            correlation_id: envelope.correlation_id,
        };
        let reduced = panic::catch_unwind(AssertUnwindSafe(|| {
            store.try_update_traced(&origin, |state| {
                reducer.reduce(state, &envelope.event, &envelope.payload)
            })
        }));
        let snapshot = match reduced {
            Ok(Ok((pair, listener_faults))) => {
                // Listener faults are terminal to nobody: logged with the
                // originating message's identity, commit stands.
                for listener_fault in listener_faults {
                    error!(
                        channel = %listener_fault.channel,
                        event = %listener_fault.event,
                        correlation_id = ?listener_fault.correlation_id,
                        message = %listener_fault.message,
                        "listener fault contained"
                    );
                }
                pair
            }
            Ok(Err(err)) => return Err(fault(FaultPhase::Reduce, format!("{err:#}"))),
            Err(payload) => {
                return Err(fault(
                    FaultPhase::Reduce,
                    panic_message(payload.as_ref()).to_string(),
                ))
            }
        };

        self.commit_effects(envelope, fx);

        let reacted = AssertUnwindSafe(
            self.reaction
                .react(&envelope.event, &envelope.payload, &snapshot, fx),
        )
        .catch_unwind()
        .await;
        match reacted {
            Ok(Ok(())) => Ok(snapshot),
            Ok(Err(err)) => Err(fault(FaultPhase::React, format!("{err:#}"))),
            Err(payload) => Err(fault(
                FaultPhase::React,
                panic_message(payload.as_ref()).to_string(),
            )),
        }
    }

    /// Channel-specific effects applied at every commit, before the
    /// registered reaction runs.
    fn commit_effects(&self, envelope: &EventEnvelope, fx: &Effects) {
        match self.channel {
            Channel::Nav => {
                if let Some(url) = fx.routes.url_for(&envelope.payload) {
                    fx.url_sink.set_canonical_url(&url);
                } else {
                    debug!(event = %envelope.event, "nav payload resolved to no URL");
                }
                fx.url_sink.reset_scroll_containers();
            }
            Channel::Api => {
                if let Some(server_time) = response_timestamp(&envelope.payload) {
                    fx.clock.observe(server_time);
                }
            }
            Channel::Controls | Channel::Ws | Channel::Errors => {}
        }
    }
}

/// Server timestamp carried in an `api` payload: the top-level
/// `response_ts` member, as RFC 3339 text or epoch milliseconds.
fn response_timestamp(payload: &Value) -> Option<DateTime<Utc>> {
    match payload.get("response_ts")? {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| DateTime::<Utc>::from_timestamp_millis(millis)),
        _ => None,
    }
}
