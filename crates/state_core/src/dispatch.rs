use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use futures::future::poll_fn;
use tracing::{debug, error, warn};

use shared::{domain::Channel, protocol::EventEnvelope};

use crate::channels::ChannelReceivers;
use crate::collab::Effects;
use crate::pipeline::HandlerPipeline;
use crate::store::StateStore;

/// How the loop picks among channels with pending messages. Per-channel
/// FIFO holds under either policy; only the cross-channel interleaving
/// differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Fairness default: after serving channel *i*, the next ready-scan
    /// starts at *i* + 1, so a saturated channel cannot starve the rest.
    RoundRobin,
    /// Always scan in the given order. Deterministic, for tests.
    Fixed([Channel; 5]),
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub policy: SelectionPolicy,
    pub debug_events: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::RoundRobin,
            debug_events: false,
        }
    }
}

/// The single cooperative loop serializing every state mutation.
///
/// Takes exactly one envelope at a time and runs its pipeline to completion
/// (reduction and reaction) before receiving the next, so at most one
/// reduction is in flight at any instant. Reactions enqueue follow-up
/// messages through the sender handle; those surface on later iterations,
/// never recursively.
pub struct Dispatcher {
    store: StateStore,
    receivers: ChannelReceivers,
    fx: Effects,
    pipelines: HashMap<Channel, HandlerPipeline>,
    order: [Channel; 5],
    cursor: usize,
    rotate: bool,
    debug_events: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        store: StateStore,
        receivers: ChannelReceivers,
        fx: Effects,
        options: DispatchOptions,
    ) -> Self {
        let (order, rotate) = match options.policy {
            SelectionPolicy::RoundRobin => (Channel::ALL, true),
            SelectionPolicy::Fixed(order) => (order, false),
        };
        Self {
            store,
            receivers,
            fx,
            pipelines: HashMap::new(),
            order,
            cursor: 0,
            rotate,
            debug_events: Arc::new(AtomicBool::new(options.debug_events)),
        }
    }

    /// Install the pipeline for its channel, replacing any previous one.
    pub fn register(&mut self, pipeline: HandlerPipeline) {
        self.pipelines.insert(pipeline.channel(), pipeline);
    }

    pub fn store(&self) -> StateStore {
        self.store.clone()
    }

    /// Runtime toggle for the per-event diagnostic log line.
    pub fn debug_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.debug_events)
    }

    /// Run until every producer handle is dropped and the queues are
    /// drained. In normal operation producers live for the process
    /// lifetime, so this only returns at teardown.
    pub async fn run(mut self) {
        loop {
            let Some(envelope) = poll_fn(|cx| self.poll_next(cx)).await else {
                break;
            };
            self.dispatch_one(envelope).await;
        }
        debug!("all channels closed; dispatch loop exiting");
    }

    /// Process everything already enqueued, then return without waiting.
    /// Follow-ups posted by reactions along the way are processed too.
    pub async fn run_until_idle(&mut self) {
        while let Some(envelope) = self.try_next() {
            self.dispatch_one(envelope).await;
        }
    }

    /// Poll channels in policy order; `None` once all are closed and empty.
    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<EventEnvelope>> {
        let mut any_open = false;
        for i in 0..self.order.len() {
            let idx = (self.cursor + i) % self.order.len();
            let channel = self.order[idx];
            match self.receivers.receiver_for(channel).poll_recv(cx) {
                Poll::Ready(Some(envelope)) => {
                    self.advance_cursor(idx);
                    return Poll::Ready(Some(envelope));
                }
                Poll::Ready(None) => {}
                Poll::Pending => any_open = true,
            }
        }
        if any_open {
            Poll::Pending
        } else {
            Poll::Ready(None)
        }
    }

    fn try_next(&mut self) -> Option<EventEnvelope> {
        for i in 0..self.order.len() {
            let idx = (self.cursor + i) % self.order.len();
            let channel = self.order[idx];
            if let Ok(envelope) = self.receivers.receiver_for(channel).try_recv() {
                self.advance_cursor(idx);
                return Some(envelope);
            }
        }
        None
    }

    fn advance_cursor(&mut self, served: usize) {
        if self.rotate {
            self.cursor = (served + 1) % self.order.len();
        }
    }

    async fn dispatch_one(&self, envelope: EventEnvelope) {
        if self.debug_events.load(Ordering::Relaxed) {
            debug!(
                channel = %envelope.channel,
                event = %envelope.event,
                correlation_id = ?envelope.correlation_id,
                "dispatching event"
            );
        }
        let Some(pipeline) = self.pipelines.get(&envelope.channel) else {
            warn!(
                channel = %envelope.channel,
                event = %envelope.event,
                "no pipeline registered; message dropped"
            );
            return;
        };
        if let Err(fault) = pipeline.execute(&self.store, &envelope, &self.fx).await {
            error!(
                channel = %fault.channel,
                event = %fault.event,
                phase = ?fault.phase,
                correlation_id = ?fault.correlation_id,
                message = %fault.message,
                "handler fault contained"
            );
        }
    }
}
