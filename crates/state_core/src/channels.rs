use tokio::sync::mpsc;

use shared::{domain::Channel, error::ChannelClosed, protocol::EventEnvelope};

/// Producer half of the five event channels. Cloned freely into UI event
/// handlers, network callbacks, timers, and reactions; `put` is the only
/// way any of them may request a state change.
#[derive(Clone)]
pub struct ChannelSender {
    controls: mpsc::UnboundedSender<EventEnvelope>,
    nav: mpsc::UnboundedSender<EventEnvelope>,
    api: mpsc::UnboundedSender<EventEnvelope>,
    ws: mpsc::UnboundedSender<EventEnvelope>,
    errors: mpsc::UnboundedSender<EventEnvelope>,
}

impl ChannelSender {
    /// Enqueue an envelope on the channel named by its tag. Unbounded and
    /// FIFO per channel; fails only when the dispatch side is gone.
    pub fn put(&self, envelope: EventEnvelope) -> Result<(), ChannelClosed> {
        let channel = envelope.channel;
        self.sender_for(channel)
            .send(envelope)
            .map_err(|_| ChannelClosed(channel))
    }

    fn sender_for(&self, channel: Channel) -> &mpsc::UnboundedSender<EventEnvelope> {
        match channel {
            Channel::Controls => &self.controls,
            Channel::Nav => &self.nav,
            Channel::Api => &self.api,
            Channel::Ws => &self.ws,
            Channel::Errors => &self.errors,
        }
    }

    /// A handle that can still produce but does not keep the channels open.
    /// Reactions hold this one, so the dispatch loop never pins its own
    /// queues alive at teardown.
    pub fn downgrade(&self) -> WeakChannelSender {
        WeakChannelSender {
            controls: self.controls.downgrade(),
            nav: self.nav.downgrade(),
            api: self.api.downgrade(),
            ws: self.ws.downgrade(),
            errors: self.errors.downgrade(),
        }
    }
}

/// Non-owning producer handle; `put` fails once every strong
/// [`ChannelSender`] is gone.
#[derive(Clone)]
pub struct WeakChannelSender {
    controls: mpsc::WeakUnboundedSender<EventEnvelope>,
    nav: mpsc::WeakUnboundedSender<EventEnvelope>,
    api: mpsc::WeakUnboundedSender<EventEnvelope>,
    ws: mpsc::WeakUnboundedSender<EventEnvelope>,
    errors: mpsc::WeakUnboundedSender<EventEnvelope>,
}

impl WeakChannelSender {
    pub fn put(&self, envelope: EventEnvelope) -> Result<(), ChannelClosed> {
        let channel = envelope.channel;
        let weak = match channel {
            Channel::Controls => &self.controls,
            Channel::Nav => &self.nav,
            Channel::Api => &self.api,
            Channel::Ws => &self.ws,
            Channel::Errors => &self.errors,
        };
        let sender = weak.upgrade().ok_or(ChannelClosed(channel))?;
        sender.send(envelope).map_err(|_| ChannelClosed(channel))
    }
}

/// Consumer half, owned exclusively by the dispatch loop.
pub struct ChannelReceivers {
    pub(crate) controls: mpsc::UnboundedReceiver<EventEnvelope>,
    pub(crate) nav: mpsc::UnboundedReceiver<EventEnvelope>,
    pub(crate) api: mpsc::UnboundedReceiver<EventEnvelope>,
    pub(crate) ws: mpsc::UnboundedReceiver<EventEnvelope>,
    pub(crate) errors: mpsc::UnboundedReceiver<EventEnvelope>,
}

impl ChannelReceivers {
    pub(crate) fn receiver_for(
        &mut self,
        channel: Channel,
    ) -> &mut mpsc::UnboundedReceiver<EventEnvelope> {
        match channel {
            Channel::Controls => &mut self.controls,
            Channel::Nav => &mut self.nav,
            Channel::Api => &mut self.api,
            Channel::Ws => &mut self.ws,
            Channel::Errors => &mut self.errors,
        }
    }
}

/// The five independent, unbounded, ordered event queues.
pub struct ChannelSet;

impl ChannelSet {
    pub fn new() -> (ChannelSender, ChannelReceivers) {
        let (controls_tx, controls_rx) = mpsc::unbounded_channel();
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        let (api_tx, api_rx) = mpsc::unbounded_channel();
        let (ws_tx, ws_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        (
            ChannelSender {
                controls: controls_tx,
                nav: nav_tx,
                api: api_tx,
                ws: ws_tx,
                errors: errors_tx,
            },
            ChannelReceivers {
                controls: controls_rx,
                nav: nav_rx,
                api: api_rx,
                ws: ws_rx,
                errors: errors_rx,
            },
        )
    }
}
