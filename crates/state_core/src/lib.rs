//! Client-side state-synchronization core.
//!
//! One mutable state tree, mutated exclusively through a serialized,
//! multiplexed dispatch loop; lensed views let independent subsystems
//! observe and mutate disjoint slices of the tree without knowing about
//! each other. Collaborators (routing table, analytics sink, transports)
//! plug in through the traits in [`collab`] and post work back as channel
//! messages rather than touching the tree directly.

pub mod channels;
pub mod clock;
pub mod collab;
pub mod dispatch;
pub mod lens;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use channels::{ChannelReceivers, ChannelSender, ChannelSet, WeakChannelSender};
pub use clock::ClockOffset;
pub use collab::{AnalyticsSink, Effects, RouteTable, UrlSink};
pub use dispatch::{DispatchOptions, Dispatcher, SelectionPolicy};
pub use lens::{get_in, set_in, LensedView};
pub use normalize::{deep_merge, normalize_sparse};
pub use pipeline::{HandlerPipeline, NoReaction, Reaction, Reducer};
pub use store::{Listener, SnapshotPair, StateStore, SubscriptionId, UpdateOrigin};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
