use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five event sources multiplexed by the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Controls,
    Nav,
    Api,
    Ws,
    Errors,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Controls,
        Channel::Nav,
        Channel::Api,
        Channel::Ws,
        Channel::Errors,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Controls => "controls",
            Channel::Nav => "nav",
            Channel::Api => "api",
            Channel::Ws => "ws",
            Channel::Errors => "errors",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque per-message diagnostic identifier. Carried out-of-band in the
/// envelope; never consulted for routing or reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
