use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, Utc};

/// Process-wide estimate of the server/local clock skew, fed from response
/// timestamps observed on the `api` channel and read wherever times are
/// displayed. Shared by handle, never a global.
#[derive(Clone, Default)]
pub struct ClockOffset {
    millis: Arc<AtomicI64>,
}

impl ClockOffset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a server-reported timestamp, updating the estimate to
    /// `server - local` at the moment of observation.
    pub fn observe(&self, server_time: DateTime<Utc>) {
        let delta = server_time - Utc::now();
        self.millis
            .store(delta.num_milliseconds(), Ordering::Relaxed);
    }

    pub fn offset_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }

    /// Local wall-clock time shifted by the current estimate.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::milliseconds(self.offset_millis())
    }
}
