use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use anyhow::Result;
use serde_json::Value;
use tracing::error;

use shared::{
    domain::{Channel, CorrelationId},
    error::{FaultPhase, HandlerFault},
};

/// Immutable (previous, next) values captured around a single reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPair {
    pub previous: Value,
    pub next: Value,
}

/// Identity of the message whose reduction is committing, used to attribute
/// listener faults to the fault taxonomy.
#[derive(Debug, Clone)]
pub struct UpdateOrigin {
    pub channel: Channel,
    pub event: String,
    pub correlation_id: Option<CorrelationId>,
}

struct ListenerFailure {
    subscription: u64,
    message: String,
}

/// Callback invoked after a committed update with (old, new). Errors and
/// panics are contained at the store boundary and never unwind the update.
pub type Listener = Arc<dyn Fn(&Value, &Value) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct StoreInner {
    state: Mutex<Value>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_subscription: AtomicU64,
}

/// The single mutable root holding the entire application state tree.
///
/// Constructed once at startup; the handle is cheap to clone and is passed
/// explicitly to every collaborator. All mutation funnels through
/// [`StateStore::update`] / [`StateStore::try_update`], which are atomic
/// with respect to each other: no reader ever observes a partially-applied
/// transformation.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking update function poisons the mutex without having written
    // anything; the stored value is still the last committed one.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StateStore {
    pub fn new(initial: Value) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(initial),
                listeners: Mutex::new(HashMap::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub fn read(&self) -> Value {
        lock(&self.inner.state).clone()
    }

    /// Apply `f` atomically and return the committed (previous, next) pair.
    ///
    /// Listeners run after the state lock is released, so notification
    /// order across updates is guaranteed only for serialized callers (the
    /// dispatch loop); concurrent direct updates commit atomically but may
    /// notify out of commit order.
    pub fn update<F>(&self, f: F) -> SnapshotPair
    where
        F: FnOnce(Value) -> Value,
    {
        match self.try_update(|state| Ok(f(state))) {
            Ok(pair) => pair,
            // The closure above is infallible.
            Err(_) => unreachable!("infallible update returned an error"),
        }
    }

    /// Apply a fallible transition. On `Err` the stored value is untouched
    /// and no listener fires; on `Ok` the new value is committed and every
    /// listener is notified with the snapshot pair. Listener failures are
    /// logged with their subscription id; callers with message context
    /// should prefer [`StateStore::try_update_traced`].
    pub fn try_update<F>(&self, f: F) -> Result<SnapshotPair>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        let (pair, failures) = self.apply(f)?;
        for failure in failures {
            error!(
                subscription = failure.subscription,
                message = %failure.message,
                "listener fault contained"
            );
        }
        Ok(pair)
    }

    /// Like [`StateStore::try_update`], but attributes listener failures to
    /// the originating message and returns them as `notify`-phase
    /// [`HandlerFault`]s for the caller to report. The faults never unwind
    /// the update and never skip the remaining listeners.
    pub fn try_update_traced<F>(
        &self,
        origin: &UpdateOrigin,
        f: F,
    ) -> Result<(SnapshotPair, Vec<HandlerFault>)>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        let (pair, failures) = self.apply(f)?;
        let faults = failures
            .into_iter()
            .map(|failure| {
                HandlerFault::new(
                    origin.channel,
                    origin.event.clone(),
                    FaultPhase::Notify,
                    failure.message,
                )
                .with_correlation_id(origin.correlation_id)
            })
            .collect();
        Ok((pair, faults))
    }

    fn apply<F>(&self, f: F) -> Result<(SnapshotPair, Vec<ListenerFailure>)>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        let pair = {
            let mut state = lock(&self.inner.state);
            let previous = state.clone();
            let next = f(previous.clone())?;
            *state = next.clone();
            SnapshotPair { previous, next }
        };
        let failures = self.notify(&pair);
        Ok((pair, failures))
    }

    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).insert(id, listener);
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, handle: SubscriptionId) {
        lock(&self.inner.listeners).remove(&handle.0);
    }

    fn notify(&self, pair: &SnapshotPair) -> Vec<ListenerFailure> {
        // Snapshot the listener set so a listener may subscribe or
        // unsubscribe reentrantly without deadlocking.
        let listeners: Vec<(u64, Listener)> = lock(&self.inner.listeners)
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        let mut failures = Vec::new();
        for (id, listener) in listeners {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| listener(&pair.previous, &pair.next)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(panic_payload) => panic_message(panic_payload.as_ref()).to_string(),
            };
            failures.push(ListenerFailure {
                subscription: id,
                message,
            });
        }
        failures
    }
}

/// Best-effort text from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
