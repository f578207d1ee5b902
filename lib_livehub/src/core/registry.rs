//! # Subscriber Registry
//!
//! Maps each [`EventName`] to the ordered list of callbacks registered for it.
//! A registry is owned by one client instance, so concurrent clients never
//! share subscriber lists.
//!
//! `publish` copies the subscriber list under the lock and invokes the copy
//! with the lock released. Registering from another task (or from inside a
//! callback) while a publish is running is therefore safe; the new callback
//! takes effect from the next publish.
//!
//! Callbacks run inline on the connection task. Anything slow should be
//! handed off (e.g. to a channel or `tokio::spawn`), because a blocking
//! callback stalls every later event on that connection.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::events::{EventName, LiveEvent};
use crate::errors::LiveHubError;

/// A subscriber callback. Returning `Err` (or panicking) counts as a failure
/// of this one invocation only.
pub type Callback = Arc<dyn Fn(&LiveEvent) -> anyhow::Result<()> + Send + Sync>;

/// Identity of one registration, used in failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// Per-client event subscriptions.
pub struct Registry {
    subscriptions: Mutex<HashMap<EventName, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends `callback` to the list for `event`.
    ///
    /// Registrations are never deduplicated: registering the same callback
    /// twice makes it fire twice per publish.
    pub fn on<F>(&self, event: EventName, callback: F) -> SubscriptionId
    where
        F: Fn(&LiveEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_shared(event, Arc::new(callback))
    }

    /// Same as [`Registry::on`] for an already shared callback.
    pub fn on_shared(&self, event: EventName, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        subs.entry(event).or_default().push(Subscriber { id, callback });
        log::debug!("Subscriber #{} registered for '{}'", id, event);
        id
    }

    /// Number of callbacks currently registered for `event`.
    pub fn subscriber_count(&self, event: EventName) -> usize {
        let subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        subs.get(&event).map_or(0, Vec::len)
    }

    /// Invokes every callback registered for the event's name, in
    /// registration order, each behind its own error boundary.
    ///
    /// Returns how many callbacks completed without failing.
    pub fn publish(&self, event: &LiveEvent) -> usize {
        let name = event.name();
        let snapshot = {
            let subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
            match subs.get(&name) {
                Some(list) => list.clone(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for subscriber in &snapshot {
            match invoke(subscriber, event) {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!("{}", e),
            }
        }
        delivered
    }
}

/// Runs one callback, turning both `Err` returns and panics into a
/// `Subscriber` error.
fn invoke(subscriber: &Subscriber, event: &LiveEvent) -> Result<(), LiveHubError> {
    let failure = |reason: String| LiveHubError::Subscriber {
        event: event.name().to_string(),
        subscriber: subscriber.id.0,
        reason,
    };

    match panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(failure(format!("{:#}", e))),
        Err(payload) => Err(failure(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
