//! Subscriber registry and fan-out.
//!
//! Listeners are kept in registration order. Fan-out works on a snapshot
//! taken under the lock, so subscribing or cancelling from inside a listener
//! (or from another thread) never blocks or disturbs a delivery in progress.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::action::Action;

/// Callback receiving classified actions.
///
/// Each listener gets its own copy of the action. Returning an error (or
/// panicking) is logged and does not stop delivery to other listeners.
pub type Listener = Arc<dyn Fn(Action) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    listeners: RwLock<BTreeMap<u64, Listener>>,
}

/// Thread-safe listener set. Cloning shares the same set.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<RegistryInner>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays active until the returned handle is cancelled.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Action) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().insert(id, Arc::new(listener));

        debug!(subscription_id = id, "listener_subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Deliver `action` to every listener registered at call time, in
    /// registration order. Returns how many listeners completed without error.
    pub fn fan_out(&self, action: &Action) -> usize {
        let snapshot: Vec<(u64, Listener)> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            let copy = action.clone();
            match catch_unwind(AssertUnwindSafe(|| listener(copy))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    error!(
                        subscription_id = id,
                        action = action.tag(),
                        error = %e,
                        "listener_failed"
                    );
                }
                Err(_) => {
                    error!(
                        subscription_id = id,
                        action = action.tag(),
                        "listener_panicked"
                    );
                }
            }
        }

        delivered
    }

    pub fn len(&self) -> usize {
        self.inner.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`Subscribers::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::cancel`].
#[must_use = "the listener stays registered until `cancel` is called"]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
    cancelled: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener. Only the first call has an effect.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.write().remove(&self.id);
            debug!(subscription_id = self.id, "listener_unsubscribed");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::UserId;
    use parking_lot::Mutex;

    fn text(body: &str) -> Action {
        Action::Text {
            sender: UserId::from("1"),
            text: Some(body.to_string()),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> impl Fn(Action) -> anyhow::Result<()> {
        let log = Arc::clone(log);
        move |action| {
            log.lock().push(format!("{}:{}", name, action.tag()));
            Ok(())
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let subscribers = Subscribers::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _a = subscribers.subscribe(recorder(&log, "a"));
        let _b = subscribers.subscribe(recorder(&log, "b"));
        let _c = subscribers.subscribe(recorder(&log, "c"));

        assert_eq!(subscribers.fan_out(&text("hi")), 3);
        assert_eq!(*log.lock(), ["a:TEXT", "b:TEXT", "c:TEXT"]);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let subscribers = Subscribers::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let a = subscribers.subscribe(recorder(&log, "a"));
        let _b = subscribers.subscribe(recorder(&log, "b"));

        a.cancel();
        subscribers.fan_out(&text("hi"));

        assert!(a.is_cancelled());
        assert_eq!(*log.lock(), ["b:TEXT"]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let subscribers = Subscribers::new();
        let a = subscribers.subscribe(|_| Ok(()));
        let _b = subscribers.subscribe(|_| Ok(()));

        a.cancel();
        a.cancel();

        assert_eq!(subscribers.len(), 1);
    }

    #[test]
    fn test_cancel_after_registry_dropped() {
        let subscribers = Subscribers::new();
        let a = subscribers.subscribe(|_| Ok(()));
        drop(subscribers);

        a.cancel();
        assert!(a.is_cancelled());
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let subscribers = Subscribers::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _a = subscribers.subscribe(|_| anyhow::bail!("listener exploded"));
        let _b = subscribers.subscribe(|_| panic!("listener panicked"));
        let _c = subscribers.subscribe(recorder(&log, "c"));

        assert_eq!(subscribers.fan_out(&text("hi")), 1);
        assert_eq!(*log.lock(), ["c:TEXT"]);
    }

    #[test]
    fn test_listener_cancelling_sibling_mid_fan_out() {
        let subscribers = Subscribers::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_handle = Arc::clone(&victim);
        let _canceller = subscribers.subscribe(move |_| {
            if let Some(sub) = victim_handle.lock().as_ref() {
                sub.cancel();
            }
            Ok(())
        });
        *victim.lock() = Some(subscribers.subscribe(recorder(&log, "victim")));

        // The snapshot was taken before the cancel, so this delivery still arrives
        subscribers.fan_out(&text("one"));
        subscribers.fan_out(&text("two"));

        assert_eq!(*log.lock(), ["victim:TEXT"]);
    }

    #[test]
    fn test_listeners_receive_independent_copies() {
        let subscribers = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _mutator = subscribers.subscribe(|mut action| {
            if let Action::Text { text: Some(text), .. } = &mut action {
                text.push_str(" (tampered)");
            }
            Ok(())
        });
        let seen_clone = Arc::clone(&seen);
        let _observer = subscribers.subscribe(move |action| {
            seen_clone.lock().push(action);
            Ok(())
        });

        subscribers.fan_out(&text("original"));
        assert_eq!(*seen.lock(), [text("original")]);
    }
}
