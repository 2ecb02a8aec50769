//! Plain publish/subscribe hub, independent of the tracking engine.
//!
//! Where bindings are wired *automatically* by tracked reads, the
//! [`EventEmitter`] is the manual counterpart: subscribers register
//! themselves against an event name, publishers push payloads to that
//! name, and the hub fans out in subscription order. Payloads reuse the
//! crate's [`Value`] model.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::hash::FastIndexMap;
use crate::value::Value;

type EventCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Token identifying one subscription, for later removal.
///
/// Returned by [`EventEmitter::subscribe`]; stands in for the callback
/// identity that closures cannot provide.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SubscriptionId(u64);

/// Event hub mapping event names to ordered subscriber lists.
#[derive(Default)]
pub struct EventEmitter {
    next_token: AtomicU64,
    channels: RwLock<FastIndexMap<String, Vec<(SubscriptionId, EventCallback)>>>,
}

impl EventEmitter {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event name.
    ///
    /// The channel is created on first use. Callbacks for one event run
    /// in subscription order on publish.
    pub fn subscribe(
        &self,
        event: &str,
        callback: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let token = SubscriptionId(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut channels = self.channels.write();
        channels
            .entry(event.to_owned())
            .or_default()
            .push((token, Arc::new(callback)));
        token
    }

    /// Deliver a payload to every subscriber of an event.
    ///
    /// Unknown events are a silent no-op. Subscribers are snapshotted
    /// before invocation, so a callback may subscribe or unsubscribe
    /// without deadlocking the pass.
    pub fn publish(&self, event: &str, args: &[Value]) {
        let callbacks: Vec<EventCallback> = {
            let channels = self.channels.read();
            match channels.get(event) {
                Some(subscribers) => subscribers.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            }
        };
        for callback in callbacks {
            callback(args);
        }
    }

    /// Remove one subscription from an event.
    ///
    /// Unknown events or tokens are a silent no-op.
    pub fn unsubscribe(&self, event: &str, token: SubscriptionId) {
        let mut channels = self.channels.write();
        if let Some(subscribers) = channels.get_mut(event) {
            subscribers.retain(|(id, _)| *id != token);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels = self.channels.read();
        let mut map = f.debug_map();
        for (event, subscribers) in channels.iter() {
            map.entry(&event, &subscribers.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn publish_reaches_subscribers_in_order() {
        let events = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_a = log.clone();
        events.subscribe("fire", move |args| {
            log_a.lock().push(format!("first:{}", args[0].render()));
        });
        let log_b = log.clone();
        events.subscribe("fire", move |args| {
            log_b.lock().push(format!("second:{}", args[0].render()));
        });

        events.publish("fire", &[Value::from("tea for the boss")]);
        assert_eq!(
            log.lock().as_slice(),
            &["first:tea for the boss", "second:tea for the boss"]
        );
    }

    #[test]
    fn unknown_event_is_a_no_op() {
        let events = EventEmitter::new();
        events.publish("nobody-home", &[]);
        events.unsubscribe("nobody-home", SubscriptionId(99));
    }

    #[test]
    fn unsubscribe_removes_only_that_token() {
        let events = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_a = log.clone();
        let first = events.subscribe("fire", move |_| log_a.lock().push("first"));
        let log_b = log.clone();
        let _second = events.subscribe("fire", move |_| log_b.lock().push("second"));

        events.unsubscribe("fire", first);
        events.publish("fire", &[]);
        assert_eq!(log.lock().as_slice(), &["second"]);
    }

    #[test]
    fn callbacks_may_resubscribe_during_publish() {
        let events = Arc::new(EventEmitter::new());
        let count = Arc::new(Mutex::new(0usize));

        let events_clone = events.clone();
        let count_clone = count.clone();
        events.subscribe("fire", move |_| {
            *count_clone.lock() += 1;
            let late_count = count_clone.clone();
            events_clone.subscribe("fire", move |_| {
                *late_count.lock() += 10;
            });
        });

        events.publish("fire", &[]);
        // The late subscriber was added mid-pass, not invoked.
        assert_eq!(*count.lock(), 1);
        events.publish("fire", &[]);
        // Now both fire (the original added yet another subscriber).
        assert_eq!(*count.lock(), 12);
    }
}
