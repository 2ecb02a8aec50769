//! Property interception: the data-side half of the engine.
//!
//! An [`Object`] is a dynamic, insertion-ordered map of property slots.
//! [`observe`] wraps an object in place: every slot gains a property
//! tracker, and from then on
//!
//! - reads performed while a binding is capturing register that binding
//!   into the slot's tracker, and
//! - writes that actually change the value (by [`Value::same`]) notify
//!   every registered binding, synchronously and in registration order.
//!
//! Wrapping changes the mechanism, not the shape: the object keeps its
//! keys and key order, and callers unaware of interception observe plain
//! map behavior. Wrapping a non-object value is a silent pass-through.
//!
//! Locks are never held across notification: `set` stores, releases, then
//! notifies, so binding callbacks are free to read and write the same
//! object.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::arena::{
    TrackerId, TrackerMetadata, current_capture, tracker_arena_insert, tracker_arena_remove,
};
use crate::hash::FastIndexMap;
use crate::value::Value;

/// Wrap a data value for change tracking, in place.
///
/// For an object, every property slot gains a tracker, recursing
/// depth-first through object-valued properties. Slots that already have a
/// tracker are left untouched (re-observing preserves registrations), and
/// an object reachable through a reference cycle is visited once. For any
/// non-object value this is a no-op.
pub fn observe(value: &Value) {
    let Some(object) = value.as_object() else {
        return;
    };
    install_trackers(object, &mut Vec::new());
}

/// Install trackers on every slot of `object`, then recurse into object
/// values.
///
/// `visited` breaks reference cycles: each object is processed once per
/// walk. Already-tracked slots keep their tracker (and with it every
/// registration made so far).
fn install_trackers(object: &Arc<Object>, visited: &mut Vec<*const Object>) {
    let ptr = Arc::as_ptr(object);
    if visited.contains(&ptr) {
        return;
    }
    visited.push(ptr);

    let children = {
        let mut entries = object.entries.write();
        let mut children = Vec::new();
        for (key, slot) in entries.iter_mut() {
            if slot.tracker.is_none() {
                slot.tracker = Some(tracker_arena_insert(TrackerMetadata::new()));
                tracing::trace!(key = %key, "property tracker installed");
            }
            if let Value::Object(child) = &slot.value {
                children.push(child.clone());
            }
        }
        children
    };

    for child in children {
        install_trackers(&child, visited);
    }
}

/// One property: the governing value slot plus its tracker, if wrapped.
struct PropertySlot {
    value: Value,
    tracker: Option<TrackerId>,
}

/// A dynamic data object with optionally intercepted properties.
///
/// Shared behind `Arc` so bindings and input listeners can hold the
/// subject they read and write. Identity (`Arc::ptr_eq`) is the object's
/// equality, mirroring reference equality in the source data model.
pub struct Object {
    entries: RwLock<FastIndexMap<String, PropertySlot>>,
}

impl Object {
    /// Build a plain (untracked) object from key/value pairs.
    ///
    /// Insertion order is the object's property enumeration order.
    pub fn new<K, I>(entries: I) -> Arc<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| {
                (
                    key.into(),
                    PropertySlot {
                        value,
                        tracker: None,
                    },
                )
            })
            .collect();
        Arc::new(Self {
            entries: RwLock::new(map),
        })
    }

    /// Build an object with no properties.
    pub fn empty() -> Arc<Self> {
        Self::new(std::iter::empty::<(String, Value)>())
    }

    /// Read a property.
    ///
    /// If a binding is currently capturing dependencies and this slot is
    /// tracked, the binding is registered into the slot's tracker first.
    /// Reading an absent key returns `None` and registers nothing; reading
    /// never fails.
    pub fn get(&self, key: &str) -> Option<Value> {
        let (value, tracker) = {
            let entries = self.entries.read();
            let slot = entries.get(key)?;
            (slot.value.clone(), slot.tracker)
        };
        if let Some(tracker) = tracker
            && let Some(binding) = current_capture()
        {
            tracker.register(binding);
        }
        Some(value)
    }

    /// Write a property.
    ///
    /// Writing a value that is `same` as the stored one is a guaranteed
    /// no-op: no binding fires. This is what keeps two-way bindings from
    /// echoing forever. Otherwise the value is stored and, if the slot is
    /// tracked, every registered binding is updated after the object lock
    /// is released.
    ///
    /// Writing an absent key inserts a plain, untracked slot (the shape of
    /// the object only changes through explicit writes, never through
    /// wrapping) and notifies nobody.
    pub fn set(&self, key: &str, value: Value) {
        let tracker = {
            let mut entries = self.entries.write();
            match entries.get_mut(key) {
                Some(slot) => {
                    if slot.value.same(&value) {
                        cov_mark::hit!(identical_write_skipped);
                        return;
                    }
                    slot.value = value;
                    slot.tracker
                }
                None => {
                    entries.insert(
                        key.to_owned(),
                        PropertySlot {
                            value,
                            tracker: None,
                        },
                    );
                    None
                }
            }
        };
        if let Some(tracker) = tracker {
            tracker.notify_all();
        }
    }

    /// Property keys, in enumeration order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Whether a property exists (tracked or not).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// The tracker wired to a property slot, if the slot is wrapped.
    pub(crate) fn tracker_of(&self, key: &str) -> Option<TrackerId> {
        self.entries.read().get(key).and_then(|slot| slot.tracker)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut map = f.debug_map();
        for (key, slot) in entries.iter() {
            map.entry(&key, &slot.value);
        }
        map.finish()
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        // Trackers live exactly as long as the object that owns them.
        let entries = self.entries.get_mut();
        for slot in entries.values() {
            if let Some(tracker) = slot.tracker {
                tracker_arena_remove(tracker);
            }
        }
    }
}
