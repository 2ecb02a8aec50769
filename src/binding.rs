//! Dependency-capturing view bindings.
//!
//! A [`Binding`] is one unit of view logic that depends on exactly one
//! property of one data object: a text interpolation span, or the
//! displayed value of an input element. Constructing it performs a single
//! *tracked read* of the property under a capture guard, which registers
//! the binding into that property's tracker; every later write that
//! changes the property re-runs [`Binding::update`].

use std::sync::Arc;

use crate::arena::{
    BindingId, BindingMetadata, CaptureGuard, binding_arena_insert, binding_arena_remove,
};
use crate::observe::Object;
use crate::value::Value;

/// A view-side computation bound to one data property.
///
/// The handle owns the binding: dropping it deregisters the binding from
/// its property's tracker and frees its metadata. A compiled view keeps
/// its bindings alive for as long as the view exists.
///
/// # Capture sequence
///
/// Construction sets the ActiveCapture slot to the new binding, reads
/// `subject[key]` once (registering the binding if the slot is tracked),
/// stores the value read as the last-observed value, and restores the
/// previous capture slot. The restore is an RAII guard, so the slot is
/// correct on every exit path and nested constructions inside callbacks
/// compose instead of corrupting each other.
///
/// A binding on an absent or untracked property is inert: nothing
/// registers it, so nothing ever updates it.
pub struct Binding {
    id: BindingId,
}

impl Binding {
    /// Bind `callback` to changes of `subject[key]`.
    ///
    /// The callback receives `(new, old)` and runs only when the property
    /// changes to a value that is not [`Value::same`]; writes of identical
    /// values never reach it.
    pub fn new<F>(subject: &Arc<Object>, key: impl Into<String>, callback: F) -> Self
    where
        F: FnMut(&Value, &Value) + Send + 'static,
    {
        let key = key.into();
        let metadata = BindingMetadata::new(subject.clone(), key.clone(), Box::new(callback));
        let id = binding_arena_insert(metadata);

        // The tracked read: set capture slot, read once, restore.
        {
            let _capture = CaptureGuard::new(Some(id));
            let initial = subject.get(&key);
            id.store_last(initial);
        }

        Self { id }
    }

    /// Re-read the property and run the callback if the value changed.
    ///
    /// Called by the tracker on every notification pass; also callable
    /// directly to force a view refresh after out-of-band mutation.
    pub fn update(&self) {
        self.id.update();
    }

    /// Arena id of this binding (internal use only)
    pub(crate) fn id(&self) -> BindingId {
        self.id
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Binding").field(&self.id).finish()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        // Remove every occurrence of this binding from its property's
        // tracker (duplicate registrations included), then free the slot.
        if let Some((subject, key)) = self.id.subject_and_key()
            && let Some(tracker) = subject.tracker_of(&key)
        {
            tracker.deregister(self.id());
            tracing::trace!(key = %key, remaining = tracker.dependent_count(), "binding dropped");
        }
        binding_arena_remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::observe;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn construction_registers_exactly_once() {
        let data = Object::new([
            ("a", Value::from(1i64)),
            ("b", Value::from(2i64)),
            ("c", Value::from(3i64)),
        ]);
        observe(&Value::Object(data.clone()));

        let _binding = Binding::new(&data, "a", |_, _| {});

        assert_eq!(data.tracker_of("a").unwrap().dependent_count(), 1);
        assert_eq!(data.tracker_of("b").unwrap().dependent_count(), 0);
        assert_eq!(data.tracker_of("c").unwrap().dependent_count(), 0);
    }

    #[test]
    fn update_fires_on_change_with_new_and_old() {
        let data = Object::new([("name", Value::from("Tifa"))]);
        observe(&Value::Object(data.clone()));

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _binding = Binding::new(&data, "name", move |new, old| {
            seen_clone.lock().push((new.render(), old.render()));
        });

        data.set("name", Value::from("Aerith"));
        assert_eq!(seen.lock().as_slice(), &[("Aerith".into(), "Tifa".into())]);
    }

    #[test]
    fn update_refreshes_last_observed_value() {
        let data = Object::new([("n", Value::from(0i64))]);
        observe(&Value::Object(data.clone()));

        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        let binding = Binding::new(&data, "n", move |_, _| {
            runs_clone.fetch_add(1, Ordering::Relaxed);
        });

        data.set("n", Value::from(1i64));
        data.set("n", Value::from(2i64));
        // Each change fires once: the last-observed value followed.
        assert_eq!(runs.load(Ordering::Relaxed), 2);

        // A forced update with no underlying change is a no-op.
        binding.update();
        assert_eq!(runs.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn binding_on_absent_property_is_inert() {
        let data = Object::new([("present", Value::from(1i64))]);
        observe(&Value::Object(data.clone()));

        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        let binding = Binding::new(&data, "missing", move |_, _| {
            runs_clone.fetch_add(1, Ordering::Relaxed);
        });

        // Defining the key later creates a plain slot; the binding stays
        // unregistered and never fires.
        data.set("missing", Value::from(99i64));
        assert_eq!(runs.load(Ordering::Relaxed), 0);

        binding.update();
        // A forced update does observe the new value but that is a direct
        // call, not a notification.
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn drop_deregisters_from_tracker() {
        let data = Object::new([("a", Value::from(1i64))]);
        observe(&Value::Object(data.clone()));

        let binding = Binding::new(&data, "a", |_, _| {});
        let tracker = data.tracker_of("a").unwrap();
        assert_eq!(tracker.dependent_count(), 1);

        drop(binding);
        assert_eq!(tracker.dependent_count(), 0);
    }
}
