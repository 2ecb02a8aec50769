// Binding arena - storage for binding metadata
//
// This module defines BindingMetadata, BindingId, and the ActiveCapture
// slot used to wire a binding under construction to the properties it
// reads.
//
// CAPTURE PROTOCOL:
// - Binding construction sets the thread-local capture slot to its own id,
//   performs exactly one read of subject[key], and restores the slot.
// - A tracked property read registers the captured id into that property's
//   tracker. Reads outside a capture span register nothing.
// - The slot is only ever manipulated through CaptureGuard, which restores
//   the previous value on every exit path including panics, so nested
//   constructions compose.

use parking_lot::{Mutex, RwLock};
use slab::Slab;
use std::cell::Cell;
use std::sync::Arc;

use crate::observe::Object;
use crate::value::Value;

/// Callback stored for a binding: invoked with (new, old) when the
/// observed property changes to a value that is not `same`.
pub type UpdateFn = Box<dyn FnMut(&Value, &Value) + Send>;

/// Global binding arena - stores all binding metadata
static BINDING_ARENA: RwLock<Slab<BindingMetadata>> = RwLock::new(Slab::new());

// Thread-local ActiveCapture slot: the binding currently being constructed.
// At most one binding is capturing at any instant on a thread.
thread_local! {
    static ACTIVE_CAPTURE: Cell<Option<BindingId>> = const { Cell::new(None) };
}

/// Get the binding currently capturing dependencies (if any)
pub fn current_capture() -> Option<BindingId> {
    ACTIVE_CAPTURE.with(Cell::get)
}

/// Set the capture slot, returning the previous occupant
fn set_active_capture(binding: Option<BindingId>) -> Option<BindingId> {
    ACTIVE_CAPTURE.with(|slot| slot.replace(binding))
}

/// RAII guard that restores the ActiveCapture slot when dropped.
///
/// This ensures the slot is restored even if the dependency read panics,
/// and makes it impossible for a nested construction to leak its id into
/// an unrelated later read.
pub struct CaptureGuard {
    previous: Option<BindingId>,
}

impl CaptureGuard {
    /// Set the capture slot to `binding`, remembering the previous value
    /// for restoration on drop.
    pub fn new(binding: Option<BindingId>) -> Self {
        let previous = set_active_capture(binding);
        Self { previous }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        set_active_capture(self.previous);
    }
}

/// Unique identifier for a binding in the arena.
///
/// A zero-cost wrapper around a slab index. When the owning Binding handle
/// drops it removes the entry, making this id stale; operations on a stale
/// id are no-ops.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BindingId(u32);

impl BindingId {
    /// Create a BindingId from a raw slab index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert to usize for slab indexing
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Access the binding metadata with a closure (read-only)
    ///
    /// Returns None if the binding has been removed (stale access).
    pub fn with<F, R>(self, f: F) -> Option<R>
    where
        F: FnOnce(&BindingMetadata) -> R,
    {
        let arena = BINDING_ARENA.read();
        arena.get(self.index()).map(f)
    }

    /// The subject object and property key this binding observes.
    pub fn subject_and_key(self) -> Option<(Arc<Object>, String)> {
        self.with(|meta| (meta.subject.clone(), meta.key.clone()))
    }

    /// Store the last-observed value without running the callback.
    ///
    /// Used once at construction time, after the capture-guarded read.
    pub fn store_last(self, value: Option<Value>) {
        self.with(|meta| *meta.last.lock() = value);
    }

    /// Re-read the observed property and run the callback if it changed.
    ///
    /// The comparison is `Value::same`: shallow, identity for objects.
    /// The current value becomes the new last-observed value *before* the
    /// callback runs, so a re-entrant write of the same value during the
    /// callback is absorbed by the sameness check.
    pub fn update(self) {
        let Some((subject, key)) = self.subject_and_key() else {
            return;
        };
        // Untracked read: no capture guard is active during notification.
        let current = subject.get(&key);

        // Outer None: stale id. Inner None: value unchanged, nothing to do.
        let Some(Some(previous)) = self.with(|meta| {
            let mut last = meta.last.lock();
            if Value::option_same(current.as_ref(), last.as_ref()) {
                None
            } else {
                Some(std::mem::replace(&mut *last, current.clone()))
            }
        }) else {
            return;
        };

        let new = current.unwrap_or(Value::Null);
        let old = previous.unwrap_or(Value::Null);
        self.run_callback(&new, &old);
    }

    /// Run the callback stored in the arena for this binding.
    ///
    /// The callback is taken out of the arena while it runs so the arena
    /// lock is not held across user code (the callback may construct
    /// bindings or write tracked properties, both of which need the
    /// arenas). A drop guard restores the callback even if it panics; a
    /// re-entrant update of the same binding while its callback is out
    /// simply finds no callback and does nothing.
    fn run_callback(self, new: &Value, old: &Value) {
        /// Guard that restores a taken callback to the arena on drop
        struct CallbackGuard {
            binding: BindingId,
            callback: Option<UpdateFn>,
        }

        impl Drop for CallbackGuard {
            fn drop(&mut self) {
                if let Some(cb) = self.callback.take() {
                    let arena = BINDING_ARENA.read();
                    if let Some(meta) = arena.get(self.binding.index()) {
                        *meta.callback.lock() = Some(cb);
                    }
                }
            }
        }

        let callback = {
            let arena = BINDING_ARENA.read();
            match arena.get(self.index()) {
                Some(meta) => meta.callback.lock().take(),
                None => None,
            }
        };
        // Arena lock released - the callback may re-enter freely.

        if let Some(cb) = callback {
            let mut guard = CallbackGuard {
                binding: self,
                callback: Some(cb),
            };
            if let Some(ref mut cb) = guard.callback {
                cb(new, old);
            }
            // Guard drops here, restoring the callback to the arena.
        }
    }
}

/// Metadata for one binding stored in the arena.
pub struct BindingMetadata {
    /// The data object this binding reads.
    pub(crate) subject: Arc<Object>,
    /// The single property key this binding depends on.
    pub(crate) key: String,
    /// Last-observed value; `None` means the property was absent at the
    /// time of the last read.
    pub(crate) last: Mutex<Option<Value>>,
    /// The side-effect callback. `None` only while the callback is
    /// temporarily out of the arena during its own execution.
    pub(crate) callback: Mutex<Option<UpdateFn>>,
}

impl BindingMetadata {
    /// Create metadata for a binding on `subject[key]`.
    pub fn new(subject: Arc<Object>, key: String, callback: UpdateFn) -> Self {
        Self {
            subject,
            key,
            last: Mutex::new(None),
            callback: Mutex::new(Some(callback)),
        }
    }
}

/// Insert a binding into the arena and return its id
pub fn binding_arena_insert(metadata: BindingMetadata) -> BindingId {
    let mut arena = BINDING_ARENA.write();
    let entry = arena.vacant_entry();
    let key = entry.key();
    entry.insert(metadata);
    BindingId::new(key as u32)
}

/// Remove a binding from the arena
pub fn binding_arena_remove(id: BindingId) -> Option<BindingMetadata> {
    let mut arena = BINDING_ARENA.write();
    if arena.contains(id.index()) {
        Some(arena.remove(id.index()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_access_returns_none() {
        let subject = Object::empty();
        let meta = BindingMetadata::new(subject, "name".into(), Box::new(|_, _| {}));
        let id = binding_arena_insert(meta);
        binding_arena_remove(id);

        assert!(id.with(|_| ()).is_none());
        assert!(id.subject_and_key().is_none());
        // update on a stale id is a no-op
        id.update();
    }

    #[test]
    fn capture_guard_restores_previous_slot() {
        let outer = BindingId::new(u32::MAX);
        let inner = BindingId::new(u32::MAX - 1);

        let _g1 = CaptureGuard::new(Some(outer));
        assert_eq!(current_capture(), Some(outer));
        {
            let _g2 = CaptureGuard::new(Some(inner));
            assert_eq!(current_capture(), Some(inner));
        }
        assert_eq!(current_capture(), Some(outer));
        drop(_g1);
        assert_eq!(current_capture(), None);
    }

    #[test]
    fn capture_guard_restores_on_panic() {
        let outer = BindingId::new(u32::MAX);
        let _g = CaptureGuard::new(Some(outer));

        let result = std::panic::catch_unwind(|| {
            let _inner = CaptureGuard::new(None);
            assert_eq!(current_capture(), None);
            panic!("test panic");
        });

        assert!(result.is_err());
        assert_eq!(current_capture(), Some(outer));
    }
}
