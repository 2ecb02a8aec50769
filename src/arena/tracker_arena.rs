// Tracker arena - storage for per-property dependent lists
//
// One tracker per intercepted property. A tracker is created when the
// property is wrapped and freed when the owning data object drops; it is
// never removed while the property exists.
//
// ORDERING MODEL:
// - Dependents are an ordered list, not a set. Registration order is
//   notification order, and duplicate registrations are kept: each entry
//   receives an update() call per notification pass. The binding's own
//   sameness check is what keeps duplicate entries from double-firing a
//   callback.

use parking_lot::RwLock;
use slab::Slab;
use std::cell::Cell;

use super::binding_arena::BindingId;

/// Maximum number of nested notification passes on one thread.
///
/// A binding callback may write tracked properties, which notifies again
/// before the outer pass returns. Propagation nested deeper than this is
/// dropped with a warning instead of exhausting the stack; independent
/// (non-nested) writes never accumulate depth.
pub const MAX_NOTIFY_DEPTH: usize = 64;

/// Global tracker arena - stores all per-property dependent lists
static TRACKER_ARENA: RwLock<Slab<TrackerMetadata>> = RwLock::new(Slab::new());

// Thread-local nesting depth of notify_all passes.
thread_local! {
    static NOTIFY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII guard for the notification depth counter.
///
/// Entering fails once the limit is reached; the counter is decremented on
/// drop even if an update panics.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Option<Self> {
        NOTIFY_DEPTH.with(|depth| {
            if depth.get() >= MAX_NOTIFY_DEPTH {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        NOTIFY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Unique identifier for a property tracker in the arena.
///
/// A zero-cost wrapper around a slab index. Trackers outlive every binding
/// registered in them; the id goes stale only when the owning data object
/// drops, after which all operations are no-ops.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TrackerId(u32);

impl TrackerId {
    /// Create a TrackerId from a raw slab index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert to usize for slab indexing
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Access the tracker metadata with a closure (read-only)
    ///
    /// Returns None if the tracker has been removed (stale access).
    pub fn with<F, R>(self, f: F) -> Option<R>
    where
        F: FnOnce(&TrackerMetadata) -> R,
    {
        let arena = TRACKER_ARENA.read();
        arena.get(self.index()).map(f)
    }

    /// Append a binding to the dependent list.
    ///
    /// Always succeeds; no deduplication. Registering the same binding
    /// twice yields two entries and two update() calls per notification.
    pub fn register(self, binding: BindingId) {
        self.with(|meta| meta.dependents.write().push(binding));
    }

    /// Remove every occurrence of a binding from the dependent list.
    pub fn deregister(self, binding: BindingId) {
        self.with(|meta| meta.dependents.write().retain(|&id| id != binding));
    }

    /// Number of registered entries (duplicates counted).
    pub fn dependent_count(self) -> usize {
        self.with(|meta| meta.dependents.read().len()).unwrap_or(0)
    }

    /// Invoke update() on every registered binding, in registration order,
    /// synchronously.
    ///
    /// The list is snapshotted first, so callbacks are free to register or
    /// deregister bindings (the current pass keeps iterating the snapshot).
    /// Nested passes beyond [`MAX_NOTIFY_DEPTH`] are dropped with a
    /// warning: a cyclic write cascade terminates instead of overflowing
    /// the stack, and acyclic cascades are unaffected.
    pub fn notify_all(self) {
        let Some(dependents) = self.with(|meta| meta.dependents.read().clone()) else {
            return;
        };
        if dependents.is_empty() {
            return;
        }

        let Some(_depth) = DepthGuard::enter() else {
            cov_mark::hit!(notify_depth_exceeded);
            tracing::warn!(
                tracker = ?self,
                limit = MAX_NOTIFY_DEPTH,
                "write cascade exceeded the notification depth limit; \
                 dropping this pass to break the cycle"
            );
            return;
        };

        for binding in dependents {
            binding.update();
        }
    }
}

/// Metadata for one property tracker stored in the arena.
#[derive(Debug, Default)]
pub struct TrackerMetadata {
    /// Bindings registered on this property, in registration order.
    /// Duplicates are intentional; see the module header.
    pub(crate) dependents: RwLock<Vec<BindingId>>,
}

impl TrackerMetadata {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }
}

/// Insert a tracker into the arena and return its id
pub fn tracker_arena_insert(metadata: TrackerMetadata) -> TrackerId {
    let mut arena = TRACKER_ARENA.write();
    let entry = arena.vacant_entry();
    let key = entry.key();
    entry.insert(metadata);
    TrackerId::new(key as u32)
}

/// Remove a tracker from the arena
pub fn tracker_arena_remove(id: TrackerId) -> Option<TrackerMetadata> {
    let mut arena = TRACKER_ARENA.write();
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
        let id = tracker_arena_insert(TrackerMetadata::new());
        tracker_arena_remove(id);

        assert!(id.with(|_| ()).is_none());
        assert_eq!(id.dependent_count(), 0);
        // notify on a stale id is a no-op
        id.notify_all();
    }

    #[test]
    fn registration_keeps_order_and_duplicates() {
        let id = tracker_arena_insert(TrackerMetadata::new());
        let a = BindingId::new(u32::MAX);
        let b = BindingId::new(u32::MAX - 1);

        id.register(a);
        id.register(b);
        id.register(a);
        assert_eq!(id.dependent_count(), 3);

        let snapshot = id.with(|meta| meta.dependents.read().clone());
        assert_eq!(snapshot, Some(vec![a, b, a]));

        id.deregister(a);
        assert_eq!(id.dependent_count(), 1);

        tracker_arena_remove(id);
    }
}
