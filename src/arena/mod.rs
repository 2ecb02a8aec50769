// Arena-based storage for reactive metadata
//
// Two arenas, one file each:
// - Binding arena: per-binding metadata (subject, key, last value, callback)
//   plus the thread-local ActiveCapture slot and its RAII guard.
// - Tracker arena: per-property dependent lists and the notification pass.
//
// Global static storage behind parking_lot locks; BindingId and TrackerId
// are lightweight newtypes indexing into the slabs.

// binding_arena comes first because tracker_arena depends on BindingId.
pub mod binding_arena;
pub mod tracker_arena;

pub use binding_arena::{
    BindingId, BindingMetadata, CaptureGuard, UpdateFn, binding_arena_insert, binding_arena_remove,
    current_capture,
};

pub use tracker_arena::{
    MAX_NOTIFY_DEPTH, TrackerId, TrackerMetadata, tracker_arena_insert, tracker_arena_remove,
};
