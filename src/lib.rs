#![deny(missing_docs)]

//! Fine-grained reactive view binding.
//!
//! This crate wires a dynamic data object to a tree-shaped view with no
//! manual subscribe calls: reading a property while a binding is under
//! construction is what subscribes it. Writes then propagate
//! synchronously — data to view through bindings, view to data through
//! input listeners — with idempotent writes absorbed so two-way edges
//! cannot echo forever.
//!
//! # Quick Start
//!
//! ```ignore
//! use reflekt::{Attribute, Node, Object, Value, compile, observe, TWO_WAY_ATTR};
//!
//! // A plain data object...
//! let model = Object::new([
//!     ("name", Value::from("Tifa")),
//!     ("age", Value::from(18i64)),
//! ]);
//!
//! // ...wrapped in place for change tracking...
//! observe(&Value::Object(model.clone()));
//!
//! // ...and a view tree with one interpolation and one two-way input.
//! let root = Node::element("div", []);
//! root.append_child(Node::text("Hello {{ name }}"));
//! root.append_child(Node::element("input", [Attribute::new(TWO_WAY_ATTR, "name")]));
//!
//! // Compiling walks the tree and constructs a binding per dynamic spot.
//! let view = compile(&root, &model);
//!
//! // Data-to-view: the text and the input update on write.
//! model.set("name", Value::from("Aerith"));
//!
//! // View-to-data: a user edit writes back through the input listener.
//! root.children()[1].as_element().unwrap().dispatch_input("Cloud");
//! assert!(matches!(model.get("name"), Some(Value::Str(s)) if s == "Cloud"));
//!
//! drop(view); // dropping the compiled view disconnects all bindings
//! ```
//!
//! # Core Types
//!
//! - [`Object`] / [`observe`] - dynamic data object; wrapping installs a
//!   tracker per property, in place, without changing the object's shape.
//! - [`Binding`] - one unit of view logic depending on one property;
//!   constructed under a capture guard, updated on change.
//! - [`compile`] / [`CompiledView`] - depth-first template pass turning
//!   `{{ identifier }}` text and [`TWO_WAY_ATTR`] elements into bindings.
//! - [`Node`] / [`NodeRef`] - the in-memory view tree the compiler walks.
//! - [`EventEmitter`] - plain publish/subscribe hub sharing the same
//!   [`Value`] payload model.
//!
//! # Semantics worth knowing
//!
//! - Writes of a value that is [`Value::same`] as the stored one are
//!   guaranteed no-ops; nothing fires.
//! - Notification is synchronous and unbatched: N writes are N passes.
//! - Registration order is notification order, duplicates included.
//! - Cyclic write cascades are cut at [`MAX_NOTIFY_DEPTH`] nested passes
//!   with a logged warning; acyclic cascades are never affected.

// Internal modules
pub(crate) mod arena;
mod binding;
mod compile;
mod dom;
mod events;
mod hash;
mod observe;
mod value;

// Core types
pub use binding::Binding;
pub use compile::{CompiledView, TWO_WAY_ATTR, compile};
pub use dom::{Attribute, Element, Node, NodeKind, NodeRef, TextNode};
pub use events::{EventEmitter, SubscriptionId};
pub use observe::{Object, observe};
pub use value::Value;

// Tuning constants
pub use arena::tracker_arena::MAX_NOTIFY_DEPTH;
