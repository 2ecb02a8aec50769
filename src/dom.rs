//! In-memory view tree the compiler walks and bindings mutate.
//!
//! This is a deliberately small stand-in for a document tree: just enough
//! surface for the binding engine — child enumeration, an element/text
//! discriminant, attribute enumeration, a settable displayed value on
//! elements, mutable text content on text nodes, and an input-event
//! subscription hook. Nodes are shared as [`NodeRef`] so bindings and
//! listeners can hold the node they write to.
//!
//! The tree is read-only from the engine's perspective except for the two
//! mutation points the contract names: an element's displayed value and a
//! text node's content.

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a node. The tree owns children through these.
pub type NodeRef = Arc<Node>;

/// Listener invoked with the element's new displayed value on input.
type InputListener = Arc<dyn Fn(&str) + Send + Sync>;

/// One name/value pair on an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, e.g. `v-model`.
    pub name: String,
    /// Attribute value, e.g. the bound property key.
    pub value: String,
}

impl Attribute {
    /// Build an attribute from name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The two node kinds the compiler distinguishes.
#[derive(Debug)]
pub enum NodeKind {
    /// An element: tag, fixed attributes, displayed value, input hook.
    Element(Element),
    /// A text node with mutable content.
    Text(TextNode),
}

/// A node in the view tree: element or text, plus children.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    children: RwLock<Vec<NodeRef>>,
}

impl Node {
    /// Build an element node with the given tag and attributes.
    pub fn element(tag: impl Into<String>, attributes: impl IntoIterator<Item = Attribute>) -> NodeRef {
        Arc::new(Self {
            kind: NodeKind::Element(Element {
                tag: tag.into(),
                attributes: attributes.into_iter().collect(),
                value: RwLock::new(String::new()),
                listeners: RwLock::new(Vec::new()),
            }),
            children: RwLock::new(Vec::new()),
        })
    }

    /// Build a text node with the given content.
    pub fn text(content: impl Into<String>) -> NodeRef {
        Arc::new(Self {
            kind: NodeKind::Text(TextNode {
                content: RwLock::new(content.into()),
            }),
            children: RwLock::new(Vec::new()),
        })
    }

    /// Append a child node.
    pub fn append_child(&self, child: NodeRef) {
        self.children.write().push(child);
    }

    /// Snapshot of the children, in document order.
    pub fn children(&self) -> Vec<NodeRef> {
        self.children.read().clone()
    }

    /// The element/text discriminant.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The element behind this node, if it is one.
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    /// The text node behind this node, if it is one.
    pub fn as_text(&self) -> Option<&TextNode> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }
}

/// Element payload: tag, attributes, displayed value, input listeners.
pub struct Element {
    tag: String,
    attributes: Vec<Attribute>,
    value: RwLock<String>,
    listeners: RwLock<Vec<InputListener>>,
}

impl Element {
    /// The element's tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The element's attributes, in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// The currently displayed value.
    pub fn value(&self) -> String {
        self.value.read().clone()
    }

    /// Set the displayed value without firing input listeners.
    ///
    /// This is the model-to-view direction; only user edits
    /// ([`Element::dispatch_input`]) fire listeners.
    pub fn set_value(&self, value: &str) {
        *self.value.write() = value.to_owned();
    }

    /// Subscribe to user edits of the displayed value.
    pub fn on_input(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Simulate a user edit: set the displayed value, then fire every
    /// input listener with it, in subscription order.
    ///
    /// Listeners are snapshotted first, so a listener may subscribe
    /// further listeners without deadlock.
    pub fn dispatch_input(&self, value: &str) {
        self.set_value(value);
        let listeners: Vec<InputListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(value);
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("attributes", &self.attributes)
            .field("value", &*self.value.read())
            .finish_non_exhaustive()
    }
}

/// Text node payload: mutable content.
#[derive(Debug)]
pub struct TextNode {
    content: RwLock<String>,
}

impl TextNode {
    /// The current text content.
    pub fn content(&self) -> String {
        self.content.read().clone()
    }

    /// Replace the text content.
    pub fn set_content(&self, content: &str) {
        *self.content.write() = content.to_owned();
    }
}
