//! Template compilation: walking a view tree and wiring bindings.
//!
//! The compiler performs one depth-first pass over a node tree. Two
//! things are dynamic:
//!
//! - an element carrying a [`TWO_WAY_ATTR`] attribute naming a property
//!   key becomes a two-way input binding (model writes update the
//!   displayed value; user edits write back into the model), and
//! - a text node containing `{{ identifier }}` (first occurrence only)
//!   becomes an interpolation binding that re-substitutes into the
//!   original template on change, leaving the surrounding text intact.
//!
//! Everything else is left untouched; traversal still descends into every
//! node's children. Identifiers absent from the model substitute the
//! empty string, silently, and their bindings stay inert.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::binding::Binding;
use crate::dom::{Element, NodeKind, NodeRef, TextNode};
use crate::observe::Object;
use crate::value::Value;

/// Attribute marking an element as two-way bound to a model property.
pub const TWO_WAY_ATTR: &str = "v-model";

/// First `{{ identifier }}` span in a text node. Non-greedy, so adjacent
/// interpolations do not merge into one match.
static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("literal pattern is valid"));

/// The bindings produced by one [`compile`] pass.
///
/// Owns its bindings: dropping the view deregisters every binding, after
/// which model writes no longer touch the tree. Keep it alive as long as
/// the view should stay live.
#[derive(Debug, Default)]
pub struct CompiledView {
    bindings: Vec<Binding>,
}

impl CompiledView {
    /// Number of live bindings wired by the compile pass.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Compile the tree rooted at `root` against `model`.
///
/// Processes the root itself, then children, depth-first. The model is
/// expected to have been wrapped with [`crate::observe`] first; compiling
/// against an unwrapped model still substitutes current values but the
/// bindings never fire.
pub fn compile(root: &NodeRef, model: &Arc<Object>) -> CompiledView {
    let mut view = CompiledView::default();
    walk(root, model, &mut view.bindings);
    view
}

fn walk(node: &NodeRef, model: &Arc<Object>, bindings: &mut Vec<Binding>) {
    match node.kind() {
        NodeKind::Element(element) => compile_element(node, element, model, bindings),
        NodeKind::Text(text) => compile_text(node, text, model, bindings),
    }
    for child in node.children() {
        walk(&child, model, bindings);
    }
}

fn compile_element(
    node: &NodeRef,
    element: &Element,
    model: &Arc<Object>,
    bindings: &mut Vec<Binding>,
) {
    for attribute in element.attributes() {
        if attribute.name == TWO_WAY_ATTR {
            bind_two_way(node, element, &attribute.value, model, bindings);
        }
    }
}

/// Wire both directions of a two-way input binding.
///
/// The write-back edge goes through `Object::set`, whose sameness check
/// absorbs the echo when the model-to-view update reflects the value the
/// user just typed; that is the loop breaker.
fn bind_two_way(
    node: &NodeRef,
    element: &Element,
    key: &str,
    model: &Arc<Object>,
    bindings: &mut Vec<Binding>,
) {
    let rendered = model.get(key).map(|v| v.render()).unwrap_or_default();
    element.set_value(&rendered);

    // model -> view
    let view = node.clone();
    bindings.push(Binding::new(model, key, move |new, _old| {
        if let Some(element) = view.as_element() {
            element.set_value(&new.render());
        }
    }));

    // view -> model
    let subject = model.clone();
    let key = key.to_owned();
    element.on_input(move |text| {
        subject.set(&key, Value::from(text));
    });
    tracing::trace!(tag = element.tag(), "two-way binding wired");
}

fn compile_text(node: &NodeRef, text: &TextNode, model: &Arc<Object>, bindings: &mut Vec<Binding>) {
    let template = text.content();
    let Some(captures) = INTERPOLATION.captures(&template) else {
        return;
    };
    let (Some(span), Some(identifier)) = (captures.get(0), captures.get(1)) else {
        return;
    };
    let key = identifier.as_str().trim().to_owned();
    let prefix = template[..span.start()].to_owned();
    let suffix = template[span.end()..].to_owned();

    let rendered = model.get(&key).map(|v| v.render()).unwrap_or_default();
    text.set_content(&format!("{prefix}{rendered}{suffix}"));

    // Re-substitute only the matched span on change; prefix and suffix
    // come from the captured template, not from the current content.
    let view = node.clone();
    bindings.push(Binding::new(model, key, move |new, _old| {
        if let Some(text) = view.as_text() {
            text.set_content(&format!("{prefix}{}{suffix}", new.render()));
        }
    }));
    tracing::trace!("interpolation bound");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Attribute, Node};
    use crate::observe::observe;

    fn observed(entries: Vec<(&str, Value)>) -> Arc<Object> {
        let model = Object::new(entries);
        observe(&Value::Object(model.clone()));
        model
    }

    #[test]
    fn interpolation_substitutes_first_occurrence_only() {
        let model = observed(vec![("name", Value::from("Tifa"))]);
        let node = Node::text("{{ name }} and {{ name }}");
        let _view = compile(&node, &model);

        assert_eq!(node.as_text().unwrap().content(), "Tifa and {{ name }}");
    }

    #[test]
    fn interpolation_trims_identifier_whitespace() {
        let model = observed(vec![("name", Value::from("Tifa"))]);
        let node = Node::text("{{   name   }}!");
        let _view = compile(&node, &model);

        assert_eq!(node.as_text().unwrap().content(), "Tifa!");
    }

    #[test]
    fn absent_identifier_substitutes_empty_string() {
        let model = observed(vec![("present", Value::from(1i64))]);
        let node = Node::text("[{{ missing }}]");
        let view = compile(&node, &model);

        assert_eq!(node.as_text().unwrap().content(), "[]");
        // The binding exists but nothing ever registered it.
        assert_eq!(view.binding_count(), 1);
    }

    #[test]
    fn plain_nodes_are_untouched() {
        let model = observed(vec![("name", Value::from("Tifa"))]);
        let root = Node::element("div", [Attribute::new("class", "static")]);
        root.append_child(Node::text("no pattern here"));
        let view = compile(&root, &model);

        assert_eq!(view.binding_count(), 0);
        let text = root.children()[0].as_text().unwrap().content();
        assert_eq!(text, "no pattern here");
        assert_eq!(root.as_element().unwrap().value(), "");
    }

    #[test]
    fn two_way_attribute_seeds_displayed_value() {
        let model = observed(vec![("name", Value::from("Tifa"))]);
        let node = Node::element("input", [Attribute::new(TWO_WAY_ATTR, "name")]);
        let view = compile(&node, &model);

        assert_eq!(view.binding_count(), 1);
        assert_eq!(node.as_element().unwrap().value(), "Tifa");
    }

    #[test]
    fn dropping_the_view_disconnects_the_tree() {
        let model = observed(vec![("name", Value::from("Tifa"))]);
        let node = Node::text("Hello {{ name }}");
        let view = compile(&node, &model);
        drop(view);

        model.set("name", Value::from("Aerith"));
        // The binding deregistered on drop; the text keeps its last state.
        assert_eq!(node.as_text().unwrap().content(), "Hello Tifa");
    }
}
