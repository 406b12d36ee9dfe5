//! Read-only helpers over the parsed `roxmltree` tree.

use crate::element_registry::CHILD_STATE_KINDS;
use crate::error::Position;
use roxmltree::{Document, Node};
use std::collections::HashMap;

/// Position of an element's start tag.
pub fn node_position(node: Node<'_, '_>, file: &str) -> Position {
    offset_position(node.document(), node.range().start, file)
}

/// Position of an attribute on `node`, falling back to the element itself.
pub fn attribute_position(node: Node<'_, '_>, attribute: &str, file: &str) -> Position {
    match node.attribute_node(attribute) {
        Some(attr) => offset_position(node.document(), attr.range().start, file),
        None => node_position(node, file),
    }
}

pub fn offset_position(doc: &Document<'_>, offset: usize, file: &str) -> Position {
    let pos = doc.text_pos_at(offset);
    Position::new(file, pos.row as usize, pos.col as usize, offset)
}

pub fn local_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

pub fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && local_name(node) == name
}

pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

pub fn children_named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    element_children(node).filter(move |c| local_name(*c) == name)
}

pub fn has_child(node: Node<'_, '_>, name: &'static str) -> bool {
    children_named(node, name).next().is_some()
}

/// All elements with the given local name, in document order.
pub fn elements_named<'a, 'input>(
    doc: &'a Document<'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    doc.descendants().filter(move |n| is_named(*n, name))
}

/// An attribute that is present and not blank.
pub fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name).filter(|v| !v.trim().is_empty())
}

pub fn has_attr(node: Node<'_, '_>, name: &str) -> bool {
    attr(node, name).is_some()
}

/// A `<state>` without state, parallel or final children.
pub fn is_atomic_state(node: Node<'_, '_>) -> bool {
    is_named(node, "state")
        && !element_children(node).any(|c| CHILD_STATE_KINDS.contains(&local_name(c)))
}

/// Whether `node` lies strictly inside `ancestor`.
pub fn is_descendant(node: Node<'_, '_>, ancestor: Node<'_, '_>) -> bool {
    node.ancestors().skip(1).any(|a| a == ancestor)
}

/// Map from `id` to the first element that declares it.
pub fn id_index<'a, 'input>(doc: &'a Document<'input>) -> HashMap<&'a str, Node<'a, 'input>> {
    let mut index = HashMap::new();
    for node in doc.descendants().filter(Node::is_element) {
        if let Some(id) = node.attribute("id") {
            index.entry(id).or_insert(node);
        }
    }
    index
}

/// Transition targets are IDREFS: whitespace separated.
pub fn reference_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split_whitespace()
}
