//! Reference graph: ids, duplicates, and IDREF/IDREFS integrity.

use crate::codes;
use crate::dom::{attribute_position, local_name, reference_tokens};
use crate::element_registry::{is_reserved_token, is_state_like, lookup_element};
use crate::error::{Diagnostic, Position, Related};
use roxmltree::{Document, Node};
use std::collections::{BTreeMap, BTreeSet};

/// Label of the related location attached to duplicate-id diagnostics.
pub const FIRST_DEFINED_HERE: &str = "first defined here";

/// Every `id` in a document, the subset on state-like elements, and the
/// diagnostics for duplicate ids and dangling references.
#[derive(Clone, Debug, Default)]
pub struct RefGraph {
    ids: BTreeMap<String, Position>,
    state_ids: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl RefGraph {
    /// Walk the document once in document order, then check references.
    pub fn build(doc: &Document<'_>, file: &str) -> Self {
        let mut graph = RefGraph::default();

        for node in doc.descendants().filter(Node::is_element) {
            let Some(id) = node.attribute("id") else {
                continue;
            };
            let position = attribute_position(node, "id", file);
            if let Some(first) = graph.ids.get(id) {
                graph.diagnostics.push(
                    Diagnostic::error(
                        codes::DUPLICATE_ID,
                        format!(
                            "duplicate id \"{}\" (first defined at {}:{})",
                            id, first.line, first.column
                        ),
                        position,
                        local_name(node),
                    )
                    .with_attribute("id")
                    .with_related(Related::new(FIRST_DEFINED_HERE, first.clone())),
                );
                continue;
            }
            graph.ids.insert(id.to_string(), position);
            if is_state_like(local_name(node)) {
                graph.state_ids.insert(id.to_string());
            }
        }

        for node in doc.descendants().filter(Node::is_element) {
            let Some(entry) = lookup_element(local_name(node)) else {
                continue;
            };
            for attribute in entry.idref_attributes {
                if let Some(value) = node.attribute(*attribute) {
                    graph.check_references(node, attribute, value, file);
                }
            }
        }

        graph
    }

    fn check_references(&mut self, node: Node<'_, '_>, attribute: &str, value: &str, file: &str) {
        for token in reference_tokens(value) {
            if is_reserved_token(token) || self.ids.contains_key(token) {
                continue;
            }
            self.diagnostics.push(
                Diagnostic::error(
                    codes::DANGLING_REFERENCE,
                    format!(
                        "reference \"{}\" in {}@{} does not match any id in this document",
                        token,
                        local_name(node),
                        attribute
                    ),
                    attribute_position(node, attribute, file),
                    local_name(node),
                )
                .with_attribute(attribute)
                .with_hint(format!(
                    "check the spelling of \"{token}\" or declare an element with that id"
                )),
            );
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Position of the first element declaring `id`.
    pub fn first_definition(&self, id: &str) -> Option<&Position> {
        self.ids.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }

    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.state_ids.iter().map(String::as_str)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(xml: &str) -> RefGraph {
        let doc = Document::parse(xml).unwrap();
        RefGraph::build(&doc, "t.scxml")
    }

    #[test]
    fn collects_ids_and_state_subset() {
        let g = graph(
            r#"<scxml initial="a"><state id="a"><onentry><send id="snd" event="e"/></onentry></state><final id="done"/></scxml>"#,
        );
        assert!(g.contains("snd"));
        assert_eq!(g.ids().collect::<Vec<_>>(), vec!["a", "done", "snd"]);
        assert_eq!(g.state_ids().collect::<Vec<_>>(), vec!["a", "done"]);
        assert!(g.diagnostics().is_empty());
    }

    #[test]
    fn pseudo_state_ids_are_state_like() {
        let g = graph(
            r#"<scxml><state id="p"><initial id="start"><transition target="c"/></initial><history id="h"><transition target="c"/></history><state id="c"/></state></scxml>"#,
        );
        assert_eq!(g.state_ids().collect::<Vec<_>>(), vec!["c", "h", "p", "start"]);
    }

    #[test]
    fn duplicate_points_at_first() {
        let g = graph("<scxml>\n<state id=\"a\"/>\n<state id=\"a\"/>\n<state id=\"a\"/>\n</scxml>");
        let dups: Vec<_> = g.diagnostics().iter().filter(|d| d.code == "E206").collect();
        assert_eq!(dups.len(), 2);
        for d in dups {
            assert_eq!(d.related.len(), 1);
            assert_eq!(d.related[0].position.line, 2);
            assert_eq!(d.related[0].position.column, 8);
        }
    }

    #[test]
    fn idrefs_split_on_whitespace() {
        let g = graph(
            r#"<scxml><parallel id="p"><state id="a"><transition target="a  b #_internal"/></state></parallel></scxml>"#,
        );
        let dangling: Vec<_> = g.diagnostics().iter().filter(|d| d.code == "E205").collect();
        assert_eq!(dangling.len(), 1);
        assert!(dangling[0].message.starts_with("reference \"b\""));
        assert_eq!(dangling[0].attribute.as_deref(), Some("target"));
    }

    #[test]
    fn reserved_tokens_with_empty_id_map() {
        let g = graph(r##"<scxml initial="#_parent"><transition target="#_scxml_x"/></scxml>"##);
        assert!(g.diagnostics().is_empty());
    }
}
