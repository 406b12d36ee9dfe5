//! Semantic rules layered on top of structural validation.
//!
//! Each rule is independent and stateless: a function of the document and
//! the configuration returning zero or more diagnostics. Rules never stop
//! each other; the engine runs them in list order and concatenates results.

use crate::codes::{self, spec_ref};
use crate::config::Config;
use crate::dom::*;
use crate::element_registry::is_reserved_token;
use crate::error::{Diagnostic, Severity};
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

// ─── Rule contract ───────────────────────────────────────────────────────────

/// A named check over one document.
pub trait SemanticRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, doc: &Document<'_>, config: &Config) -> Vec<Diagnostic>;
}

pub type RuleFn = fn(&Document<'_>, &Config) -> Vec<Diagnostic>;

/// A rule backed by a plain function.
#[derive(Clone, Copy)]
pub struct FnRule {
    pub name: &'static str,
    pub check: RuleFn,
}

impl SemanticRule for FnRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn check(&self, doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
        (self.check)(doc, config)
    }
}

/// The canonical rule list, grouped by code range.
pub static DEFAULT_RULES: &[FnRule] = &[
    FnRule { name: "id-format", check: e301_id_format },
    FnRule { name: "event-descriptor", check: e302_event_descriptor },
    FnRule { name: "param", check: e310_param },
    FnRule { name: "cancel", check: e311_cancel },
    FnRule { name: "send-content", check: e312_send_content },
    FnRule { name: "send-namelist", check: e313_send_namelist },
    FnRule { name: "invoke-source", check: e314_invoke_source },
    FnRule { name: "donedata", check: e315_donedata },
    FnRule { name: "initial-cardinality", check: e320_initial_cardinality },
    FnRule { name: "initial-transition", check: e330_initial_transition },
    FnRule { name: "history-target", check: e332_history_target },
    FnRule { name: "transition-trigger", check: e333_transition_trigger },
    FnRule { name: "initial-conflict", check: e334_initial_conflict },
    FnRule { name: "atomic-initial", check: e335_atomic_initial },
    FnRule { name: "deadlock", check: w340_deadlock },
    FnRule { name: "unconditional-cycle", check: e341_unconditional_cycle },
];

pub fn default_semantic_rules() -> Vec<Arc<dyn SemanticRule>> {
    DEFAULT_RULES
        .iter()
        .map(|rule| Arc::new(*rule) as Arc<dyn SemanticRule>)
        .collect()
}

/// Run the configured rules in order.
pub fn run_rules(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for rule in config.rules() {
        let found = rule.check(doc, config);
        if !found.is_empty() {
            tracing::debug!(rule = rule.name(), count = found.len(), "rule reported");
        }
        diagnostics.extend(found);
    }
    diagnostics
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.-]*$").unwrap());

static EVENT_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.-]+$").unwrap());

fn on_element(node: Node<'_, '_>, config: &Config, code: &str, message: String) -> Diagnostic {
    Diagnostic::error(
        code,
        message,
        node_position(node, &config.source_name),
        local_name(node),
    )
}

fn on_attribute(
    node: Node<'_, '_>,
    attribute: &str,
    config: &Config,
    code: &str,
    message: String,
) -> Diagnostic {
    Diagnostic::error(
        code,
        message,
        attribute_position(node, attribute, &config.source_name),
        local_name(node),
    )
    .with_attribute(attribute)
}

fn is_conditional(transition: Node<'_, '_>) -> bool {
    has_attr(transition, "event") || has_attr(transition, "cond")
}

fn describe(node: Node<'_, '_>) -> String {
    match node.attribute("id") {
        Some(id) => format!("<{} id=\"{}\">", local_name(node), id),
        None => format!("<{}>", local_name(node)),
    }
}

/// Resolved, non-reserved target elements of a transition.
fn target_nodes<'a, 'input>(
    transition: Node<'a, 'input>,
    index: &HashMap<&'a str, Node<'a, 'input>>,
) -> Vec<(&'a str, Node<'a, 'input>)> {
    transition
        .attribute("target")
        .map(reference_tokens)
        .into_iter()
        .flatten()
        .filter(|t| !is_reserved_token(t))
        .filter_map(|t| index.get(t).map(|n| (t, *n)))
        .collect()
}

// ─── E301 ────────────────────────────────────────────────────────────────────

fn e301_id_format(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for node in doc.descendants().filter(Node::is_element) {
        let Some(id) = node.attribute("id") else {
            continue;
        };
        if ID_RE.is_match(id) {
            continue;
        }
        let mut d = on_attribute(
            node,
            "id",
            config,
            codes::ID_FORMAT,
            format!(
                "id \"{id}\" must start with a letter or '_' and contain only letters, digits, '_', '.' or '-'"
            ),
        );
        if id.contains(':') {
            d = d.with_hint("colons are reserved for namespace prefixes");
        } else if id.starts_with(|c: char| c.is_ascii_digit()) {
            d = d.with_hint("ids cannot start with a digit");
        }
        out.push(d);
    }
    out
}

// ─── E302 ────────────────────────────────────────────────────────────────────

fn e302_event_descriptor(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for transition in elements_named(doc, "transition") {
        let Some(event) = transition.attribute("event") else {
            continue;
        };
        for token in event.split_whitespace() {
            if token.contains(',') {
                out.push(
                    on_attribute(
                        transition,
                        "event",
                        config,
                        codes::EVENT_FORMAT,
                        format!("event descriptor \"{token}\" contains a comma"),
                    )
                    .with_hint("separate event descriptors with spaces, not commas")
                    .with_spec_ref(spec_ref("EventDescriptors")),
                );
            } else if !is_event_token(token) {
                out.push(
                    on_attribute(
                        transition,
                        "event",
                        config,
                        codes::EVENT_FORMAT,
                        format!("event descriptor \"{token}\" contains invalid characters"),
                    )
                    .with_spec_ref(spec_ref("EventDescriptors")),
                );
            }
        }
    }
    out
}

/// Plain tokens, plus the `*` and `prefix.*` wildcard forms.
fn is_event_token(token: &str) -> bool {
    token == "*"
        || EVENT_TOKEN_RE.is_match(token)
        || token
            .strip_suffix(".*")
            .is_some_and(|prefix| EVENT_TOKEN_RE.is_match(prefix))
}

// ─── E310–E315 ───────────────────────────────────────────────────────────────

fn e310_param(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for param in elements_named(doc, "param") {
        if !has_attr(param, "name") {
            out.push(
                on_element(
                    param,
                    config,
                    codes::PARAM_SOURCE,
                    "<param> requires a non-empty name".to_string(),
                )
                .with_attribute("name")
                .with_spec_ref(spec_ref("param")),
            );
        }
        let sources = ["expr", "location"]
            .iter()
            .filter(|a| has_attr(param, a))
            .count();
        if sources != 1 {
            let found = if sources == 0 { "neither" } else { "both" };
            out.push(
                on_element(
                    param,
                    config,
                    codes::PARAM_SOURCE,
                    format!("<param> must have exactly one of expr or location, found {found}"),
                )
                .with_spec_ref(spec_ref("param")),
            );
        }
    }
    out
}

fn e311_cancel(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    elements_named(doc, "cancel")
        .filter(|c| usize::from(has_attr(*c, "sendid")) + usize::from(has_attr(*c, "sendidexpr")) != 1)
        .map(|c| {
            on_element(
                c,
                config,
                codes::CANCEL_TARGET,
                "<cancel> must have exactly one of sendid or sendidexpr".to_string(),
            )
            .with_spec_ref(spec_ref("cancel"))
        })
        .collect()
}

fn e312_send_content(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for send in elements_named(doc, "send") {
        let event_attr = ["event", "eventexpr"].into_iter().find(|a| has_attr(send, a));
        if let Some(attribute) = event_attr
            && has_child(send, "content")
        {
            out.push(
                on_attribute(
                    send,
                    attribute,
                    config,
                    codes::SEND_EVENT_CONTENT,
                    format!("<send> cannot combine {attribute} with a <content> child"),
                )
                .with_hint("<content> replaces the whole event payload; drop one of them")
                .with_spec_ref(spec_ref("send")),
            );
        }
    }
    out
}

fn e313_send_namelist(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for send in elements_named(doc, "send") {
        if !has_attr(send, "namelist") {
            continue;
        }
        for child in ["content", "param"] {
            if has_child(send, child) {
                out.push(
                    on_attribute(
                        send,
                        "namelist",
                        config,
                        codes::SEND_NAMELIST_CONTENT,
                        format!("<send> cannot combine namelist with a <{child}> child"),
                    )
                    .with_spec_ref(spec_ref("send")),
                );
            }
        }
    }
    out
}

fn e314_invoke_source(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    elements_named(doc, "invoke")
        .filter(|i| has_attr(*i, "src") && has_attr(*i, "srcexpr"))
        .map(|i| {
            on_attribute(
                i,
                "srcexpr",
                config,
                codes::INVOKE_SOURCE,
                "<invoke> cannot set both src and srcexpr".to_string(),
            )
            .with_spec_ref(spec_ref("invoke"))
        })
        .collect()
}

fn e315_donedata(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    elements_named(doc, "donedata")
        .filter(|d| has_child(*d, "content") && has_child(*d, "param"))
        .map(|d| {
            on_element(
                d,
                config,
                codes::DONEDATA_CONTENT,
                "<donedata> cannot have both <content> and <param> children".to_string(),
            )
            .with_spec_ref(spec_ref("donedata"))
        })
        .collect()
}

// ─── E320 ────────────────────────────────────────────────────────────────────

fn e320_initial_cardinality(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for initial in elements_named(doc, "initial") {
        let count = children_named(initial, "transition").count();
        if count != 1 {
            out.push(
                on_element(
                    initial,
                    config,
                    codes::INITIAL_TRANSITION_COUNT,
                    format!("<initial> must contain exactly one <transition>, found {count}"),
                )
                .with_spec_ref(spec_ref("initial")),
            );
        }
    }
    out
}

// ─── E330 / E331 ─────────────────────────────────────────────────────────────

fn e330_initial_transition(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let index = id_index(doc);
    let mut out = Vec::new();
    for initial in elements_named(doc, "initial") {
        for transition in children_named(initial, "transition") {
            for attribute in ["event", "cond"] {
                if transition.attribute(attribute).is_some() {
                    out.push(
                        on_attribute(
                            transition,
                            attribute,
                            config,
                            codes::INITIAL_TRANSITION_SHAPE,
                            format!("the transition inside <initial> must not have {attribute}"),
                        )
                        .with_spec_ref(spec_ref("initial")),
                    );
                }
            }
            if !has_attr(transition, "target") {
                out.push(
                    on_element(
                        transition,
                        config,
                        codes::INITIAL_TRANSITION_SHAPE,
                        "the transition inside <initial> must specify a target".to_string(),
                    )
                    .with_attribute("target")
                    .with_spec_ref(spec_ref("initial")),
                );
                continue;
            }

            let Some(container) = initial.parent_element() else {
                continue;
            };
            for (id, target) in target_nodes(transition, &index) {
                if !is_descendant(target, container) {
                    out.push(
                        on_attribute(
                            transition,
                            "target",
                            config,
                            codes::INITIAL_TARGET_SCOPE,
                            format!(
                                "initial target \"{}\" is not a descendant of {}",
                                id,
                                describe(container)
                            ),
                        )
                        .with_spec_ref(spec_ref("initial")),
                    );
                }
            }
        }
    }
    out
}

// ─── E332 ────────────────────────────────────────────────────────────────────

fn e332_history_target(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let index = id_index(doc);
    let mut out = Vec::new();
    for history in elements_named(doc, "history") {
        let Some(container) = history.parent_element() else {
            continue;
        };
        let deep = attr(history, "type") == Some("deep");
        for transition in children_named(history, "transition") {
            for (id, target) in target_nodes(transition, &index) {
                let allowed = if deep {
                    is_descendant(target, container)
                } else {
                    target.parent_element() == Some(container)
                };
                if allowed {
                    continue;
                }
                let scope = if deep {
                    "a descendant"
                } else {
                    "an immediate child"
                };
                out.push(
                    on_attribute(
                        transition,
                        "target",
                        config,
                        codes::HISTORY_TARGET_SCOPE,
                        format!(
                            "{} history target \"{}\" must be {} of {}",
                            if deep { "deep" } else { "shallow" },
                            id,
                            scope,
                            describe(container)
                        ),
                    )
                    .with_spec_ref(spec_ref("history")),
                );
            }
        }
    }
    out
}

// ─── E333 ────────────────────────────────────────────────────────────────────

fn e333_transition_trigger(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    elements_named(doc, "transition")
        .filter(|t| !t.parent_element().is_some_and(|p| is_named(p, "initial")))
        .filter(|t| !["event", "cond", "target"].iter().any(|a| has_attr(*t, a)))
        .map(|t| {
            on_element(
                t,
                config,
                codes::EMPTY_TRANSITION,
                "<transition> must specify at least one of event, cond or target".to_string(),
            )
            .with_spec_ref(spec_ref("transition"))
        })
        .collect()
}

// ─── E334 / E335 ─────────────────────────────────────────────────────────────

fn e334_initial_conflict(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    doc.descendants()
        .filter(|n| is_named(*n, "state") || is_named(*n, "scxml"))
        .filter(|n| n.attribute("initial").is_some() && has_child(*n, "initial"))
        .map(|n| {
            on_attribute(
                n,
                "initial",
                config,
                codes::INITIAL_CONFLICT,
                format!(
                    "{} cannot have both an initial attribute and an <initial> child",
                    describe(n)
                ),
            )
            .with_spec_ref(spec_ref(local_name(n)))
        })
        .collect()
}

fn e335_atomic_initial(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    doc.descendants()
        .filter(|n| is_atomic_state(*n) && n.attribute("initial").is_some())
        .map(|n| {
            on_attribute(
                n,
                "initial",
                config,
                codes::ATOMIC_INITIAL,
                format!(
                    "atomic {} has no child states, so it cannot declare initial",
                    describe(n)
                ),
            )
            .with_spec_ref(spec_ref("state"))
        })
        .collect()
}

// ─── W340 ────────────────────────────────────────────────────────────────────

/// Atomic states whose every transition waits on an event or condition.
/// States with `<invoke>` rely on asynchronous done/error events and are exempt.
fn w340_deadlock(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for state in doc.descendants().filter(|n| is_atomic_state(*n)) {
        if has_child(state, "invoke") {
            continue;
        }
        let mut transitions = children_named(state, "transition").peekable();
        if transitions.peek().is_none() {
            continue;
        }
        if transitions.all(is_conditional) {
            out.push(
                on_element(
                    state,
                    config,
                    codes::POSSIBLE_DEADLOCK,
                    format!(
                        "{} may deadlock: every transition requires an event or condition",
                        describe(state)
                    ),
                )
                .with_severity(Severity::Warning)
                .with_hint("add an eventless fallback transition if no matching event is guaranteed"),
            );
        }
    }
    out
}

// ─── E341 ────────────────────────────────────────────────────────────────────

/// Graph of state ids whose edges are unconditional transitions only.
struct EventlessGraph<'a> {
    ids: Vec<&'a str>,
    edges: Vec<Vec<usize>>,
}

impl<'a> EventlessGraph<'a> {
    fn build(doc: &'a Document<'_>) -> Self {
        let states: Vec<Node<'a, '_>> = doc
            .descendants()
            .filter(|n| n.is_element() && matches!(local_name(*n), "state" | "parallel" | "final"))
            .filter(|n| n.attribute("id").is_some())
            .collect();
        let mut position: HashMap<&'a str, usize> = HashMap::new();
        let mut ids = Vec::new();
        for state in &states {
            if let Some(id) = state.attribute("id")
                && !position.contains_key(id)
            {
                position.insert(id, ids.len());
                ids.push(id);
            }
        }

        let mut edges = vec![Vec::new(); ids.len()];
        for state in &states {
            let Some(from) = state.attribute("id").and_then(|id| position.get(id)) else {
                continue;
            };
            for transition in children_named(*state, "transition") {
                if is_conditional(transition) {
                    continue;
                }
                let targets = transition.attribute("target").map(reference_tokens);
                for target in targets.into_iter().flatten() {
                    if let Some(to) = position.get(target) {
                        edges[*from].push(*to);
                    }
                }
            }
        }
        EventlessGraph { ids, edges }
    }

    /// First cycle found by depth-first search from each state in document order.
    fn find_cycle(&self) -> Option<Vec<usize>> {
        let mut done = vec![false; self.ids.len()];
        let mut path = Vec::new();
        for start in 0..self.ids.len() {
            if let Some(cycle) = self.visit(start, &mut path, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit(&self, node: usize, path: &mut Vec<usize>, done: &mut [bool]) -> Option<Vec<usize>> {
        if let Some(at) = path.iter().position(|p| *p == node) {
            let mut cycle = path[at..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if done[node] {
            return None;
        }
        path.push(node);
        for next in &self.edges[node] {
            if let Some(cycle) = self.visit(*next, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done[node] = true;
        None
    }
}

fn e341_unconditional_cycle(doc: &Document<'_>, config: &Config) -> Vec<Diagnostic> {
    let graph = EventlessGraph::build(doc);
    let Some(cycle) = graph.find_cycle() else {
        return Vec::new();
    };
    let names: Vec<&str> = cycle.iter().map(|i| graph.ids[*i]).collect();
    let first = names[0];
    let Some(node) = id_index(doc).get(first).copied() else {
        return Vec::new();
    };
    vec![
        on_element(
            node,
            config,
            codes::UNCONDITIONAL_CYCLE,
            format!(
                "unconditional transition cycle: {} (no event is needed to traverse it)",
                names.join(" -> ")
            ),
        )
        .with_hint("add an event or cond to at least one transition in the cycle")
        .with_spec_ref(spec_ref("SelectingTransitions")),
    ]
}
