/// An entry in the element registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementEntry {
    pub name: &'static str,
    /// Elements that can be the target of a transition.
    pub state_like: bool,
    /// Attributes holding IDREF/IDREFS values.
    pub idref_attributes: &'static [&'static str],
}

/// Elements of the statechart vocabulary that take part in reference checks.
pub static ELEMENT_REGISTRY: &[ElementEntry] = &[
    ElementEntry {
        name: "scxml",
        state_like: false,
        idref_attributes: &["initial"],
    },
    ElementEntry {
        name: "state",
        state_like: true,
        idref_attributes: &["initial"],
    },
    ElementEntry {
        name: "parallel",
        state_like: true,
        idref_attributes: &[],
    },
    ElementEntry {
        name: "final",
        state_like: true,
        idref_attributes: &[],
    },
    ElementEntry {
        name: "history",
        state_like: true,
        idref_attributes: &[],
    },
    ElementEntry {
        name: "initial",
        state_like: true,
        idref_attributes: &[],
    },
    ElementEntry {
        name: "transition",
        state_like: false,
        idref_attributes: &["target"],
    },
];

/// Look up an element entry by local name.
pub fn lookup_element(name: &str) -> Option<&'static ElementEntry> {
    ELEMENT_REGISTRY.iter().find(|e| e.name == name)
}

pub fn is_state_like(name: &str) -> bool {
    lookup_element(name).is_some_and(|e| e.state_like)
}

/// Whether `tag@attribute` holds references to state-like elements.
pub fn targets_states(tag: &str, attribute: &str) -> bool {
    lookup_element(tag).is_some_and(|e| e.idref_attributes.contains(&attribute))
}

/// Element kinds whose presence as a child makes a state compound.
pub const CHILD_STATE_KINDS: &[&str] = &["state", "parallel", "final"];

/// Reference values starting with `#_` name runtime pseudo-targets
/// (`#_parent`, `#_internal`, `#_scxml_<id>`, `#_invoke_<id>`).
pub fn is_reserved_token(value: &str) -> bool {
    value.starts_with("#_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tokens() {
        assert!(is_reserved_token("#_parent"));
        assert!(is_reserved_token("#_scxml_session1"));
        assert!(is_reserved_token("#_"));
        assert!(!is_reserved_token("#parent"));
        assert!(!is_reserved_token("_parent"));
    }

    #[test]
    fn pseudo_states_are_state_like() {
        for name in ["state", "parallel", "final", "history", "initial"] {
            assert!(is_state_like(name), "{name}");
        }
        assert!(!is_state_like("transition"));
        assert!(!is_state_like("data"));
    }

    #[test]
    fn state_reference_contexts() {
        assert!(targets_states("transition", "target"));
        assert!(targets_states("scxml", "initial"));
        assert!(targets_states("state", "initial"));
        assert!(!targets_states("send", "target"));
        assert!(!targets_states("transition", "event"));
    }
}
