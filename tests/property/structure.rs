use proptest::prelude::*;
use statechart_lint::{Config, ValidationResult, Validator, serialize};

fn run(xml: &str) -> ValidationResult {
    Validator::new(Config::default().with_source_name("p.scxml"))
        .validate_string(xml)
        .unwrap()
        .0
}

fn ring(len: usize, evented: Option<usize>) -> String {
    let mut xml = String::from(r#"<scxml initial="s0">"#);
    for i in 0..len {
        let next = (i + 1) % len;
        let event = if evented == Some(i) { r#" event="tick""# } else { "" };
        xml.push_str(&format!(
            r#"<state id="s{i}"><transition{event} target="s{next}"/></state>"#
        ));
    }
    xml.push_str("</scxml>");
    xml
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn initial_needs_exactly_one_transition(count in 0usize..4) {
        let transitions = r#"<transition target="c"/>"#.repeat(count);
        let xml = format!(
            r#"<scxml initial="p"><state id="p"><initial>{transitions}</initial><state id="c"/></state></scxml>"#
        );
        let result = run(&xml);
        prop_assert_eq!(result.with_code("E320").count(), usize::from(count != 1));
    }

    // Only atomic states whose transitions all need an event or condition may deadlock.
    #[test]
    fn deadlock_warning(evented in 0usize..4, fallback in any::<bool>()) {
        let mut body = r#"<transition event="go" target="b"/>"#.repeat(evented);
        if fallback {
            body.push_str(r#"<transition target="b"/>"#);
        }
        let xml = format!(
            r#"<scxml initial="a"><state id="a">{body}</state><final id="b"/></scxml>"#
        );
        let result = run(&xml);
        prop_assert_eq!(
            result.with_code("W340").count(),
            usize::from(evented > 0 && !fallback)
        );
    }

    #[test]
    fn eventless_ring_is_one_cycle(len in 1usize..7) {
        let result = run(&ring(len, None));
        let cycles: Vec<_> = result.with_code("E341").collect();
        prop_assert_eq!(cycles.len(), 1);
        prop_assert!(cycles[0].message.contains("s0 -> "));
    }

    #[test]
    fn one_event_breaks_the_ring(len in 1usize..7, at in any::<prop::sample::Index>()) {
        let at = at.index(len);
        let result = run(&ring(len, Some(at)));
        prop_assert_eq!(result.with_code("E341").count(), 0);
    }

    #[test]
    fn validation_is_deterministic(len in 1usize..5, typo in "[a-z]{3,6}") {
        let xml = ring(len, None).replace(r#"target="s0""#, &format!(r#"target="{typo}""#));
        let first = run(&xml);
        let second = run(&xml);
        prop_assert_eq!(serialize(&first).unwrap(), serialize(&second).unwrap());
        prop_assert_eq!(first, second);
    }
}
