use proptest::prelude::*;
use statechart_lint::{Config, ValidationResult, Validator};

fn run(xml: &str) -> ValidationResult {
    Validator::new(Config::default().with_source_name("p.scxml"))
        .validate_string(xml)
        .unwrap()
        .0
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Platform-reserved tokens are never dangling references.
    #[test]
    fn reserved_tokens_never_dangle(suffix in "[A-Za-z0-9_.]{0,10}") {
        let xml = format!(
            r##"<scxml initial="a"><state id="a"><transition target="#_{suffix}"/><onentry><send target="#_{suffix}" event="e"/></onentry></state></scxml>"##
        );
        let result = run(&xml);
        prop_assert_eq!(result.with_code("E205").count(), 0, "{:?}", result.diagnostics);
    }

    // Unknown plain tokens always dangle, once per token.
    #[test]
    fn unknown_tokens_dangle(tokens in prop::collection::btree_set("z[a-z]{1,5}", 1..4)) {
        let targets: Vec<_> = tokens.iter().map(String::as_str).collect();
        let xml = format!(
            r#"<scxml><state id="a"><transition event="e" target="{}"/></state></scxml>"#,
            targets.join(" ")
        );
        let result = run(&xml);
        prop_assert_eq!(result.with_code("E205").count(), tokens.len());
    }

    // The duplicate-id diagnostic points back at the first definition.
    #[test]
    fn duplicate_points_at_first(
        ids in prop::collection::btree_set("[a-z]{1,6}", 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let dup = pick.get(&ids);
        let mut xml = String::from("<scxml>");
        for id in &ids {
            xml.push_str(&format!(r#"<state id="{id}"/>"#));
        }
        xml.push_str(&format!(r#"<state id="{dup}"/></scxml>"#));

        let result = run(&xml);
        let dups: Vec<_> = result.with_code("E206").collect();
        prop_assert_eq!(dups.len(), 1);
        let first = &dups[0].related[0].position;
        let expected_column = xml.find(&format!(r#"id="{dup}""#)).unwrap() + 1;
        prop_assert_eq!(first.line, 1);
        prop_assert_eq!(first.column, expected_column);
        prop_assert!(dups[0].position.column > first.column);
    }
}
