use super::common::values_structurally_equal;
use statechart_lint::{
    Config, Diagnostic, Position, PrettyOptions, PrettyReporter, Related, ValidationResult,
    Validator, serialize,
};

const MACHINE: &str = "<scxml version=\"1.0\" initial=\"s0\">
  <state id=\"s0\">
    <transition event=\"go\" target=\"acitve\"/>
  </state>
  <state id=\"active\"/>
</scxml>";

fn validate_machine() -> ValidationResult {
    let config = Config::default().with_source_name("machine.scxml");
    Validator::new(config).validate_string(MACHINE).unwrap().0
}

#[test]
fn json_report_shape() {
    let result = validate_machine();
    let json: serde_json::Value = serde_json::from_str(&serialize(&result).unwrap()).unwrap();
    let dangling = json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["code"] == "E205")
        .unwrap();

    let offset = dangling["position"]["offset"].clone();
    let expected = serde_json::json!({
        "severity": "error",
        "code": "E205",
        "message": "reference \"acitve\" in transition@target does not match any id in this document",
        "position": {"file": "machine.scxml", "line": 3, "column": 28, "offset": offset},
        "tag": "transition",
        "attribute": "target",
        "hints": [
            "check the spelling of \"acitve\" or declare an element with that id",
            "Did you mean \"active\"?"
        ]
    });
    assert!(
        values_structurally_equal(dangling, &expected),
        "got {dangling:#}"
    );
}

#[test]
fn pretty_frame_for_dangling_reference() {
    let result = validate_machine();
    let only_e205 = ValidationResult::new(result.with_code("E205").cloned().collect());
    let text = PrettyReporter::default()
        .with_source("machine.scxml", MACHINE)
        .render(&only_e205);

    let expected = "\
machine.scxml:3:28: error[E205] reference \"acitve\" in transition@target does not match any id in this document
  hint: check the spelling of \"acitve\" or declare an element with that id
  hint: Did you mean \"active\"?
  |
2 |   <state id=\"s0\">
3 |     <transition event=\"go\" target=\"acitve\"/>
  |                                    ^~~~~~
4 |   </state>

summary: 1 error(s), 0 warning(s), 1 total
";
    assert_eq!(text, expected);
}

#[test]
fn pretty_orders_ascending() {
    let result = ValidationResult::new(vec![
        Diagnostic::error("E301", "late", Position::new("a.scxml", 9, 1, 0), "state"),
        Diagnostic::warning("W340", "early", Position::new("a.scxml", 2, 5, 0), "state"),
        Diagnostic::error("E205", "same line", Position::new("a.scxml", 2, 5, 0), "transition"),
    ]);
    let text = PrettyReporter::default().render(&result);
    let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("a.scxml")).collect();
    assert_eq!(
        headers,
        vec![
            "a.scxml:2:5: error[E205] same line",
            "a.scxml:2:5: warning[W340] early",
            "a.scxml:9:1: error[E301] late",
        ]
    );
    assert!(text.ends_with("summary: 2 error(s), 1 warning(s), 3 total\n"));
}

#[test]
fn related_note_with_one_line_frame() {
    let source = "<scxml>\n  <state id=\"a\"/>\n  <state id=\"a\"/>\n</scxml>";
    let result = Validator::new(Config::default().with_source_name("dup.scxml"))
        .validate_string(source)
        .unwrap()
        .0;
    let text = PrettyReporter::default()
        .with_source("dup.scxml", source)
        .render(&result);
    assert!(text.contains("  note: first defined here (dup.scxml:2:10)\n2 |   <state id=\"a\"/>\n"));
}

#[test]
fn expand_to_enclosing_element() {
    let source = "<scxml>\n  <state id=\"1a\">\n    <onentry/>\n    <onexit/>\n    <invoke/>\n  </state>\n</scxml>";
    let result = ValidationResult::new(vec![
        Diagnostic::error("E301", "bad id", Position::new("x.scxml", 2, 3, 10), "state"),
    ]);
    let options = PrettyOptions {
        context_before: 0,
        context_after: 0,
        expand_element: true,
        ..PrettyOptions::default()
    };
    let text = PrettyReporter::new(options)
        .with_source("x.scxml", source)
        .render(&result);
    assert!(text.contains("6 |   </state>\n"));
    assert!(!text.contains("7 | </scxml>"));

    let bounded = PrettyOptions {
        context_before: 0,
        context_after: 0,
        expand_element: true,
        max_expand_lines: 2,
        ..PrettyOptions::default()
    };
    let text = PrettyReporter::new(bounded)
        .with_source("x.scxml", source)
        .render(&result);
    assert!(text.contains("3 |     <onentry/>\n"));
    assert!(!text.contains("4 |"));
}

#[test]
fn colours_are_optional() {
    let result = ValidationResult::new(vec![
        Diagnostic::warning("W340", "m", Position::file_only("a"), "state").with_hint("h"),
    ]);
    let plain = PrettyReporter::default().render(&result);
    assert!(!plain.contains('\u{1b}'));
    let coloured = PrettyReporter::new(PrettyOptions {
        color: true,
        ..PrettyOptions::default()
    })
    .render(&result);
    assert!(coloured.contains('\u{1b}'));
}

#[test]
fn related_without_source_has_no_frame() {
    let result = ValidationResult::new(vec![
        Diagnostic::error("E206", "duplicate id \"a\"", Position::file_only("a"), "state")
            .with_related(Related::new("first defined here", Position::new("b", 1, 1, 0))),
    ]);
    let text = PrettyReporter::default().render(&result);
    assert_eq!(
        text,
        "a:0:0: error[E206] duplicate id \"a\"\n  note: first defined here (b:1:1)\n\nsummary: 1 error(s), 0 warning(s), 1 total\n"
    );
}
