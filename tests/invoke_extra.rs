use statechart_lint::{Config, Severity, ValidationResult, Validator};
use std::path::Path;

const CLEAN: &str = r#"<scxml initial="idle"><state id="idle"/></scxml>"#;

fn invoking(src: &str, kind: &str) -> String {
    format!(
        r#"<scxml initial="run"><state id="run"><invoke type="{kind}" src="{src}"/></state></scxml>"#
    )
}

fn write(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(name), text).unwrap();
}

fn run(dir: &Path, xml: &str) -> ValidationResult {
    let config = Config::default()
        .with_source_name("parent.scxml")
        .with_recursive_invoke(dir);
    Validator::new(config).validate_string(xml).unwrap().0
}

fn codes(result: &ValidationResult) -> Vec<&str> {
    result.diagnostics.iter().map(|d| d.code.as_str()).collect()
}

#[test]
fn clean_child_reports_info() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "child.scxml", CLEAN);
    let result = run(dir.path(), &invoking("child.scxml", "scxml"));

    assert_eq!(codes(&result), vec!["I502"]);
    let info = &result.diagnostics[0];
    assert_eq!(info.severity, Severity::Info);
    assert_eq!(info.position.file, "parent.scxml");
    assert_eq!(info.attribute.as_deref(), Some("src"));
}

#[test]
fn recursion_is_off_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_source_name("parent.scxml");
    let (result, _) = Validator::new(config)
        .validate_string(&invoking(&dir.path().join("missing.scxml").display().to_string(), "scxml"))
        .unwrap();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn missing_child_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let result = run(dir.path(), &invoking("missing.scxml", "scxml"));
    assert_eq!(codes(&result), vec!["W500"]);
    assert!(!result.has_errors());

    let strict = Config::default()
        .with_recursive_invoke(dir.path())
        .with_strict(true);
    let (result, _) = Validator::new(strict)
        .validate_string(&invoking("missing.scxml", "scxml"))
        .unwrap();
    assert_eq!(result.diagnostics[0].severity, Severity::Error);
}

#[test]
fn malformed_child_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.scxml", "<scxml><state id=\"a\"></scxml>");
    let result = run(dir.path(), &invoking("broken.scxml", "scxml"));

    assert_eq!(codes(&result), vec!["E501"]);
    let related = &result.diagnostics[0].related;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].position.file, "broken.scxml");
    assert!(related[0].position.line >= 1);
}

#[test]
fn non_utf8_child_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("child.scxml"), b"<scxml>\xff\xfe</scxml>").unwrap();
    let result = run(dir.path(), &invoking("child.scxml", "scxml"));

    assert_eq!(codes(&result), vec!["E501"]);
    assert!(result.has_errors());
    let d = &result.diagnostics[0];
    assert!(d.message.contains("invalid UTF-8"), "{}", d.message);
    assert_eq!(d.related[0].position.file, "child.scxml");
    assert_eq!(
        (d.related[0].position.line, d.related[0].position.column),
        (1, 8)
    );
}

#[test]
fn non_utf8_top_level_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("machine.scxml");
    std::fs::write(&path, b"<scxml>\n  \xc3</scxml>").unwrap();

    let err = Validator::default().validate_file(&path).unwrap_err();
    match err {
        statechart_lint::ValidateError::Parse(e) => assert_eq!((e.line, e.column), (2, 3)),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn child_diagnostics_carry_child_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "child.scxml",
        r#"<scxml initial="idle"><state id="idle"><transition event="go" target="gone"/></state></scxml>"#,
    );
    let result = run(dir.path(), &invoking("child.scxml", "scxml"));

    let dangling = result.with_code("E205").next().unwrap();
    assert_eq!(dangling.position.file, "child.scxml");
    assert_eq!(result.with_code("I502").count(), 0);
}

#[test]
fn self_invocation_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let xml = invoking("self.scxml", "scxml");
    write(dir.path(), "self.scxml", &xml);

    // From a string the file is not yet visited, so it is validated once.
    let result = run(dir.path(), &xml);
    assert_eq!(codes(&result), vec!["I502"]);

    // From the file itself it is already visited.
    let result = Validator::new(Config::default().with_recursive_invoke(dir.path()))
        .validate_file(&dir.path().join("self.scxml"))
        .unwrap();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn mutual_invocation_terminates() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.scxml", &invoking("b.scxml", "scxml"));
    write(dir.path(), "b.scxml", &invoking("a.scxml", "scxml"));

    let result = Validator::new(Config::default().with_recursive_invoke(dir.path()))
        .validate_file(&dir.path().join("a.scxml"))
        .unwrap();
    assert_eq!(codes(&result), vec!["I502"]);
}

#[test]
fn each_file_once_per_session() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "child.scxml", CLEAN);
    let xml = r#"<scxml initial="p"><parallel id="p"><state id="a"><invoke type="scxml" src="child.scxml"/></state><state id="b"><invoke type="scxml" src="./child.scxml"/></state></parallel></scxml>"#;
    let validator = Validator::new(Config::default().with_recursive_invoke(dir.path()));

    let (first, _) = validator.validate_string(xml).unwrap();
    assert_eq!(codes(&first), vec!["I502"]);
    // A new call starts a new session.
    let (second, _) = validator.validate_string(xml).unwrap();
    assert_eq!(codes(&second), vec!["I502"]);
}

#[test]
fn type_uri_and_file_scheme() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "child.scxml", CLEAN);
    for kind in ["http://www.w3.org/TR/scxml/", "http://www.w3.org/TR/scxml"] {
        let result = run(dir.path(), &invoking("file:child.scxml", kind));
        assert_eq!(codes(&result), vec!["I502"], "type {kind}");
    }
    let result = run(dir.path(), &invoking("child.scxml", "http://example.com/other"));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn nested_children_resolve_against_their_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    write(dir.path(), "sub/mid.scxml", &invoking("leaf.scxml", "scxml"));
    write(dir.path(), "sub/leaf.scxml", CLEAN);

    let result = run(dir.path(), &invoking("sub/mid.scxml", "scxml"));
    let infos: Vec<_> = result
        .with_code("I502")
        .map(|d| d.position.file.as_str())
        .collect();
    assert_eq!(infos, vec!["sub/mid.scxml", "parent.scxml"]);
}
