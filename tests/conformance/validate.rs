use super::common::conformance_dir;
use statechart_lint::{ConfigFile, Diagnostic, Severity, Validator};

/// A single validation test case from the suite.
#[derive(Debug, serde::Deserialize)]
struct TestCase {
    id: String,
    name: String,
    input: String,
    #[serde(default)]
    config: Option<ConfigFile>,
    expected: Expected,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Expected {
    valid: Option<bool>,
    errors: Vec<ExpectedDiagnostic>,
    warnings: Vec<ExpectedDiagnostic>,
    infos: Vec<ExpectedDiagnostic>,
    absent: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ExpectedDiagnostic {
    code: String,
    #[serde(default)]
    line: Option<usize>,
    #[serde(default)]
    hint: Option<String>,
}

impl ExpectedDiagnostic {
    fn matches(&self, d: &Diagnostic) -> bool {
        d.code == self.code
            && self.line.is_none_or(|l| d.position.line == l)
            && self.hint.as_ref().is_none_or(|h| d.hints.contains(h))
    }
}

fn check_expected(
    case: &TestCase,
    severity: Severity,
    expected: &[ExpectedDiagnostic],
    actual: &[Diagnostic],
) -> bool {
    let mut ok = true;
    for want in expected {
        let found = actual
            .iter()
            .any(|d| d.severity == severity && want.matches(d));
        if !found {
            eprintln!(
                "  FAIL [{}] {}: expected {} {} (line {:?}, hint {:?}) not found",
                case.id, case.name, severity, want.code, want.line, want.hint
            );
            ok = false;
        }
    }
    ok
}

#[test]
fn validate_conformance_suite() {
    let suite_path = conformance_dir().join("validate.yaml");
    assert!(
        suite_path.exists(),
        "Conformance fixture not found: {:?}",
        suite_path
    );

    let content = std::fs::read_to_string(&suite_path).unwrap();
    let cases: Vec<TestCase> = serde_saphyr::from_str(&content).unwrap();
    assert!(!cases.is_empty());

    let mut passed = 0;
    let mut failed = 0;

    for case in &cases {
        let config = case
            .config
            .clone()
            .unwrap_or_default()
            .into_config()
            .unwrap()
            .with_source_name(format!("{}.scxml", case.id));

        let (result, _doc) = match Validator::new(config).validate_string(&case.input) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("  FAIL [{}] {}: parse error: {}", case.id, case.name, e);
                failed += 1;
                continue;
            }
        };

        let mut case_ok = true;
        if case.expected.valid == Some(true) && result.has_errors() {
            eprintln!("  FAIL [{}] {}: expected valid", case.id, case.name);
            case_ok = false;
        }
        case_ok &= check_expected(
            case,
            Severity::Error,
            &case.expected.errors,
            &result.diagnostics,
        );
        case_ok &= check_expected(
            case,
            Severity::Warning,
            &case.expected.warnings,
            &result.diagnostics,
        );
        case_ok &= check_expected(
            case,
            Severity::Info,
            &case.expected.infos,
            &result.diagnostics,
        );
        for code in &case.expected.absent {
            if result.with_code(code).next().is_some() {
                eprintln!(
                    "  FAIL [{}] {}: unexpected {} present",
                    case.id, case.name, code
                );
                case_ok = false;
            }
        }

        if case_ok {
            passed += 1;
        } else {
            for d in &result.diagnostics {
                eprintln!("      - {d}");
            }
            failed += 1;
        }
    }

    eprintln!(
        "Validation conformance: {} passed, {} failed, {} total",
        passed,
        failed,
        cases.len()
    );
    assert_eq!(failed, 0, "{} validation conformance tests failed", failed);
}
