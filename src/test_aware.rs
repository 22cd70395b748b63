use crate::symbols::{DefKind, Definition};

/// Test-convention awareness.
///
/// Inside test files, test functions and lifecycle hooks are collected by
/// the runner rather than called by name, so they count as roots. Helper
/// definitions that merely *look* like test support only get a confidence
/// discount, not a root.

const TEST_LIFECYCLE: [&str; 6] = [
    "setUp",
    "tearDown",
    "setUpClass",
    "tearDownClass",
    "setup_method",
    "teardown_method",
];

/// True for definitions the test runner invokes on its own.
pub fn is_test_root(def: &Definition) -> bool {
    if !def.in_test_file {
        return false;
    }
    match def.kind {
        DefKind::Function | DefKind::Method => {
            def.simple_name.starts_with("test_")
                || TEST_LIFECYCLE.contains(&def.simple_name.as_str())
                || has_fixture_decorator(def)
        }
        DefKind::Class => {
            def.simple_name.starts_with("Test") || def.simple_name.ends_with("Test")
        }
        _ => false,
    }
}

/// Pytest fixtures are injected by parameter name, never called directly.
pub fn has_fixture_decorator(def: &Definition) -> bool {
    def.decorators
        .iter()
        .any(|d| d == "fixture" || d.ends_with(".fixture") || d.starts_with("pytest."))
}

/// Name shapes that suggest shared test plumbing, used by the confidence
/// engine to discount rather than root.
pub fn looks_like_test_helper(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("make_")
        || lower.starts_with("fake_")
        || lower.starts_with("mock_")
        || lower.starts_with("stub_")
        || lower.contains("fixture")
        || lower.contains("helper")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_def(name: &str, kind: DefKind, in_test_file: bool) -> Definition {
        let mut def = Definition::new(
            format!("tests.{name}"),
            kind,
            "tests".to_string(),
            PathBuf::from("test_things.py"),
            1,
        );
        def.in_test_file = in_test_file;
        def
    }

    #[test]
    fn test_test_functions_are_roots() {
        assert!(is_test_root(&test_def("test_login", DefKind::Function, true)));
        assert!(is_test_root(&test_def("setUp", DefKind::Method, true)));
        assert!(is_test_root(&test_def("TestLogin", DefKind::Class, true)));
    }

    #[test]
    fn test_only_inside_test_files() {
        assert!(!is_test_root(&test_def("test_login", DefKind::Function, false)));
    }

    #[test]
    fn test_fixture_decorator_roots() {
        let mut def = test_def("db_session", DefKind::Function, true);
        def.decorators.push("pytest.fixture".to_string());
        assert!(is_test_root(&def));
    }

    #[test]
    fn test_helpers_are_not_roots() {
        assert!(!is_test_root(&test_def("make_user", DefKind::Function, true)));
        assert!(looks_like_test_helper("make_user"));
        assert!(looks_like_test_helper("response_fixture"));
        assert!(!looks_like_test_helper("parse_config"));
    }
}
