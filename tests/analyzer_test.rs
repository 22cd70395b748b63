use skylos::analyzer::{AnalyzerConfig, Skylos};
use skylos::report::AnalysisResult;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn analyze(root: &Path, config: AnalyzerConfig) -> AnalysisResult {
    Skylos::new(config)
        .analyze(&[root.to_path_buf()])
        .unwrap()
}

fn analyze_default(root: &Path) -> AnalysisResult {
    analyze(root, AnalyzerConfig::default())
}

#[test]
fn test_basic_unused_class_and_method() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        "class UnusedClass:\n    def method(self):\n        pass\n",
    );

    let result = analyze_default(dir.path());
    assert!(result
        .unused_classes
        .contains(&"code.UnusedClass".to_string()));
    assert!(result
        .unused_functions
        .contains(&"code.UnusedClass.method".to_string()));
    let method = result
        .dead_symbols
        .iter()
        .find(|d| d.qualified_name == "code.UnusedClass.method")
        .unwrap();
    assert!(method.confidence >= 90);
}

#[test]
fn test_entry_point_calls_are_alive() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        r#"
def used_fn():
    return 1

if __name__ == "__main__":
    used_fn()
"#,
    );

    let result = analyze_default(dir.path());
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("used_fn")));
}

#[test]
fn test_pragma_suppresses_at_any_threshold() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        "def internal():  # pragma: no skylos\n    pass\n",
    );

    let result = analyze(
        dir.path(),
        AnalyzerConfig {
            confidence_threshold: 0,
            ..Default::default()
        },
    );
    assert!(result.unused_functions.is_empty());
}

#[test]
fn test_cross_module_reexport_not_dead() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "pkg/sub.py",
        "class ExportedClass:\n    pass\n",
    );
    write_file(
        dir.path(),
        "pkg/__init__.py",
        "from pkg.sub import ExportedClass\n",
    );
    write_file(
        dir.path(),
        "use.py",
        "from pkg import ExportedClass\n\nobj = ExportedClass()\n",
    );

    let result = analyze_default(dir.path());
    assert!(!result
        .unused_classes
        .iter()
        .any(|name| name.contains("ExportedClass")));
}

#[test]
fn test_dynamic_access_discounts_below_threshold() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        r#"
import importlib

def called_via_getattr():
    return 1

mod = importlib.import_module("code")
getattr(mod, "called_via_getattr")()
"#,
    );

    let result = analyze_default(dir.path());
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("called_via_getattr")));

    // Observed at threshold 0: the candidate survives with the dynamic
    // penalty applied.
    let everything = analyze(
        dir.path(),
        AnalyzerConfig {
            confidence_threshold: 0,
            ..Default::default()
        },
    );
    let candidate = everything
        .dead_symbols
        .iter()
        .find(|d| d.qualified_name == "code.called_via_getattr")
        .unwrap();
    assert!(candidate.confidence <= 60);
}

#[test]
fn test_framework_route_not_dead() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "web.py",
        r#"
from flask import Flask

app = Flask(__name__)

@app.route("/x")
def handler():
    return "ok"
"#,
    );

    let result = analyze_default(dir.path());
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("handler")));
}

#[test]
fn test_unused_import_reported() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        "import os\nimport sys\n\nprint(sys.version)\n",
    );

    let result = analyze_default(dir.path());
    assert!(result.unused_imports.contains(&"code.os".to_string()));
    assert!(!result.unused_imports.contains(&"code.sys".to_string()));
}

#[test]
fn test_threshold_is_monotonic() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        "def plain_unused():\n    pass\n\ndef _private_unused():\n    pass\n",
    );

    let strict = analyze(
        dir.path(),
        AnalyzerConfig {
            confidence_threshold: 100,
            ..Default::default()
        },
    );
    let lax = analyze(
        dir.path(),
        AnalyzerConfig {
            confidence_threshold: 50,
            ..Default::default()
        },
    );
    assert!(strict.unused_functions.len() <= lax.unused_functions.len());
    assert!(strict
        .unused_functions
        .contains(&"code.plain_unused".to_string()));
    // 95 < 100: the private-name discount keeps it out of the strict run.
    assert!(!strict
        .unused_functions
        .contains(&"code._private_unused".to_string()));
    assert!(lax
        .unused_functions
        .contains(&"code._private_unused".to_string()));
}

#[test]
fn test_every_reported_symbol_meets_threshold() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "code.py",
        "def a():\n    pass\n\ndef _b():\n    pass\n\nclass C:\n    pass\n",
    );

    let result = analyze(
        dir.path(),
        AnalyzerConfig {
            confidence_threshold: 70,
            ..Default::default()
        },
    );
    for dead in &result.dead_symbols {
        assert!(dead.confidence >= 70);
    }
}

#[test]
fn test_output_is_deterministic() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "b.py", "def beta():\n    pass\n");
    write_file(dir.path(), "a.py", "def alpha():\n    pass\n");
    write_file(
        dir.path(),
        "c.py",
        "API_KEY = \"sk-1234567890abcdef1234567890abcdef\"\n",
    );

    let config = AnalyzerConfig {
        secrets: true,
        ..Default::default()
    };
    let first = serde_json::to_string(&analyze(dir.path(), config.clone())).unwrap();
    let second = serde_json::to_string(&analyze(dir.path(), config)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_no_dead_code_flag() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "code.py", "def unused():\n    pass\n");

    let result = analyze(
        dir.path(),
        AnalyzerConfig {
            dead_code: false,
            ..Default::default()
        },
    );
    assert!(result.unused_functions.is_empty());
    assert!(result.dead_symbols.is_empty());
}

#[test]
fn test_exclude_globs() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "keep.py", "def kept_unused():\n    pass\n");
    write_file(
        dir.path(),
        "generated/gen.py",
        "def generated_unused():\n    pass\n",
    );

    let result = analyze(
        dir.path(),
        AnalyzerConfig {
            exclude: vec!["generated".to_string()],
            ..Default::default()
        },
    );
    assert!(result
        .unused_functions
        .contains(&"keep.kept_unused".to_string()));
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("generated_unused")));
}

#[test]
fn test_default_directories_excluded() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "app.py", "def visible():\n    pass\n");
    write_file(
        dir.path(),
        "node_modules/lib/index.py",
        "def buried():\n    pass\n",
    );
    write_file(
        dir.path(),
        "__pycache__/junk.py",
        "def cached():\n    pass\n",
    );

    let result = analyze_default(dir.path());
    assert_eq!(result.analysis_summary.total_files, 1);
}

#[test]
fn test_nonexistent_root_is_fatal() {
    let skylos = Skylos::new(AnalyzerConfig::default());
    let err = skylos
        .analyze(&[Path::new("/definitely/not/here").to_path_buf()])
        .unwrap_err();
    assert!(matches!(err, skylos::error::AnalyzerError::Config { .. }));
}

#[test]
fn test_broken_file_does_not_abort_run() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "bad.py", "def broken(:\n");
    write_file(dir.path(), "good.py", "def fine_unused():\n    pass\n");

    let result = analyze_default(dir.path());
    assert_eq!(result.analysis_summary.total_files, 2);
    assert!(result
        .unused_functions
        .contains(&"good.fine_unused".to_string()));
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let result = analyze_default(dir.path());
    assert_eq!(result.analysis_summary.total_files, 0);
    assert!(result.unused_functions.is_empty());
    assert!(!result.has_findings());
}

#[test]
fn test_typescript_exports_are_roots() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "api.ts",
        "export function handler() {\n  return helper();\n}\n\nfunction helper() {\n  return 1;\n}\n\nfunction orphan() {\n  return 2;\n}\n",
    );

    let result = analyze_default(dir.path());
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("api.handler")));
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("api.helper")));
    assert!(result.unused_functions.contains(&"api.orphan".to_string()));
}

#[test]
fn test_typescript_imports_mark_targets() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "util.ts",
        "export function shared() {\n  return 1;\n}\n",
    );
    write_file(
        dir.path(),
        "app.ts",
        "import { shared } from \"./util\";\n\nexport function main() {\n  return shared();\n}\n",
    );

    let result = analyze_default(dir.path());
    assert!(!result
        .unused_functions
        .iter()
        .any(|name| name.contains("shared")));
}
