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

fn analyze(root: &Path) -> AnalysisResult {
    Skylos::new(AnalyzerConfig::default())
        .analyze(&[root.to_path_buf()])
        .unwrap()
}

fn reports_dead(result: &AnalysisResult, needle: &str) -> bool {
    result
        .dead_symbols
        .iter()
        .any(|d| d.qualified_name.contains(needle))
}

#[test]
fn test_flask_routes_survive() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "app.py",
        r#"
from flask import Flask, Blueprint

app = Flask(__name__)
bp = Blueprint("admin", __name__)

@app.route("/")
def index():
    return "home"

@bp.route("/users")
def list_users():
    return "users"
"#,
    );
    let result = analyze(dir.path());
    assert!(!reports_dead(&result, "index"));
    assert!(!reports_dead(&result, "list_users"));
}

#[test]
fn test_fastapi_and_celery_decorators_survive() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "tasks.py",
        r#"
@router.get("/items")
def read_items():
    return []

@celery.task
def send_report():
    pass
"#,
    );
    let result = analyze(dir.path());
    assert!(!reports_dead(&result, "read_items"));
    assert!(!reports_dead(&result, "send_report"));
}

#[test]
fn test_pydantic_model_survives() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "schemas.py",
        r#"
from pydantic import BaseModel

class UserSchema(BaseModel):
    name: str
"#,
    );
    let result = analyze(dir.path());
    assert!(!reports_dead(&result, "UserSchema"));
}

#[test]
fn test_plain_decorator_does_not_root() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "util.py",
        r#"
import functools

@functools.lru_cache
def cached_orphan():
    return 42
"#,
    );
    let result = analyze(dir.path());
    assert!(reports_dead(&result, "cached_orphan"));
}

#[test]
fn test_dunder_methods_survive_on_used_class() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "models.py",
        r#"
class Point:
    def __init__(self, x):
        self.x = x

    def __repr__(self):
        return str(self.x)

p = Point(1)
"#,
    );
    let result = analyze(dir.path());
    assert!(!reports_dead(&result, "__init__"));
    assert!(!reports_dead(&result, "__repr__"));
    assert!(!reports_dead(&result, "models.Point"));
}

#[test]
fn test_test_file_definitions_not_reported_as_regular_dead_code() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "test_app.py",
        r#"
def test_login():
    assert True

def setUp():
    pass
"#,
    );
    let result = analyze(dir.path());
    assert!(!reports_dead(&result, "test_login"));
    assert!(!reports_dead(&result, "setUp"));
}

#[test]
fn test_fixture_decorated_helpers_survive() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "tests/conftest.py",
        r#"
import pytest

@pytest.fixture
def db_session():
    return object()
"#,
    );
    let result = analyze(dir.path());
    assert!(!reports_dead(&result, "db_session"));
}
