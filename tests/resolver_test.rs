use rustpython_parser::{parse, Mode};
use skylos::resolver::{Resolution, Resolver};
use skylos::symbols::{DefKind, Definition, FileSymbols, SymbolTable};
use skylos::utils::LineIndex;
use skylos::visitor::SymbolCollector;
use std::path::PathBuf;

/// Builds the merged table from (path, module, source) triples, marking
/// files under test paths the way the loader would.
fn build_table(files: &[(&str, &str, &str)]) -> SymbolTable {
    let mut collected = Vec::new();
    for (path, module, code) in files {
        let tree = parse(code, Mode::Module, path).expect("parse");
        let line_index = LineIndex::new(code);
        let is_test = skylos::loader::is_test_file(&PathBuf::from(path));
        let collector = SymbolCollector::new(
            PathBuf::from(*path),
            module.to_string(),
            is_test,
            &line_index,
        );
        if let rustpython_ast::Mod::Module(module) = tree {
            collected.push(collector.collect(&module.body));
        }
    }
    SymbolTable::build(collected)
}

fn resolve(table: &SymbolTable) -> Resolution {
    Resolver::new(table, false).resolve()
}

fn is_used(table: &SymbolTable, resolution: &Resolution, qualified: &str) -> bool {
    table
        .lookup_qualified(qualified)
        .iter()
        .any(|id| resolution.used.contains(id))
}

#[test]
fn test_cross_module_function_use() {
    let table = build_table(&[
        ("lib.py", "lib", "def fn():\n    pass\n"),
        ("main.py", "main", "from lib import fn\nfn()\n"),
    ]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "lib.fn"));
}

#[test]
fn test_unreferenced_symbol_stays_dead() {
    let table = build_table(&[("lib.py", "lib", "def orphan():\n    pass\n")]);
    let resolution = resolve(&table);
    assert!(!is_used(&table, &resolution, "lib.orphan"));
}

#[test]
fn test_ambiguous_reference_marks_all_candidates() {
    let table = build_table(&[
        ("a.py", "a", "def process():\n    pass\n"),
        ("b.py", "b", "def process():\n    pass\n"),
        ("c.py", "c", "def run(handler):\n    handler.process()\n"),
    ]);
    let resolution = resolve(&table);
    // Neither candidate can be told apart, so both stay alive.
    assert!(is_used(&table, &resolution, "a.process"));
    assert!(is_used(&table, &resolution, "b.process"));
}

#[test]
fn test_same_module_candidate_preferred() {
    let table = build_table(&[
        ("a.py", "a", "def helper():\n    pass\n\nhelper()\n"),
        ("b.py", "b", "def helper():\n    pass\n"),
    ]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "a.helper"));
    assert!(!is_used(&table, &resolution, "b.helper"));
}

#[test]
fn test_reexport_chain_keeps_symbol_alive() {
    let table = build_table(&[
        (
            "pkg/sub.py",
            "pkg.sub",
            "class ExportedClass:\n    def __init__(self):\n        pass\n",
        ),
        (
            "pkg/__init__.py",
            "pkg",
            "from pkg.sub import ExportedClass\n",
        ),
        (
            "use.py",
            "use",
            "from pkg import ExportedClass\n\nobj = ExportedClass()\n",
        ),
    ]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "pkg.sub.ExportedClass"));
    assert!(is_used(&table, &resolution, "pkg.ExportedClass"));
    assert!(is_used(&table, &resolution, "use.ExportedClass"));
}

#[test]
fn test_import_alone_marks_target_alive() {
    let table = build_table(&[
        ("lib.py", "lib", "def fn():\n    pass\n"),
        ("main.py", "main", "from lib import fn\n"),
    ]);
    let resolution = resolve(&table);
    // The import definition itself has no further references, but the
    // imported symbol is alive.
    assert!(is_used(&table, &resolution, "lib.fn"));
    assert!(!is_used(&table, &resolution, "main.fn"));
}

#[test]
fn test_inherited_method_found_through_base() {
    let table = build_table(&[(
        "svc.py",
        "svc",
        r#"
class Base:
    def helper(self):
        pass

class Child(Base):
    def run(self):
        self.helper()
"#,
    )]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "svc.Base.helper"));
}

#[test]
fn test_exported_names_are_roots() {
    let table = build_table(&[(
        "api.py",
        "api",
        "__all__ = [\"entry\"]\n\ndef entry():\n    pass\n\ndef hidden():\n    pass\n",
    )]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "api.entry"));
    assert!(!is_used(&table, &resolution, "api.hidden"));
}

#[test]
fn test_dunder_methods_are_roots() {
    let table = build_table(&[(
        "m.py",
        "m",
        "class C:\n    def __len__(self):\n        return 0\n",
    )]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "m.C.__len__"));
}

#[test]
fn test_dispatch_decorator_is_root() {
    let table = build_table(&[(
        "web.py",
        "web",
        "@app.route(\"/x\")\ndef handler():\n    pass\n",
    )]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "web.handler"));
    assert!(resolution
        .roots
        .iter()
        .any(|&id| table.defs[id].qualified_name == "web.handler"));
}

#[test]
fn test_test_references_gated_by_default() {
    let files = [
        ("lib.py", "lib", "def util():\n    pass\n"),
        (
            "test_lib.py",
            "test_lib",
            "from lib import util\n\ndef test_util():\n    assert util() is None\n",
        ),
    ];
    let table = build_table(&files);

    let default_run = Resolver::new(&table, false).resolve();
    assert!(!is_used(&table, &default_run, "lib.util"));

    let with_tests = Resolver::new(&table, true).resolve();
    assert!(is_used(&table, &with_tests, "lib.util"));
}

#[test]
fn test_test_functions_root_themselves() {
    let table = build_table(&[(
        "test_lib.py",
        "test_lib",
        "def test_something():\n    pass\n",
    )]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "test_lib.test_something"));
}

#[test]
fn test_go_interface_methods_are_roots() {
    let mut file = FileSymbols {
        module: "store".to_string(),
        ..Default::default()
    };
    let mut def = Definition::new(
        "store.Store.Close".to_string(),
        DefKind::Method,
        "store".to_string(),
        PathBuf::from("store/db.go"),
        10,
    );
    def.from_engine = true;
    file.defs.push(def);
    let table = SymbolTable::build(vec![file]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "store.Store.Close"));
}

#[test]
fn test_go_main_is_root() {
    let mut file = FileSymbols {
        module: "main".to_string(),
        ..Default::default()
    };
    let mut def = Definition::new(
        "main.main".to_string(),
        DefKind::Function,
        "main".to_string(),
        PathBuf::from("main.go"),
        5,
    );
    def.from_engine = true;
    file.defs.push(def);
    let table = SymbolTable::build(vec![file]);
    let resolution = resolve(&table);
    assert!(is_used(&table, &resolution, "main.main"));
}
