use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Index of a [`Definition`] inside the global [`SymbolTable`].
///
/// The table is an arena: cross references between symbols (method to class,
/// reference to definition) are `DefId` lookups, never owning pointers, so
/// cyclic module graphs cost nothing.
pub type DefId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    Function,
    Method,
    Class,
    Variable,
    Constant,
    Import,
    Parameter,
}

impl DefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefKind::Function => "function",
            DefKind::Method => "method",
            DefKind::Class => "class",
            DefKind::Variable => "variable",
            DefKind::Constant => "constant",
            DefKind::Import => "import",
            DefKind::Parameter => "parameter",
        }
    }
}

/// A declaration that introduces a named entity.
#[derive(Debug, Clone)]
pub struct Definition {
    /// `module.[Class.]name`. Unique per (file, line); the same simple name
    /// may occur in many files.
    pub qualified_name: String,
    pub simple_name: String,
    pub kind: DefKind,
    /// Dotted module the definition belongs to.
    pub module: String,
    pub file: PathBuf,
    pub line: usize,
    pub end_line: usize,
    /// Listed in `__all__`, re-exported `as`-alias, TS/JS `export`, or a
    /// Go-exported identifier. Exported definitions join the root set.
    pub exported: bool,
    /// Decorator names applied to the definition, simple form.
    pub decorators: Vec<String>,
    /// Base class names for class definitions.
    pub base_classes: Vec<String>,
    /// For `kind == Import`: the fully resolved target the alias points at.
    /// The resolver chases these through re-export chains.
    pub import_target: Option<String>,
    /// Method receiver type, reported by the Go engine.
    pub receiver: Option<String>,
    /// Defined in a file the loader classified as test code.
    pub in_test_file: bool,
    /// Produced by an external engine rather than an in-process parser.
    pub from_engine: bool,
    /// 0-100 estimate that the definition is dead, filled by the confidence
    /// engine after resolution.
    pub confidence: u8,
}

impl Definition {
    pub fn new(
        qualified_name: String,
        kind: DefKind,
        module: String,
        file: PathBuf,
        line: usize,
    ) -> Self {
        let simple_name = qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&qualified_name)
            .to_string();
        Self {
            qualified_name,
            simple_name,
            kind,
            module,
            file,
            line,
            end_line: line,
            exported: false,
            decorators: Vec::new(),
            base_classes: Vec::new(),
            import_target: None,
            receiver: None,
            in_test_file: false,
            from_engine: false,
            confidence: 100,
        }
    }

    /// `__init__`-style magic method name.
    pub fn is_dunder(&self) -> bool {
        self.simple_name.starts_with("__") && self.simple_name.ends_with("__")
    }

    /// Qualified name of the enclosing class for methods.
    pub fn class_qualified(&self) -> Option<&str> {
        if self.kind != DefKind::Method {
            return None;
        }
        self.qualified_name.rsplit_once('.').map(|(prefix, _)| prefix)
    }
}

/// A textual use of a name at a source location. `name` may be simple or
/// dotted; the resolver normalizes.
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    /// Module the reference occurred in, for same-module lookup.
    pub module: String,
    pub file: PathBuf,
    pub line: usize,
    pub from_test_file: bool,
}

/// Caller-to-callee edge recorded at a call site. `caller` is the enclosing
/// function's qualified name, or the module name for top-level calls.
#[derive(Debug, Clone)]
pub struct CallPair {
    pub caller: String,
    pub callee: String,
    /// Call site lives in a test file.
    pub from_test_file: bool,
}

/// Everything one file contributes to the global table. Built by exactly one
/// worker during the parallel phase, then merged after the join.
#[derive(Debug, Default)]
pub struct FileSymbols {
    pub module: String,
    pub defs: Vec<Definition>,
    pub refs: Vec<Reference>,
    pub call_pairs: Vec<CallPair>,
    /// Local alias -> `target_module[.symbol]`.
    pub import_map: HashMap<String, String>,
    /// Identifier-shaped string literals: `getattr`/`globals` style access.
    /// These lower dead-confidence but never mark a symbol used.
    pub dynamic_refs: HashSet<String>,
    /// Names listed in `__all__`.
    pub export_hints: Vec<String>,
}

/// The merged, append-then-freeze symbol table. Mutated only while merging
/// per-file results; the resolver treats it as immutable.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub defs: Vec<Definition>,
    pub refs: Vec<Reference>,
    pub call_pairs: Vec<CallPair>,
    /// module -> (alias -> target).
    pub import_maps: HashMap<String, HashMap<String, String>>,
    pub dynamic_names: HashSet<String>,
    by_qualified: HashMap<String, Vec<DefId>>,
    by_simple: HashMap<String, Vec<DefId>>,
}

impl SymbolTable {
    pub fn build(files: Vec<FileSymbols>) -> Self {
        let mut table = SymbolTable::default();
        for file in files {
            let export_hints: HashSet<&str> =
                file.export_hints.iter().map(String::as_str).collect();
            for mut def in file.defs {
                if export_hints.contains(def.simple_name.as_str()) {
                    def.exported = true;
                }
                table.push_def(def);
            }
            table.refs.extend(file.refs);
            table.call_pairs.extend(file.call_pairs);
            if !file.import_map.is_empty() {
                table
                    .import_maps
                    .entry(file.module)
                    .or_default()
                    .extend(file.import_map);
            }
            table.dynamic_names.extend(file.dynamic_refs);
        }
        table
    }

    fn push_def(&mut self, def: Definition) {
        let id = self.defs.len();
        self.by_qualified
            .entry(def.qualified_name.clone())
            .or_default()
            .push(id);
        self.by_simple
            .entry(def.simple_name.clone())
            .or_default()
            .push(id);
        self.defs.push(def);
    }

    pub fn lookup_qualified(&self, name: &str) -> &[DefId] {
        self.by_qualified.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn lookup_simple(&self, name: &str) -> &[DefId] {
        self.by_simple.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn import_map(&self, module: &str) -> Option<&HashMap<String, String>> {
        self.import_maps.get(module)
    }

    /// Simple callee names seen anywhere in a call pair, for confidence
    /// scoring.
    pub fn callee_names(&self) -> HashSet<String> {
        self.call_pairs
            .iter()
            .map(|cp| {
                cp.callee
                    .rsplit('.')
                    .next()
                    .unwrap_or(&cp.callee)
                    .to_string()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(qualified: &str, kind: DefKind) -> Definition {
        Definition::new(
            qualified.to_string(),
            kind,
            qualified.rsplit_once('.').map_or("", |(m, _)| m).to_string(),
            PathBuf::from("test.py"),
            1,
        )
    }

    #[test]
    fn test_export_hints_mark_exported() {
        let files = vec![FileSymbols {
            module: "m".to_string(),
            defs: vec![def("m.public", DefKind::Function), def("m.hidden", DefKind::Function)],
            export_hints: vec!["public".to_string()],
            ..Default::default()
        }];
        let table = SymbolTable::build(files);

        let public = &table.defs[table.lookup_qualified("m.public")[0]];
        let hidden = &table.defs[table.lookup_qualified("m.hidden")[0]];
        assert!(public.exported);
        assert!(!hidden.exported);
    }

    #[test]
    fn test_simple_name_collisions_share_bucket() {
        let files = vec![FileSymbols {
            module: "a".to_string(),
            defs: vec![def("a.run", DefKind::Function), def("a.Cls.run", DefKind::Method)],
            ..Default::default()
        }];
        let table = SymbolTable::build(files);
        assert_eq!(table.lookup_simple("run").len(), 2);
    }

    #[test]
    fn test_class_qualified_for_methods() {
        let method = def("pkg.mod.Cls.handle", DefKind::Method);
        assert_eq!(method.class_qualified(), Some("pkg.mod.Cls"));
        let func = def("pkg.mod.handle", DefKind::Function);
        assert_eq!(func.class_qualified(), None);
    }
}
