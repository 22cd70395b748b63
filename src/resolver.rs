use crate::framework;
use crate::symbols::{DefId, DefKind, SymbolTable};
use crate::test_aware;
use std::collections::HashSet;

/// Output of cross-file resolution: which definitions are live, and which
/// of those are roots (live without needing an incoming reference).
pub struct Resolution {
    pub used: HashSet<DefId>,
    pub roots: HashSet<DefId>,
}

/// Matches references and call pairs against the frozen symbol table.
///
/// Resolution never fails: a name that matches several candidates marks all
/// of them live (a deliberate false-negative safeguard), and a name that
/// matches nothing is ignored.
pub struct Resolver<'a> {
    table: &'a SymbolTable,
    /// When false, references originating in test files do not mark
    /// non-test definitions live.
    include_tests: bool,
    used: HashSet<DefId>,
}

impl<'a> Resolver<'a> {
    pub fn new(table: &'a SymbolTable, include_tests: bool) -> Self {
        Self {
            table,
            include_tests,
            used: HashSet::new(),
        }
    }

    pub fn resolve(mut self) -> Resolution {
        let table = self.table;
        let roots = self.collect_roots();
        for &id in &roots {
            self.mark(id, false);
        }

        for reference in &table.refs {
            self.resolve_name(
                &reference.name,
                &reference.module,
                reference.from_test_file,
                0,
            );
        }

        // Invariant: a name that appears as a call-pair callee is never
        // reported dead, wherever the caller sits in the graph.
        for pair in &table.call_pairs {
            let module = self.caller_module(&pair.caller);
            self.resolve_name(&pair.callee, &module, pair.from_test_file, 0);
        }

        Resolution {
            used: self.used,
            roots,
        }
    }

    /// The root set: exported names, framework-dispatched handlers,
    /// auto-called dunders, Go interface methods, and test collectors.
    fn collect_roots(&self) -> HashSet<DefId> {
        let mut roots = HashSet::new();
        for (id, def) in self.table.defs.iter().enumerate() {
            let rooted = def.exported
                || def.decorators.iter().any(|d| framework::is_dispatch_decorator(d))
                || (def.kind == DefKind::Class && framework::has_framework_base(&def.base_classes))
                || (def.kind == DefKind::Method
                    && framework::is_auto_called_dunder(&def.simple_name))
                || (def.kind == DefKind::Method
                    && def.from_engine
                    && framework::is_go_interface_method(&def.simple_name))
                || (def.from_engine && matches!(def.simple_name.as_str(), "main" | "init"))
                || test_aware::is_test_root(def);
            if rooted {
                roots.insert(id);
            }
        }
        roots
    }

    fn mark(&mut self, id: DefId, from_test: bool) {
        if from_test && !self.include_tests && !self.table.defs[id].in_test_file {
            return;
        }
        if !self.used.insert(id) {
            return;
        }
        // Imports chase their target so re-exported symbols stay live:
        // marking `pkg.Y` (an import of `pkg.sub.Y`) marks `pkg.sub.Y` too.
        // The `used` set terminates cyclic chains.
        if let Some(target) = self.table.defs[id].import_target.clone() {
            let module = self.table.defs[id].module.clone();
            self.resolve_name(&target, &module, from_test, 0);
        }
    }

    /// Resolution order per reference: exact qualified match, same-module
    /// match, import-alias rewrite, class-hierarchy attribute, then the
    /// ambiguous simple-name fallback.
    fn resolve_name(&mut self, name: &str, module: &str, from_test: bool, depth: usize) {
        if depth > 8 {
            return;
        }

        let exact: Vec<DefId> = self.table.lookup_qualified(name).to_vec();
        if !exact.is_empty() {
            for id in exact {
                self.mark(id, from_test);
            }
            return;
        }

        if !name.contains('.') {
            if !module.is_empty() {
                let in_module: Vec<DefId> = self
                    .table
                    .lookup_qualified(&format!("{module}.{name}"))
                    .to_vec();
                if !in_module.is_empty() {
                    for id in in_module {
                        self.mark(id, from_test);
                    }
                    return;
                }
            }
            self.resolve_ambiguous(name, module, from_test);
            return;
        }

        // Dotted: rewrite a leading import alias and retry.
        let (head, rest) = name.split_once('.').unwrap();
        if let Some(target) = self
            .table
            .import_map(module)
            .and_then(|map| map.get(head))
            .cloned()
        {
            // The alias itself is an import definition; using it uses the
            // import.
            for id in self.table.lookup_qualified(&format!("{module}.{head}")).to_vec() {
                self.mark(id, from_test);
            }
            let rewritten = format!("{target}.{rest}");
            if rewritten != name {
                self.resolve_name(&rewritten, module, from_test, depth + 1);
            }
            return;
        }

        // `module.Class.attr` that missed exactly: walk the class
        // hierarchy for an inherited method.
        if let Some((class_name, attr)) = name.rsplit_once('.') {
            let class_ids: Vec<DefId> = self
                .table
                .lookup_qualified(class_name)
                .iter()
                .copied()
                .filter(|&id| self.table.defs[id].kind == DefKind::Class)
                .collect();
            if !class_ids.is_empty() {
                let mut visited = HashSet::new();
                for class_id in class_ids {
                    self.resolve_class_attr(class_id, attr, from_test, &mut visited);
                }
            }
        }
    }

    /// Simple name with no module-local match: every candidate is
    /// conservatively live, preferring same-module candidates when any
    /// exist.
    fn resolve_ambiguous(&mut self, name: &str, module: &str, from_test: bool) {
        let candidates: Vec<DefId> = self.table.lookup_simple(name).to_vec();
        if candidates.is_empty() {
            return;
        }
        let same_module: Vec<DefId> = candidates
            .iter()
            .copied()
            .filter(|&id| self.table.defs[id].module == module)
            .collect();
        let chosen = if same_module.is_empty() {
            candidates
        } else {
            same_module
        };
        for id in chosen {
            self.mark(id, from_test);
        }
    }

    /// Looks up `attr` on a class, then on its base classes transitively.
    fn resolve_class_attr(
        &mut self,
        class_id: DefId,
        attr: &str,
        from_test: bool,
        visited: &mut HashSet<DefId>,
    ) {
        if !visited.insert(class_id) {
            return;
        }
        let class_qualified = self.table.defs[class_id].qualified_name.clone();
        let own: Vec<DefId> = self
            .table
            .lookup_qualified(&format!("{class_qualified}.{attr}"))
            .to_vec();
        if !own.is_empty() {
            for id in own {
                self.mark(id, from_test);
            }
            return;
        }
        let module = self.table.defs[class_id].module.clone();
        let bases = self.table.defs[class_id].base_classes.clone();
        for base in bases {
            for base_id in self.class_ids_for(&base, &module) {
                self.resolve_class_attr(base_id, attr, from_test, visited);
            }
        }
    }

    /// Class definitions a base-class name could refer to from `module`.
    fn class_ids_for(&self, name: &str, module: &str) -> Vec<DefId> {
        let mut ids: Vec<DefId> = self
            .table
            .lookup_qualified(&format!("{module}.{name}"))
            .iter()
            .copied()
            .filter(|&id| self.table.defs[id].kind == DefKind::Class)
            .collect();
        if ids.is_empty() {
            if let Some(target) = self
                .table
                .import_map(module)
                .and_then(|map| map.get(name))
            {
                ids = self
                    .table
                    .lookup_qualified(target)
                    .iter()
                    .copied()
                    .filter(|&id| self.table.defs[id].kind == DefKind::Class)
                    .collect();
            }
        }
        if ids.is_empty() {
            ids = self
                .table
                .lookup_simple(name)
                .iter()
                .copied()
                .filter(|&id| self.table.defs[id].kind == DefKind::Class)
                .collect();
        }
        ids
    }

    /// Module a call-pair caller belongs to. The caller is either a known
    /// definition or the module pseudo-scope itself.
    fn caller_module(&self, caller: &str) -> String {
        if let Some(&id) = self.table.lookup_qualified(caller).first() {
            return self.table.defs[id].module.clone();
        }
        caller.to_string()
    }
}
