use crate::symbols::{CallPair, DefKind, Definition, FileSymbols, Reference};
use crate::utils::LineIndex;
use rustpython_ast::{self as ast, Expr, Stmt};
use std::path::PathBuf;

/// Single-pass Python symbol collector.
///
/// One walk over the module body records definitions, references, call
/// pairs and the file's import map into a [`FileSymbols`]. An
/// enclosing-class stack qualifies methods as `module.Class.method`; a
/// scope stack names the caller side of each call pair.
pub struct SymbolCollector<'a> {
    out: FileSymbols,
    file: PathBuf,
    module: String,
    in_test_file: bool,
    is_init: bool,
    class_stack: Vec<String>,
    scope_stack: Vec<String>,
    line_index: &'a LineIndex,
}

impl<'a> SymbolCollector<'a> {
    pub fn new(
        file: PathBuf,
        module: String,
        in_test_file: bool,
        line_index: &'a LineIndex,
    ) -> Self {
        let is_init = file.ends_with("__init__.py");
        Self {
            out: FileSymbols {
                module: module.clone(),
                ..Default::default()
            },
            file,
            module,
            in_test_file,
            is_init,
            class_stack: Vec::new(),
            scope_stack: Vec::new(),
            line_index,
        }
    }

    /// Walks a whole module body and returns the collected symbols.
    pub fn collect(mut self, body: &[Stmt]) -> FileSymbols {
        for stmt in body {
            self.visit_stmt(stmt);
        }
        self.out
    }

    fn qualify(&self, name: &str) -> String {
        let mut parts = Vec::new();
        if !self.module.is_empty() {
            parts.push(self.module.as_str());
        }
        parts.extend(self.class_stack.iter().map(String::as_str));
        parts.push(name);
        parts.join(".")
    }

    /// Qualified name of the enclosing function, or the module for
    /// top-level code.
    fn current_caller(&self) -> String {
        self.scope_stack
            .last()
            .cloned()
            .unwrap_or_else(|| self.module.clone())
    }

    fn add_ref(&mut self, name: impl Into<String>, line: usize) {
        self.out.refs.push(Reference {
            name: name.into(),
            module: self.module.clone(),
            file: self.file.clone(),
            line,
            from_test_file: self.in_test_file,
        });
    }

    fn add_call_pair(&mut self, callee: impl Into<String>) {
        self.out.call_pairs.push(CallPair {
            caller: self.current_caller(),
            callee: callee.into(),
            from_test_file: self.in_test_file,
        });
    }

    fn new_def(&self, qualified: String, kind: DefKind, range: ast::text_size::TextRange) -> Definition {
        let mut def = Definition::new(
            qualified,
            kind,
            self.module.clone(),
            self.file.clone(),
            self.line_index.line(range.start()),
        );
        def.end_line = self.line_index.line(range.end());
        def.in_test_file = self.in_test_file;
        def
    }

    pub fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => {
                self.visit_function_def(
                    &node.name,
                    &node.args,
                    &node.body,
                    &node.decorator_list,
                    node.range,
                );
            }
            Stmt::AsyncFunctionDef(node) => {
                self.visit_function_def(
                    &node.name,
                    &node.args,
                    &node.body,
                    &node.decorator_list,
                    node.range,
                );
            }
            Stmt::ClassDef(node) => self.visit_class_def(node),
            Stmt::Import(node) => {
                for alias in &node.names {
                    let local = alias.asname.as_ref().unwrap_or(&alias.name).to_string();
                    let mut def = self.new_def(self.qualify(&local), DefKind::Import, alias.range);
                    def.import_target = Some(alias.name.to_string());
                    self.out.defs.push(def);
                    self.out
                        .import_map
                        .insert(local, alias.name.to_string());
                }
            }
            Stmt::ImportFrom(node) => self.visit_import_from(node),
            Stmt::Assign(node) => self.visit_assign(node),
            Stmt::AugAssign(node) => {
                // `__all__ += [...]` also contributes export hints.
                if let Expr::Name(target) = &*node.target {
                    if target.id.as_str() == "__all__" {
                        self.collect_export_hints(&node.value);
                    }
                }
                self.visit_expr(&node.value);
            }
            Stmt::AnnAssign(node) => {
                // Annotation-only statements (`name: str`) declare nothing
                // at runtime; only bound targets become definitions.
                if let Some(value) = &node.value {
                    if let (Expr::Name(target), true) =
                        (&*node.target, self.scope_stack.is_empty())
                    {
                        if !target.id.starts_with("__") {
                            let kind = variable_kind(target.id.as_str());
                            let def =
                                self.new_def(self.qualify(target.id.as_str()), kind, node.range);
                            self.out.defs.push(def);
                        }
                    }
                    self.visit_expr(value);
                }
            }
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::Raise(node) => {
                if let Some(exc) = &node.exc {
                    self.visit_expr(exc);
                }
                if let Some(cause) = &node.cause {
                    self.visit_expr(cause);
                }
            }
            Stmt::Assert(node) => {
                self.visit_expr(&node.test);
                if let Some(msg) = &node.msg {
                    self.visit_expr(msg);
                }
            }
            Stmt::Delete(node) => {
                for target in &node.targets {
                    self.visit_expr(target);
                }
            }
            Stmt::If(node) => {
                self.visit_expr(&node.test);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::For(node) => {
                self.visit_expr(&node.iter);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::AsyncFor(node) => {
                self.visit_expr(&node.iter);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::While(node) => {
                self.visit_expr(&node.test);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                }
                self.visit_body(&node.body);
            }
            Stmt::AsyncWith(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                }
                self.visit_body(&node.body);
            }
            Stmt::Try(node) => {
                self.visit_body(&node.body);
                self.visit_handlers(&node.handlers);
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            Stmt::TryStar(node) => {
                self.visit_body(&node.body);
                self.visit_handlers(&node.handlers);
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            Stmt::Match(node) => {
                self.visit_expr(&node.subject);
                for case in &node.cases {
                    if let Some(guard) = &case.guard {
                        self.visit_expr(guard);
                    }
                    self.visit_body(&case.body);
                }
            }
            _ => {}
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_handlers(&mut self, handlers: &[ast::ExceptHandler]) {
        for handler in handlers {
            let ast::ExceptHandler::ExceptHandler(node) = handler;
            if let Some(type_) = &node.type_ {
                self.visit_expr(type_);
            }
            self.visit_body(&node.body);
        }
    }

    fn visit_function_def(
        &mut self,
        name: &str,
        args: &ast::Arguments,
        body: &[Stmt],
        decorators: &[Expr],
        range: ast::text_size::TextRange,
    ) {
        let qualified = self.qualify(name);
        let kind = if self.class_stack.is_empty() {
            DefKind::Function
        } else {
            DefKind::Method
        };
        let mut def = self.new_def(qualified.clone(), kind, range);
        def.decorators = decorators.iter().map(decorator_name).collect();
        self.out.defs.push(def);

        // Decorator expressions are ordinary references to the decorator
        // symbol.
        for decorator in decorators {
            self.visit_expr(decorator);
        }
        for arg in args
            .posonlyargs
            .iter()
            .chain(&args.args)
            .chain(&args.kwonlyargs)
        {
            let param = arg.def.arg.as_str();
            if param == "self" || param == "cls" {
                continue;
            }
            let pdef = self.new_def(
                format!("{qualified}.{param}"),
                DefKind::Parameter,
                arg.def.range,
            );
            self.out.defs.push(pdef);
            if let Some(default) = &arg.default {
                self.visit_expr(default);
            }
        }

        self.scope_stack.push(qualified);
        self.visit_body(body);
        self.scope_stack.pop();
    }

    fn visit_class_def(&mut self, node: &ast::StmtClassDef) {
        let name = node.name.as_str();
        let line = self.line_index.line(node.range.start());
        let mut def = self.new_def(self.qualify(name), DefKind::Class, node.range);
        def.decorators = node.decorator_list.iter().map(decorator_name).collect();
        for base in &node.bases {
            match base {
                Expr::Name(base_name) => def.base_classes.push(base_name.id.to_string()),
                Expr::Attribute(attr) => def.base_classes.push(attr.attr.to_string()),
                _ => {}
            }
        }
        self.out.defs.push(def);

        for decorator in &node.decorator_list {
            self.visit_expr(decorator);
        }
        // Inheriting from a class is a use of it, both by simple and by
        // module-qualified name.
        for base in &node.bases {
            self.visit_expr(base);
            if let Expr::Name(base_name) = base {
                if !self.module.is_empty() {
                    self.add_ref(format!("{}.{}", self.module, base_name.id), line);
                }
            }
        }
        for keyword in &node.keywords {
            self.visit_expr(&keyword.value);
        }

        self.class_stack.push(name.to_string());
        self.visit_body(&node.body);
        self.class_stack.pop();
    }

    fn visit_import_from(&mut self, node: &ast::StmtImportFrom) {
        if node
            .module
            .as_ref()
            .is_some_and(|m| m.as_str() == "__future__")
        {
            // Compiler directive, not a real import.
            return;
        }
        let level = node.level.as_ref().map_or(0, |l| l.to_u32());
        let base = self.relative_base(node.module.as_ref().map(|m| m.as_str()), level);

        for alias in &node.names {
            let imported = alias.name.as_str();
            if imported == "*" {
                continue;
            }
            let local = alias
                .asname
                .as_ref()
                .map_or(imported, |a| a.as_str())
                .to_string();
            let target = if base.is_empty() {
                imported.to_string()
            } else {
                format!("{base}.{imported}")
            };

            let mut def = self.new_def(self.qualify(&local), DefKind::Import, alias.range);
            def.import_target = Some(target.clone());
            // `from .sub import X as X` is the conventional re-export
            // spelling.
            def.exported = alias.asname.as_ref().is_some_and(|a| a.as_str() == imported);
            let line = def.line;
            self.out.defs.push(def);
            self.out.import_map.insert(local, target.clone());
            // Importing a symbol marks the symbol itself live, even when
            // the importing module never touches it again (re-exports).
            self.add_ref(target, line);
        }
    }

    /// Resolves the leading dots of a `from ... import` against the current
    /// package.
    fn relative_base(&self, module: Option<&str>, level: u32) -> String {
        if level == 0 {
            return module.unwrap_or("").to_string();
        }
        let mut parts: Vec<&str> = self.module.split('.').collect();
        // One dot means the current package: for `pkg.mod` drop `mod`, for
        // the `pkg` __init__ keep `pkg`. Each extra dot climbs once more.
        let mut climb = level;
        if !self.is_init {
            parts.pop();
            climb -= 1;
        } else {
            climb -= 1;
        }
        for _ in 0..climb {
            parts.pop();
        }
        let mut base = parts.join(".");
        if let Some(module) = module {
            if base.is_empty() {
                base = module.to_string();
            } else {
                base = format!("{base}.{module}");
            }
        }
        base
    }

    fn visit_assign(&mut self, node: &ast::StmtAssign) {
        if let Some(Expr::Name(target)) = node.targets.first() {
            if target.id.as_str() == "__all__" {
                self.collect_export_hints(&node.value);
            }
        }
        // Module- and class-scope assignments introduce variables;
        // function-local ones do not.
        if self.scope_stack.is_empty() {
            for target in &node.targets {
                self.collect_assign_targets(target, node.range);
            }
        }
        self.visit_expr(&node.value);
    }

    fn collect_assign_targets(&mut self, target: &Expr, range: ast::text_size::TextRange) {
        match target {
            Expr::Name(name) => {
                let id = name.id.as_str();
                if id == "__all__" || id.starts_with("__") {
                    return;
                }
                let kind = variable_kind(id);
                let def = self.new_def(self.qualify(id), kind, range);
                self.out.defs.push(def);
            }
            Expr::Tuple(tuple) => {
                for elt in &tuple.elts {
                    self.collect_assign_targets(elt, range);
                }
            }
            _ => {}
        }
    }

    fn collect_export_hints(&mut self, value: &Expr) {
        let elts = match value {
            Expr::List(list) => &list.elts,
            Expr::Tuple(tuple) => &tuple.elts,
            _ => return,
        };
        for elt in elts {
            if let Expr::Constant(constant) = elt {
                if let ast::Constant::Str(s) = &constant.value {
                    self.out.export_hints.push(s.to_string());
                }
            }
        }
    }

    pub fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(node) => {
                if node.ctx.is_load() {
                    let line = self.line_index.line(node.range.start());
                    self.add_ref(node.id.to_string(), line);
                }
            }
            Expr::Call(node) => self.visit_call(node),
            Expr::Attribute(node) => self.visit_attribute(node),
            Expr::Constant(node) => {
                // Identifier-shaped string literals hint at dynamic access
                // (`getattr(mod, "name")`, registry tables). They lower
                // dead-confidence but never mark a symbol used.
                if let ast::Constant::Str(s) = &node.value {
                    if is_identifier_like(s) {
                        self.out.dynamic_refs.insert(s.to_string());
                    }
                }
            }
            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::BinOp(node) => {
                self.visit_expr(&node.left);
                self.visit_expr(&node.right);
            }
            Expr::UnaryOp(node) => self.visit_expr(&node.operand),
            Expr::Lambda(node) => self.visit_expr(&node.body),
            Expr::IfExp(node) => {
                self.visit_expr(&node.test);
                self.visit_expr(&node.body);
                self.visit_expr(&node.orelse);
            }
            Expr::Dict(node) => {
                for (key, value) in node.keys.iter().zip(&node.values) {
                    if let Some(key) = key {
                        self.visit_expr(key);
                    }
                    self.visit_expr(value);
                }
            }
            Expr::Set(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::ListComp(node) => {
                self.visit_expr(&node.elt);
                self.visit_generators(&node.generators);
            }
            Expr::SetComp(node) => {
                self.visit_expr(&node.elt);
                self.visit_generators(&node.generators);
            }
            Expr::DictComp(node) => {
                self.visit_expr(&node.key);
                self.visit_expr(&node.value);
                self.visit_generators(&node.generators);
            }
            Expr::GeneratorExp(node) => {
                self.visit_expr(&node.elt);
                self.visit_generators(&node.generators);
            }
            Expr::Await(node) => self.visit_expr(&node.value),
            Expr::Yield(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Expr::YieldFrom(node) => self.visit_expr(&node.value),
            Expr::Compare(node) => {
                self.visit_expr(&node.left);
                for comparator in &node.comparators {
                    self.visit_expr(comparator);
                }
            }
            Expr::Subscript(node) => {
                self.visit_expr(&node.value);
                self.visit_expr(&node.slice);
            }
            Expr::Starred(node) => self.visit_expr(&node.value),
            Expr::FormattedValue(node) => self.visit_expr(&node.value),
            Expr::JoinedStr(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::List(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Tuple(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Slice(node) => {
                for part in [&node.lower, &node.upper, &node.step].into_iter().flatten() {
                    self.visit_expr(part);
                }
            }
            _ => {}
        }
    }

    fn visit_generators(&mut self, generators: &[ast::Comprehension]) {
        for gen in generators {
            self.visit_expr(&gen.iter);
            for if_expr in &gen.ifs {
                self.visit_expr(if_expr);
            }
        }
    }

    fn visit_call(&mut self, node: &ast::ExprCall) {
        if let Some(callee) = self.call_name(&node.func) {
            self.add_call_pair(callee);
        }
        // `getattr(obj, "name")` / `hasattr` second argument is a dynamic
        // access to `name`.
        if let Expr::Name(func) = &*node.func {
            if matches!(func.id.as_str(), "getattr" | "hasattr" | "setattr" | "delattr") {
                if let Some(Expr::Constant(constant)) = node.args.get(1) {
                    if let ast::Constant::Str(s) = &constant.value {
                        if is_identifier_like(s) {
                            self.out.dynamic_refs.insert(s.to_string());
                        }
                    }
                }
            }
        }
        self.visit_expr(&node.func);
        for arg in &node.args {
            self.visit_expr(arg);
        }
        for keyword in &node.keywords {
            self.visit_expr(&keyword.value);
        }
    }

    /// Callee name for a call pair: dotted where the base is a plain name,
    /// class-qualified for `self.`/`cls.` calls.
    fn call_name(&self, func: &Expr) -> Option<String> {
        match func {
            Expr::Name(node) => Some(node.id.to_string()),
            Expr::Attribute(node) => {
                if let Expr::Name(base) = &*node.value {
                    let base_id = base.id.as_str();
                    if (base_id == "self" || base_id == "cls") && !self.class_stack.is_empty() {
                        let mut parts = Vec::new();
                        if !self.module.is_empty() {
                            parts.push(self.module.as_str());
                        }
                        parts.extend(self.class_stack.iter().map(String::as_str));
                        parts.push(node.attr.as_str());
                        return Some(parts.join("."));
                    }
                    return Some(format!("{}.{}", base_id, node.attr));
                }
                Some(node.attr.to_string())
            }
            _ => None,
        }
    }

    fn visit_attribute(&mut self, node: &ast::ExprAttribute) {
        let line = self.line_index.line(node.range.start());
        if let Expr::Name(base) = &*node.value {
            let base_id = base.id.as_str();
            if (base_id == "self" || base_id == "cls") && !self.class_stack.is_empty() {
                // Restrict to the enclosing class: module.Class.attr.
                let mut parts = Vec::new();
                if !self.module.is_empty() {
                    parts.push(self.module.clone());
                }
                parts.extend(self.class_stack.clone());
                parts.push(node.attr.to_string());
                self.add_ref(parts.join("."), line);
            } else {
                // The base name itself (keeps imports live), the dotted
                // pair, and the bare attribute for untyped receivers.
                self.add_ref(base_id.to_string(), line);
                self.add_ref(format!("{}.{}", base_id, node.attr), line);
                self.add_ref(node.attr.to_string(), line);
                // When the base is an imported alias, also reference the
                // target module's symbol directly.
                let rewritten = self
                    .out
                    .import_map
                    .get(base_id)
                    .map(|target| format!("{}.{}", target, node.attr));
                if let Some(rewritten) = rewritten {
                    self.add_ref(rewritten, line);
                }
            }
        }
        self.visit_expr(&node.value);
    }
}

/// UPPER_SNAKE module-level names are constants, everything else a variable.
fn variable_kind(name: &str) -> DefKind {
    let has_alpha = name.chars().any(|c| c.is_ascii_alphabetic());
    if has_alpha
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        DefKind::Constant
    } else {
        DefKind::Variable
    }
}

/// Simple dotted name of a decorator expression: `@app.route("/x")` ->
/// `app.route`.
pub fn decorator_name(decorator: &Expr) -> String {
    match decorator {
        Expr::Name(node) => node.id.to_string(),
        Expr::Attribute(node) => {
            if let Expr::Name(base) = &*node.value {
                format!("{}.{}", base.id, node.attr)
            } else {
                node.attr.to_string()
            }
        }
        Expr::Call(node) => decorator_name(&node.func),
        _ => String::new(),
    }
}

fn is_identifier_like(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
