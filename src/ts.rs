use crate::error::AnalyzerError;
use crate::loader::{Language, SourceFile};
use crate::symbols::{CallPair, DefKind, Definition, FileSymbols, Reference};
use swc_common::{FileName, SourceMap, Span};
use swc_ecma_ast::{
    CallExpr, Callee, ClassDecl, ClassMethod, ExportDecl, Expr, FnDecl, ImportDecl,
    ImportSpecifier, JSXElementName, JSXOpeningElement, MemberExpr, MemberProp, ModuleExportName,
    NamedExport, NewExpr, Pat, PropName, VarDecl, VarDeclKind,
};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};

/// Parses a TS/JS file and collects its symbols into the shared
/// [`FileSymbols`] shape the resolver consumes.
///
/// The collector mirrors the Python one: declarations become definitions,
/// `export` populates the root set, imports feed the alias map, and call or
/// member expressions become references and call pairs.
pub fn collect_ts(file: &SourceFile) -> Result<FileSymbols, AnalyzerError> {
    let source_map = SourceMap::default();
    let source_file = source_map.new_source_file(
        FileName::Real(file.path.clone()).into(),
        file.source.clone(),
    );
    let syntax = match file.language {
        Language::TypeScript => Syntax::Typescript(TsSyntax {
            tsx: true,
            ..Default::default()
        }),
        _ => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
    };
    let lexer = Lexer::new(
        syntax,
        Default::default(),
        StringInput::from(&*source_file),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module().map_err(|e| AnalyzerError::Parse {
        file: file.path.clone(),
        message: format!("{e:?}"),
    })?;

    let mut collector = TsCollector {
        out: FileSymbols {
            module: file.module_name.clone(),
            ..Default::default()
        },
        source_map: &source_map,
        file,
        class_stack: Vec::new(),
        scope_stack: Vec::new(),
        exporting: false,
    };
    module.visit_with(&mut collector);
    Ok(collector.out)
}

struct TsCollector<'a> {
    out: FileSymbols,
    source_map: &'a SourceMap,
    file: &'a SourceFile,
    class_stack: Vec<String>,
    scope_stack: Vec<String>,
    /// Inside an `export` declaration.
    exporting: bool,
}

impl TsCollector<'_> {
    fn line_of(&self, span: Span) -> usize {
        self.source_map.lookup_char_pos(span.lo).line
    }

    fn qualify(&self, name: &str) -> String {
        let mut parts = Vec::new();
        if !self.file.module_name.is_empty() {
            parts.push(self.file.module_name.as_str());
        }
        parts.extend(self.class_stack.iter().map(String::as_str));
        parts.push(name);
        parts.join(".")
    }

    fn current_caller(&self) -> String {
        self.scope_stack
            .last()
            .cloned()
            .unwrap_or_else(|| self.file.module_name.clone())
    }

    fn add_def(&mut self, name: &str, kind: DefKind, span: Span) -> usize {
        let mut def = Definition::new(
            self.qualify(name),
            kind,
            self.file.module_name.clone(),
            self.file.path.clone(),
            self.line_of(span),
        );
        def.exported = self.exporting;
        def.in_test_file = self.file.is_test;
        self.out.defs.push(def);
        self.out.defs.len() - 1
    }

    fn add_ref(&mut self, name: impl Into<String>, span: Span) {
        self.out.refs.push(Reference {
            name: name.into(),
            module: self.file.module_name.clone(),
            file: self.file.path.clone(),
            line: self.line_of(span),
            from_test_file: self.file.is_test,
        });
    }

    fn add_call_pair(&mut self, callee: impl Into<String>) {
        self.out.call_pairs.push(CallPair {
            caller: self.current_caller(),
            callee: callee.into(),
            from_test_file: self.file.is_test,
        });
    }

    /// Dotted module path of a relative import specifier:
    /// `./utils` from `app.routes.index` -> `app.routes.utils`.
    fn import_module(&self, src: &str) -> String {
        if !src.starts_with('.') {
            return src.replace('/', ".");
        }
        let mut parts: Vec<&str> = self.file.module_name.split('.').collect();
        parts.pop();
        for segment in src.split('/') {
            match segment {
                "." | "" => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        parts.join(".")
    }
}

impl Visit for TsCollector<'_> {
    fn visit_export_decl(&mut self, node: &ExportDecl) {
        let previous = self.exporting;
        self.exporting = true;
        node.visit_children_with(self);
        self.exporting = previous;
    }

    fn visit_named_export(&mut self, node: &NamedExport) {
        // `export { a, b }` and the re-export form `export { a } from "./m"`.
        for specifier in &node.specifiers {
            if let swc_ecma_ast::ExportSpecifier::Named(named) = specifier {
                let ModuleExportName::Ident(ident) = &named.orig else {
                    continue;
                };
                let name = ident.sym.to_string();
                self.out.export_hints.push(name.clone());
                if let Some(src) = &node.src {
                    let target = format!("{}.{}", self.import_module(src.value.to_atom_lossy().as_str()), name);
                    self.add_ref(target, node.span);
                } else {
                    self.add_ref(name, node.span);
                }
            }
        }
        node.visit_children_with(self);
    }

    fn visit_fn_decl(&mut self, node: &FnDecl) {
        let name = node.ident.sym.to_string();
        self.add_def(&name, DefKind::Function, node.ident.span);
        let qualified = self.qualify(&name);
        self.scope_stack.push(qualified);
        node.function.visit_children_with(self);
        self.scope_stack.pop();
    }

    fn visit_class_decl(&mut self, node: &ClassDecl) {
        let name = node.ident.sym.to_string();
        let id = self.add_def(&name, DefKind::Class, node.ident.span);
        if let Some(super_class) = &node.class.super_class {
            if let Expr::Ident(base) = &**super_class {
                self.out.defs[id].base_classes.push(base.sym.to_string());
            }
        }
        self.class_stack.push(name);
        node.class.visit_children_with(self);
        self.class_stack.pop();
    }

    fn visit_class_method(&mut self, node: &ClassMethod) {
        if let PropName::Ident(key) = &node.key {
            let name = key.sym.to_string();
            self.add_def(&name, DefKind::Method, key.span);
            let qualified = self.qualify(&name);
            self.scope_stack.push(qualified);
            node.function.visit_children_with(self);
            self.scope_stack.pop();
        } else {
            node.visit_children_with(self);
        }
    }

    fn visit_var_decl(&mut self, node: &VarDecl) {
        // Only module- and class-scope bindings become definitions.
        if self.scope_stack.is_empty() {
            let kind = if node.kind == VarDeclKind::Const {
                DefKind::Constant
            } else {
                DefKind::Variable
            };
            for declarator in &node.decls {
                if let Pat::Ident(binding) = &declarator.name {
                    self.add_def(&binding.id.sym, kind, binding.id.span);
                }
            }
        }
        node.visit_children_with(self);
    }

    fn visit_import_decl(&mut self, node: &ImportDecl) {
        let source_module = self.import_module(node.src.value.to_atom_lossy().as_str());
        for specifier in &node.specifiers {
            let (local, target) = match specifier {
                ImportSpecifier::Named(named) => {
                    let imported = match &named.imported {
                        Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
                        _ => named.local.sym.to_string(),
                    };
                    (
                        named.local.sym.to_string(),
                        format!("{source_module}.{imported}"),
                    )
                }
                ImportSpecifier::Default(default) => (
                    default.local.sym.to_string(),
                    format!("{source_module}.default"),
                ),
                ImportSpecifier::Namespace(ns) => {
                    (ns.local.sym.to_string(), source_module.clone())
                }
            };
            let mut def = Definition::new(
                self.qualify(&local),
                DefKind::Import,
                self.file.module_name.clone(),
                self.file.path.clone(),
                self.line_of(node.span),
            );
            def.import_target = Some(target.clone());
            def.in_test_file = self.file.is_test;
            self.out.defs.push(def);
            self.out.import_map.insert(local, target.clone());
            self.add_ref(target, node.span);
        }
    }

    fn visit_call_expr(&mut self, node: &CallExpr) {
        if let Callee::Expr(callee) = &node.callee {
            if let Some(name) = callee_name(callee) {
                self.add_call_pair(name);
            }
        }
        node.visit_children_with(self);
    }

    fn visit_new_expr(&mut self, node: &NewExpr) {
        if let Some(name) = callee_name(&node.callee) {
            self.add_call_pair(name);
        }
        node.visit_children_with(self);
    }

    fn visit_member_expr(&mut self, node: &MemberExpr) {
        if let MemberProp::Ident(prop) = &node.prop {
            if let Expr::Ident(base) = &*node.obj {
                self.add_ref(format!("{}.{}", base.sym, prop.sym), node.span);
            }
            self.add_ref(prop.sym.to_string(), node.span);
        }
        node.visit_children_with(self);
    }

    fn visit_jsx_opening_element(&mut self, node: &JSXOpeningElement) {
        // `<Component />` uses the component like a call.
        if let JSXElementName::Ident(ident) = &node.name {
            let name = ident.sym.to_string();
            if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                self.add_ref(name.clone(), ident.span);
                self.add_call_pair(name);
            }
        }
        node.visit_children_with(self);
    }

    fn visit_expr(&mut self, node: &Expr) {
        // Identifiers only occur here in expression position, never as the
        // name being declared, so this cannot mark a definition by itself.
        if let Expr::Ident(ident) = node {
            self.add_ref(ident.sym.to_string(), ident.span);
        }
        node.visit_children_with(self);
    }
}

fn callee_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => {
            let MemberProp::Ident(prop) = &member.prop else {
                return None;
            };
            match &*member.obj {
                Expr::Ident(base) => Some(format!("{}.{}", base.sym, prop.sym)),
                _ => Some(prop.sym.to_string()),
            }
        }
        _ => None,
    }
}
