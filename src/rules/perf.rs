use crate::rules::{Finding, Severity};
use crate::utils::LineIndex;
use rustpython_ast::{self as ast, Expr, Stmt};
use std::collections::HashSet;
use std::path::PathBuf;

/// Performance smells (SKY-P): whole-file reads, unchunked dataframe
/// loads, quadratic nested loops.
pub struct PerfVisitor<'a> {
    pub findings: Vec<Finding>,
    file: PathBuf,
    line_index: &'a LineIndex,
}

impl<'a> PerfVisitor<'a> {
    pub fn new(file: PathBuf, line_index: &'a LineIndex) -> Self {
        Self {
            findings: Vec::new(),
            file,
            line_index,
        }
    }

    pub fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Assign(node) => self.visit_expr(&node.value),
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::FunctionDef(node) => self.visit_body(&node.body),
            Stmt::AsyncFunctionDef(node) => self.visit_body(&node.body),
            Stmt::ClassDef(node) => self.visit_body(&node.body),
            Stmt::If(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::For(node) => {
                self.check_nested_loop(node);
                self.visit_expr(&node.iter);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::While(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                }
                self.visit_body(&node.body);
            }
            Stmt::Try(node) => {
                self.visit_body(&node.body);
                for handler in &node.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    self.visit_body(&h.body);
                }
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            _ => {}
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    pub fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Call(node) = expr {
            self.check_call(node);
            self.visit_expr(&node.func);
            for arg in &node.args {
                self.visit_expr(arg);
            }
        }
    }

    fn check_call(&mut self, call: &ast::ExprCall) {
        let (line, col) = self.line_index.line_col(call.range.start());

        if let Expr::Attribute(attr) = &*call.func {
            let method = attr.attr.as_str();
            // P001: slurping a whole file at once.
            if (method == "read" || method == "readlines") && call.args.is_empty() {
                self.findings.push(Finding::new(
                    "SKY-P001",
                    Severity::Low,
                    format!("{method}() loads the whole file into memory"),
                    self.file.clone(),
                    line,
                    col,
                ));
            }
            // P002: dataframe load without chunking.
            if method == "read_csv" && !has_keyword(call, "chunksize") {
                self.findings.push(Finding::new(
                    "SKY-P002",
                    Severity::Low,
                    "read_csv without chunksize",
                    self.file.clone(),
                    line,
                    col,
                ));
            }
        }
    }

    /// P003: an inner loop whose body touches both loop variables is the
    /// classic O(N^2) scan.
    fn check_nested_loop(&mut self, outer: &ast::StmtFor) {
        let outer_names = target_names(&outer.target);
        if outer_names.is_empty() {
            return;
        }
        for stmt in &outer.body {
            self.find_inner_loop(stmt, &outer_names);
        }
    }

    fn find_inner_loop(&mut self, stmt: &Stmt, outer_names: &HashSet<String>) {
        match stmt {
            Stmt::For(inner) => {
                let inner_names = target_names(&inner.target);
                let mut used = HashSet::new();
                for stmt in &inner.body {
                    collect_loaded_names(stmt, &mut used);
                }
                if outer_names.iter().any(|n| used.contains(n))
                    && inner_names.iter().any(|n| used.contains(n))
                {
                    let (line, col) = self.line_index.line_col(inner.range.start());
                    self.findings.push(Finding::new(
                        "SKY-P003",
                        Severity::Medium,
                        "Nested loops reference both loop variables (quadratic scan)",
                        self.file.clone(),
                        line,
                        col,
                    ));
                }
            }
            Stmt::If(node) => {
                for stmt in node.body.iter().chain(&node.orelse) {
                    self.find_inner_loop(stmt, outer_names);
                }
            }
            Stmt::With(node) => {
                for stmt in &node.body {
                    self.find_inner_loop(stmt, outer_names);
                }
            }
            _ => {}
        }
    }
}

fn has_keyword(call: &ast::ExprCall, name: &str) -> bool {
    call.keywords
        .iter()
        .any(|kw| kw.arg.as_ref().map(|a| a.as_str()) == Some(name))
}

fn target_names(target: &Expr) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_target_names(target, &mut names);
    names
}

fn collect_target_names(target: &Expr, names: &mut HashSet<String>) {
    match target {
        Expr::Name(node) => {
            names.insert(node.id.to_string());
        }
        Expr::Tuple(node) => {
            for elt in &node.elts {
                collect_target_names(elt, names);
            }
        }
        _ => {}
    }
}

fn collect_loaded_names(stmt: &Stmt, names: &mut HashSet<String>) {
    match stmt {
        Stmt::Expr(node) => collect_expr_names(&node.value, names),
        Stmt::Assign(node) => collect_expr_names(&node.value, names),
        Stmt::AugAssign(node) => collect_expr_names(&node.value, names),
        Stmt::If(node) => {
            collect_expr_names(&node.test, names);
            for stmt in node.body.iter().chain(&node.orelse) {
                collect_loaded_names(stmt, names);
            }
        }
        Stmt::Return(node) => {
            if let Some(value) = &node.value {
                collect_expr_names(value, names);
            }
        }
        Stmt::For(node) => {
            collect_expr_names(&node.iter, names);
            for stmt in &node.body {
                collect_loaded_names(stmt, names);
            }
        }
        _ => {}
    }
}

fn collect_expr_names(expr: &Expr, names: &mut HashSet<String>) {
    match expr {
        Expr::Name(node) => {
            names.insert(node.id.to_string());
        }
        Expr::Call(node) => {
            collect_expr_names(&node.func, names);
            for arg in &node.args {
                collect_expr_names(arg, names);
            }
        }
        Expr::Attribute(node) => collect_expr_names(&node.value, names),
        Expr::BinOp(node) => {
            collect_expr_names(&node.left, names);
            collect_expr_names(&node.right, names);
        }
        Expr::Compare(node) => {
            collect_expr_names(&node.left, names);
            for comparator in &node.comparators {
                collect_expr_names(comparator, names);
            }
        }
        Expr::Subscript(node) => {
            collect_expr_names(&node.value, names);
            collect_expr_names(&node.slice, names);
        }
        _ => {}
    }
}
