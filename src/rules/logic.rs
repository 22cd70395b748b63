use crate::rules::{Finding, Severity};
use crate::utils::LineIndex;
use rustpython_ast::{self as ast, Expr, Ranged, Stmt};
use std::path::PathBuf;

/// Logic pitfalls (SKY-L00x): mutable defaults, bare excepts, singleton
/// comparison by equality.
pub struct LogicVisitor<'a> {
    pub findings: Vec<Finding>,
    file: PathBuf,
    line_index: &'a LineIndex,
}

impl<'a> LogicVisitor<'a> {
    pub fn new(file: PathBuf, line_index: &'a LineIndex) -> Self {
        Self {
            findings: Vec::new(),
            file,
            line_index,
        }
    }

    pub fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => {
                self.check_defaults(&node.args);
                self.visit_body(&node.body);
            }
            Stmt::AsyncFunctionDef(node) => {
                self.check_defaults(&node.args);
                self.visit_body(&node.body);
            }
            Stmt::ClassDef(node) => self.visit_body(&node.body),
            Stmt::Expr(node) => self.visit_expr(&node.value),
            Stmt::Assign(node) => self.visit_expr(&node.value),
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::If(node) => {
                self.visit_expr(&node.test);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::While(node) => {
                self.visit_expr(&node.test);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::For(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::Try(node) => {
                self.visit_body(&node.body);
                for handler in &node.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    if h.type_.is_none() {
                        let (line, col) = self.line_index.line_col(h.range.start());
                        self.findings.push(Finding::new(
                            "SKY-L002",
                            Severity::Low,
                            "Bare except clause swallows every exception",
                            self.file.clone(),
                            line,
                            col,
                        ));
                    }
                    self.visit_body(&h.body);
                }
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            Stmt::With(node) => self.visit_body(&node.body),
            _ => {}
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn check_defaults(&mut self, args: &ast::Arguments) {
        for arg in args
            .posonlyargs
            .iter()
            .chain(&args.args)
            .chain(&args.kwonlyargs)
        {
            if let Some(default) = &arg.default {
                if is_mutable_literal(default) {
                    let (line, col) = self.line_index.line_col(default.range().start());
                    self.findings.push(Finding::new(
                        "SKY-L001",
                        Severity::Medium,
                        format!(
                            "Mutable default value for parameter \"{}\"",
                            arg.def.arg.as_str()
                        ),
                        self.file.clone(),
                        line,
                        col,
                    ));
                }
            }
        }
    }

    pub fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Compare(node) => {
                let eq_op = node
                    .ops
                    .iter()
                    .any(|op| matches!(op, ast::CmpOp::Eq | ast::CmpOp::NotEq));
                if eq_op {
                    for comparator in std::iter::once(&*node.left).chain(
                        node.comparators.iter(),
                    ) {
                        if is_singleton(comparator) {
                            let (line, col) = self.line_index.line_col(node.range.start());
                            self.findings.push(Finding::new(
                                "SKY-L003",
                                Severity::Warn,
                                "Equality comparison against a singleton; use `is`",
                                self.file.clone(),
                                line,
                                col,
                            ));
                            break;
                        }
                    }
                }
                self.visit_expr(&node.left);
            }
            Expr::Call(node) => {
                for arg in &node.args {
                    self.visit_expr(arg);
                }
            }
            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::UnaryOp(node) => self.visit_expr(&node.operand),
            _ => {}
        }
    }
}

fn is_mutable_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::List(_) | Expr::Dict(_) | Expr::Set(_))
}

fn is_singleton(expr: &Expr) -> bool {
    if let Expr::Constant(constant) = expr {
        return matches!(
            constant.value,
            ast::Constant::None | ast::Constant::Bool(_)
        );
    }
    false
}
