use crate::rules::{Finding, Severity};
use crate::utils::LineIndex;
use rustpython_ast::{self as ast, Expr, Stmt};
use std::path::PathBuf;

const COMPLEXITY_WARN: usize = 10;
const COMPLEXITY_HIGH: usize = 15;
const COMPLEXITY_CRITICAL: usize = 20;
const MAX_NESTING: usize = 3;
const MAX_FUNCTION_LINES: usize = 50;
const MAX_REQUIRED_ARGS: usize = 5;
const MAX_TOTAL_ARGS: usize = 10;

/// Structural quality metrics per function (SKY-Q): cyclomatic complexity,
/// nesting depth, body length, parameter counts.
pub struct QualityVisitor<'a> {
    pub findings: Vec<Finding>,
    file: PathBuf,
    line_index: &'a LineIndex,
}

impl<'a> QualityVisitor<'a> {
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
                self.check_function(&node.name, &node.args, &node.body, node.range);
                self.visit_body(&node.body);
            }
            Stmt::AsyncFunctionDef(node) => {
                self.check_function(&node.name, &node.args, &node.body, node.range);
                self.visit_body(&node.body);
            }
            Stmt::ClassDef(node) => self.visit_body(&node.body),
            Stmt::If(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::For(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::While(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::With(node) => self.visit_body(&node.body),
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

    fn check_function(
        &mut self,
        name: &str,
        args: &ast::Arguments,
        body: &[Stmt],
        range: ast::text_size::TextRange,
    ) {
        let (line, col) = self.line_index.line_col(range.start());

        let complexity = 1 + body.iter().map(count_decisions).sum::<usize>();
        if complexity > COMPLEXITY_WARN {
            let severity = if complexity > COMPLEXITY_CRITICAL {
                Severity::Critical
            } else if complexity > COMPLEXITY_HIGH {
                Severity::High
            } else {
                Severity::Warn
            };
            self.findings.push(Finding::new(
                "SKY-Q001",
                severity,
                format!("Function \"{name}\" has cyclomatic complexity {complexity}"),
                self.file.clone(),
                line,
                col,
            ));
        }

        let depth = body.iter().map(nesting_depth).max().unwrap_or(0);
        if depth > MAX_NESTING {
            self.findings.push(Finding::new(
                "SKY-Q002",
                Severity::Medium,
                format!("Function \"{name}\" nests {depth} levels deep"),
                self.file.clone(),
                line,
                col,
            ));
        }

        let end_line = self.line_index.line(range.end());
        let length = end_line.saturating_sub(line) + 1;
        if length > MAX_FUNCTION_LINES {
            self.findings.push(Finding::new(
                "SKY-Q003",
                Severity::Medium,
                format!("Function \"{name}\" spans {length} lines"),
                self.file.clone(),
                line,
                col,
            ));
        }

        let required = required_arg_count(args);
        let total = total_arg_count(args);
        if required > MAX_REQUIRED_ARGS || total > MAX_TOTAL_ARGS {
            self.findings.push(Finding::new(
                "SKY-Q004",
                Severity::Medium,
                format!("Function \"{name}\" takes {required} required of {total} parameters"),
                self.file.clone(),
                line,
                col,
            ));
        }
    }
}

/// Decision points contributing to cyclomatic complexity.
fn count_decisions(stmt: &Stmt) -> usize {
    match stmt {
        Stmt::If(node) => {
            1 + expr_decisions(&node.test)
                + body_decisions(&node.body)
                + body_decisions(&node.orelse)
        }
        Stmt::For(node) => 1 + body_decisions(&node.body) + body_decisions(&node.orelse),
        Stmt::AsyncFor(node) => 1 + body_decisions(&node.body) + body_decisions(&node.orelse),
        Stmt::While(node) => {
            1 + expr_decisions(&node.test)
                + body_decisions(&node.body)
                + body_decisions(&node.orelse)
        }
        Stmt::Try(node) => {
            let handlers = node.handlers.len();
            let mut total = handlers + body_decisions(&node.body);
            for handler in &node.handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                total += body_decisions(&h.body);
            }
            total + body_decisions(&node.orelse) + body_decisions(&node.finalbody)
        }
        Stmt::Match(node) => {
            node.cases.len()
                + node
                    .cases
                    .iter()
                    .map(|case| body_decisions(&case.body))
                    .sum::<usize>()
        }
        Stmt::With(node) => body_decisions(&node.body),
        Stmt::AsyncWith(node) => body_decisions(&node.body),
        Stmt::Assert(_) => 1,
        Stmt::Expr(node) => expr_decisions(&node.value),
        Stmt::Return(node) => node.value.as_deref().map_or(0, expr_decisions),
        Stmt::Assign(node) => expr_decisions(&node.value),
        // Nested definitions count their own complexity separately.
        Stmt::FunctionDef(_) | Stmt::AsyncFunctionDef(_) | Stmt::ClassDef(_) => 0,
        _ => 0,
    }
}

fn body_decisions(body: &[Stmt]) -> usize {
    body.iter().map(count_decisions).sum()
}

fn expr_decisions(expr: &Expr) -> usize {
    match expr {
        Expr::BoolOp(node) => node.values.len().saturating_sub(1),
        Expr::IfExp(node) => {
            1 + expr_decisions(&node.test)
                + expr_decisions(&node.body)
                + expr_decisions(&node.orelse)
        }
        _ => 0,
    }
}

/// Depth of block statements below a statement.
fn nesting_depth(stmt: &Stmt) -> usize {
    let bodies: Vec<&[Stmt]> = match stmt {
        Stmt::If(node) => vec![&node.body, &node.orelse],
        Stmt::For(node) => vec![&node.body, &node.orelse],
        Stmt::AsyncFor(node) => vec![&node.body, &node.orelse],
        Stmt::While(node) => vec![&node.body, &node.orelse],
        Stmt::With(node) => vec![&node.body],
        Stmt::AsyncWith(node) => vec![&node.body],
        Stmt::Try(node) => {
            let mut bodies: Vec<&[Stmt]> = vec![&node.body, &node.orelse, &node.finalbody];
            for handler in &node.handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                bodies.push(&h.body);
            }
            bodies
        }
        _ => return 0,
    };
    1 + bodies
        .into_iter()
        .flat_map(|body| body.iter().map(nesting_depth))
        .max()
        .unwrap_or(0)
}

fn required_arg_count(args: &ast::Arguments) -> usize {
    args.posonlyargs
        .iter()
        .chain(&args.args)
        .filter(|arg| arg.default.is_none())
        .filter(|arg| {
            let name = arg.def.arg.as_str();
            name != "self" && name != "cls"
        })
        .count()
}

fn total_arg_count(args: &ast::Arguments) -> usize {
    args.posonlyargs
        .iter()
        .chain(&args.args)
        .chain(&args.kwonlyargs)
        .filter(|arg| {
            let name = arg.def.arg.as_str();
            name != "self" && name != "cls"
        })
        .count()
        + usize::from(args.vararg.is_some())
        + usize::from(args.kwarg.is_some())
}
