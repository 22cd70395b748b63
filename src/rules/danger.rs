use crate::rules::{Finding, Severity};
use crate::utils::LineIndex;
use lazy_static::lazy_static;
use rustpython_ast::{self as ast, Expr, Stmt};
use std::collections::HashSet;
use std::path::PathBuf;

// Sink tables for the taint-lite rules. Matching is on the last segment of
// the dotted callee name unless noted.

lazy_static! {
    static ref SQL_SINKS: HashSet<&'static str> =
        ["execute", "executemany", "executescript", "raw"].into_iter().collect();
    static ref HTTP_SINKS: HashSet<&'static str> = [
        "get", "post", "put", "delete", "head", "patch", "request", "urlopen",
    ]
    .into_iter()
    .collect();
    static ref HTTP_MODULES: HashSet<&'static str> =
        ["requests", "httpx", "urllib", "aiohttp", "session", "client"].into_iter().collect();
    static ref PATH_SINKS: HashSet<&'static str> =
        ["open", "remove", "unlink", "rmtree", "rmdir"].into_iter().collect();
}

/// How much the analyzer trusts an argument expression.
///
/// Taint-lite is per-expression only: a string literal is safe, anything
/// assembled with concatenation or formatting is tainted, and a bare
/// variable is tainted because its origin is unknown. No interprocedural
/// flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taint {
    Literal,
    Formatted,
    Variable,
}

impl Taint {
    pub fn is_tainted(self) -> bool {
        self != Taint::Literal
    }
}

/// Classifies an argument expression for the sink rules.
pub fn classify(expr: &Expr) -> Taint {
    match expr {
        Expr::Constant(_) => Taint::Literal,
        Expr::JoinedStr(node) => {
            if node
                .values
                .iter()
                .any(|v| matches!(v, Expr::FormattedValue(_)))
            {
                Taint::Formatted
            } else {
                Taint::Literal
            }
        }
        Expr::BinOp(node) => {
            let op_builds_string = matches!(
                node.op,
                ast::Operator::Add | ast::Operator::Mod | ast::Operator::Mult
            );
            if !op_builds_string {
                return Taint::Variable;
            }
            if classify(&node.left) == Taint::Literal && classify(&node.right) == Taint::Literal {
                Taint::Literal
            } else {
                Taint::Formatted
            }
        }
        Expr::Call(node) => {
            // `"...".format(x)` and `f"".join(...)` style construction.
            if let Expr::Attribute(attr) = &*node.func {
                if attr.attr.as_str() == "format" || attr.attr.as_str() == "join" {
                    return Taint::Formatted;
                }
            }
            Taint::Variable
        }
        _ => Taint::Variable,
    }
}

/// Dangerous-pattern detector over call expressions (SKY-D2xx).
pub struct DangerVisitor<'a> {
    pub findings: Vec<Finding>,
    file: PathBuf,
    line_index: &'a LineIndex,
}

impl<'a> DangerVisitor<'a> {
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
            Stmt::AugAssign(node) => self.visit_expr(&node.value),
            Stmt::AnnAssign(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::FunctionDef(node) => self.visit_body(&node.body),
            Stmt::AsyncFunctionDef(node) => self.visit_body(&node.body),
            Stmt::ClassDef(node) => self.visit_body(&node.body),
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
            for keyword in &node.keywords {
                self.visit_expr(&keyword.value);
            }
        }
    }

    fn check_call(&mut self, call: &ast::ExprCall) {
        let Some(name) = dotted_call_name(&call.func) else {
            return;
        };
        let (line, col) = self.line_index.line_col(call.range.start());
        let last = name.rsplit('.').next().unwrap_or(&name);
        let head = name.split('.').next().unwrap_or(&name);
        let first_taint = call.args.first().map(classify);

        // D201: arbitrary code execution.
        if name == "eval" || name == "exec" {
            self.report("SKY-D201", Severity::High, "Use of eval/exec", line, col);
        }

        // D207: weak hash primitives.
        if name == "hashlib.md5" || name == "hashlib.sha1" {
            self.report(
                "SKY-D207",
                Severity::Medium,
                format!("Weak cryptographic hash {last}"),
                line,
                col,
            );
        }

        // D208: deserialization of untrusted data.
        if name == "pickle.load" || name == "pickle.loads" || name == "marshal.loads" {
            self.report(
                "SKY-D208",
                Severity::High,
                format!("Unsafe deserialization via {name}"),
                line,
                col,
            );
        }
        if name == "yaml.load" && !self.has_safe_loader(call) {
            self.report(
                "SKY-D208",
                Severity::High,
                "yaml.load without SafeLoader",
                line,
                col,
            );
        }

        // D210: TLS verification disabled.
        if self.has_keyword_false(call, "verify") {
            self.report(
                "SKY-D210",
                Severity::High,
                "TLS certificate verification disabled (verify=False)",
                line,
                col,
            );
        }
        if name == "ssl._create_unverified_context" {
            self.report(
                "SKY-D210",
                Severity::High,
                "Unverified TLS context",
                line,
                col,
            );
        }

        // D211: SQL sink fed a built-up query.
        if SQL_SINKS.contains(last) {
            match first_taint {
                Some(Taint::Formatted) => self.report(
                    "SKY-D211",
                    Severity::Critical,
                    "SQL query assembled from untrusted input",
                    line,
                    col,
                ),
                Some(Taint::Variable) => self.report(
                    "SKY-D211",
                    Severity::High,
                    "SQL sink called with a variable query",
                    line,
                    col,
                ),
                _ => {}
            }
        }

        // D212: shell command sinks.
        if name == "os.system" || name == "os.popen" {
            if first_taint.is_some_and(Taint::is_tainted) {
                self.report(
                    "SKY-D212",
                    Severity::Critical,
                    "Shell command assembled from untrusted input",
                    line,
                    col,
                );
            }
        }
        if head == "subprocess" && self.has_keyword_true(call, "shell") {
            let severity = if first_taint.is_some_and(Taint::is_tainted) {
                Severity::Critical
            } else {
                Severity::High
            };
            self.report(
                "SKY-D212",
                severity,
                "subprocess invoked with shell=True",
                line,
                col,
            );
        }

        // D215: filesystem sink fed a concatenated path.
        if PATH_SINKS.contains(last) && matches!(first_taint, Some(Taint::Formatted)) {
            self.report(
                "SKY-D215",
                Severity::High,
                "Filesystem path assembled from untrusted input",
                line,
                col,
            );
        }

        // D216: HTTP client with a non-literal URL.
        if HTTP_SINKS.contains(last)
            && HTTP_MODULES.contains(head)
            && first_taint.is_some_and(Taint::is_tainted)
        {
            self.report(
                "SKY-D216",
                Severity::High,
                "HTTP request to a non-literal URL (SSRF risk)",
                line,
                col,
            );
        }
    }

    fn has_keyword_false(&self, call: &ast::ExprCall, keyword: &str) -> bool {
        self.keyword_bool(call, keyword) == Some(false)
    }

    fn has_keyword_true(&self, call: &ast::ExprCall, keyword: &str) -> bool {
        self.keyword_bool(call, keyword) == Some(true)
    }

    fn keyword_bool(&self, call: &ast::ExprCall, keyword: &str) -> Option<bool> {
        for kw in &call.keywords {
            if kw.arg.as_ref().map(|a| a.as_str()) == Some(keyword) {
                if let Expr::Constant(constant) = &kw.value {
                    if let ast::Constant::Bool(value) = &constant.value {
                        return Some(*value);
                    }
                }
            }
        }
        None
    }

    fn has_safe_loader(&self, call: &ast::ExprCall) -> bool {
        for kw in &call.keywords {
            if kw.arg.as_ref().map(|a| a.as_str()) == Some("Loader") {
                if let Some(loader) = dotted_call_name(&kw.value) {
                    return loader.ends_with("SafeLoader") || loader.ends_with("CSafeLoader");
                }
            }
        }
        false
    }

    fn report(
        &mut self,
        rule_id: &str,
        severity: Severity,
        message: impl Into<String>,
        line: usize,
        col: usize,
    ) {
        self.findings.push(Finding::new(
            rule_id,
            severity,
            message,
            self.file.clone(),
            line,
            col,
        ));
    }
}

/// Dotted name of a call target: `db.execute` -> "db.execute",
/// `hashlib.md5` -> "hashlib.md5".
pub fn dotted_call_name(func: &Expr) -> Option<String> {
    match func {
        Expr::Name(node) => Some(node.id.to_string()),
        Expr::Attribute(node) => match &*node.value {
            Expr::Name(base) => Some(format!("{}.{}", base.id, node.attr)),
            Expr::Attribute(inner) => {
                dotted_call_name(&Expr::Attribute(inner.clone()))
                    .map(|prefix| format!("{}.{}", prefix, node.attr))
            }
            _ => Some(node.attr.to_string()),
        },
        _ => None,
    }
}
