use rustpython_ast::{Constant, Expr, Stmt};
use std::collections::HashSet;

/// Call names appearing inside `if __name__ == "__main__":` blocks.
///
/// Everything invoked from the main guard is a program entry point. The
/// analyzer turns each returned name into synthetic references, both simple
/// and module-qualified, so entry points are never reported dead.
pub fn main_guard_calls(body: &[Stmt]) -> HashSet<String> {
    let mut calls = HashSet::new();
    for stmt in body {
        if let Stmt::If(if_stmt) = stmt {
            if is_main_guard(&if_stmt.test) {
                for inner in &if_stmt.body {
                    walk_stmt(inner, &mut calls);
                }
            }
        }
    }
    calls
}

/// `__name__ == "__main__"`, accepting either operand order.
fn is_main_guard(test: &Expr) -> bool {
    let Expr::Compare(compare) = test else {
        return false;
    };
    if compare.ops.len() != 1 || compare.comparators.len() != 1 {
        return false;
    }
    let (left, right) = (&*compare.left, &compare.comparators[0]);
    (is_name_expr(left, "__name__") && is_str_expr(right, "__main__"))
        || (is_name_expr(right, "__name__") && is_str_expr(left, "__main__"))
}

fn is_name_expr(expr: &Expr, id: &str) -> bool {
    matches!(expr, Expr::Name(name) if name.id.as_str() == id)
}

fn is_str_expr(expr: &Expr, value: &str) -> bool {
    if let Expr::Constant(constant) = expr {
        if let Constant::Str(s) = &constant.value {
            return s.as_str() == value;
        }
    }
    false
}

fn walk_stmt(stmt: &Stmt, calls: &mut HashSet<String>) {
    match stmt {
        Stmt::Expr(node) => walk_expr(&node.value, calls),
        Stmt::Assign(node) => walk_expr(&node.value, calls),
        Stmt::Return(node) => {
            if let Some(value) = &node.value {
                walk_expr(value, calls);
            }
        }
        Stmt::If(node) => {
            walk_expr(&node.test, calls);
            for inner in node.body.iter().chain(&node.orelse) {
                walk_stmt(inner, calls);
            }
        }
        Stmt::For(node) => {
            walk_expr(&node.iter, calls);
            for inner in node.body.iter().chain(&node.orelse) {
                walk_stmt(inner, calls);
            }
        }
        Stmt::While(node) => {
            walk_expr(&node.test, calls);
            for inner in node.body.iter().chain(&node.orelse) {
                walk_stmt(inner, calls);
            }
        }
        Stmt::With(node) => {
            for item in &node.items {
                walk_expr(&item.context_expr, calls);
            }
            for inner in &node.body {
                walk_stmt(inner, calls);
            }
        }
        Stmt::Try(node) => {
            for inner in node
                .body
                .iter()
                .chain(&node.orelse)
                .chain(&node.finalbody)
            {
                walk_stmt(inner, calls);
            }
            for handler in &node.handlers {
                let rustpython_ast::ExceptHandler::ExceptHandler(h) = handler;
                for inner in &h.body {
                    walk_stmt(inner, calls);
                }
            }
        }
        _ => {}
    }
}

fn walk_expr(expr: &Expr, calls: &mut HashSet<String>) {
    match expr {
        Expr::Call(call) => {
            match &*call.func {
                Expr::Name(name) => {
                    calls.insert(name.id.to_string());
                }
                Expr::Attribute(attr) => {
                    calls.insert(attr.attr.to_string());
                    walk_expr(&attr.value, calls);
                }
                _ => {}
            }
            for arg in &call.args {
                walk_expr(arg, calls);
            }
            for keyword in &call.keywords {
                walk_expr(&keyword.value, calls);
            }
        }
        Expr::Attribute(attr) => walk_expr(&attr.value, calls),
        Expr::BinOp(binop) => {
            walk_expr(&binop.left, calls);
            walk_expr(&binop.right, calls);
        }
        Expr::Await(inner) => walk_expr(&inner.value, calls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn guard_calls(source: &str) -> HashSet<String> {
        let tree = parse(source, Mode::Module, "test.py").expect("parse");
        match tree {
            rustpython_ast::Mod::Module(module) => main_guard_calls(&module.body),
            _ => HashSet::new(),
        }
    }

    #[test]
    fn test_entry_point_detection() {
        let calls = guard_calls(
            r#"
def my_function():
    pass

if __name__ == "__main__":
    my_function()
    another_call()
"#,
        );
        assert!(calls.contains("my_function"));
        assert!(calls.contains("another_call"));
    }

    #[test]
    fn test_reversed_main_guard() {
        let calls = guard_calls(
            r#"
def func():
    pass

if "__main__" == __name__:
    func()
"#,
        );
        assert!(calls.contains("func"));
    }

    #[test]
    fn test_nested_and_assigned_calls() {
        let calls = guard_calls(
            r#"
if __name__ == "__main__":
    result = compute()
    for item in get_items():
        handle(item)
"#,
        );
        assert!(calls.contains("compute"));
        assert!(calls.contains("get_items"));
        assert!(calls.contains("handle"));
    }

    #[test]
    fn test_no_entry_point() {
        let calls = guard_calls("def my_function():\n    pass\n");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_other_if_blocks_ignored() {
        let calls = guard_calls(
            r#"
if DEBUG == "__main__":
    not_an_entry()
"#,
        );
        assert!(calls.is_empty());
    }
}
