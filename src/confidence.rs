use crate::framework;
use crate::symbols::{DefKind, SymbolTable};
use crate::test_aware;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Scores every definition's dead-confidence.
///
/// A dead candidate starts at 100 and accumulates penalties for each signal
/// suggesting the symbol is implicitly reachable. Every signal only ever
/// subtracts, so adding a reference can never raise a symbol's
/// dead-confidence. A pragma-marked line is terminal: the definition scores
/// 0 no matter what else applies.
pub fn score_definitions(
    table: &mut SymbolTable,
    ignored_lines: &HashMap<PathBuf, HashSet<usize>>,
) {
    let callee_names = table.callee_names();
    let dynamic_names = table.dynamic_names.clone();
    let dunder_only = dunder_only_classes(table);

    for def in &mut table.defs {
        if ignored_lines
            .get(&def.file)
            .is_some_and(|lines| lines.contains(&def.line))
        {
            def.confidence = 0;
            continue;
        }

        let mut confidence: i16 = 100;
        if def.exported {
            confidence -= 40;
        }
        if def
            .decorators
            .iter()
            .any(|d| framework::is_dispatch_decorator(d))
        {
            confidence -= 50;
        }
        // Private-by-convention names are often reached via interfaces the
        // analyzer cannot see.
        if def.simple_name.starts_with('_') && !def.simple_name.starts_with("__") {
            confidence -= 5;
        }
        if def.in_test_file && test_aware::looks_like_test_helper(&def.simple_name) {
            confidence -= 30;
        }
        if callee_names.contains(&def.simple_name) {
            confidence -= 60;
        }
        if dynamic_names.contains(&def.simple_name) {
            confidence -= 40;
        }
        if def.kind == DefKind::Class && dunder_only.contains(&def.qualified_name) {
            confidence -= 10;
        }
        def.confidence = confidence.clamp(0, 100) as u8;
    }
}

/// Classes whose methods are all dunders: typically value types driven
/// entirely by the runtime protocol.
fn dunder_only_classes(table: &SymbolTable) -> HashSet<String> {
    let mut methods: HashMap<&str, (usize, usize)> = HashMap::new();
    for def in &table.defs {
        if def.kind != DefKind::Method {
            continue;
        }
        if let Some(class) = def.class_qualified() {
            let entry = methods.entry(class).or_insert((0, 0));
            entry.0 += 1;
            if def.is_dunder() {
                entry.1 += 1;
            }
        }
    }
    methods
        .into_iter()
        .filter(|(_, (total, dunder))| *total > 0 && total == dunder)
        .map(|(class, _)| class.to_string())
        .collect()
}
