use crate::rules::Finding;
use crate::symbols::{DefKind, Definition};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// A dead-code verdict with the location detail the human report prints.
/// The JSON document carries only the qualified names.
#[derive(Debug, Clone)]
pub struct DeadSymbol {
    pub qualified_name: String,
    pub kind: DefKind,
    pub file: PathBuf,
    pub line: usize,
    pub confidence: u8,
}

/// The stable output document. Serialized as-is for `--json`; field order
/// and the deterministic sorts below make repeated runs byte-identical.
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub version: String,
    pub findings: Vec<Finding>,
    pub unused_functions: Vec<String>,
    pub unused_classes: Vec<String>,
    pub unused_variables: Vec<String>,
    pub unused_imports: Vec<String>,
    pub analysis_summary: Summary,
    #[serde(skip)]
    pub dead_symbols: Vec<DeadSymbol>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_files: usize,
    pub dead_symbol_count: usize,
    pub finding_count: usize,
}

impl AnalysisResult {
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty() || !self.dead_symbols.is_empty()
    }
}

/// Unifies rule findings and dead-code verdicts into the output document.
///
/// Pipeline per finding: pragma suppression, dedupe on
/// `(rule_id, file, line, symbol)`, sort by `(severity desc, file, line)`.
/// Dead candidates additionally pass the confidence threshold, which
/// applies to dead code only.
pub fn finalize(
    threshold: u8,
    total_files: usize,
    ignored_lines: &HashMap<PathBuf, HashSet<usize>>,
    mut findings: Vec<Finding>,
    dead_candidates: Vec<&Definition>,
) -> AnalysisResult {
    findings.retain(|finding| !is_suppressed(ignored_lines, &finding.file, finding.line));

    let mut seen = HashSet::new();
    findings.retain(|finding| {
        seen.insert((
            finding.rule_id.clone(),
            finding.file.clone(),
            finding.line,
            finding.symbol.clone(),
        ))
    });
    findings.sort_by(|a, b| {
        (Reverse(a.severity), &a.file, a.line, &a.rule_id)
            .cmp(&(Reverse(b.severity), &b.file, b.line, &b.rule_id))
    });

    let mut dead_symbols: Vec<DeadSymbol> = dead_candidates
        .into_iter()
        .filter(|def| !is_suppressed(ignored_lines, &def.file, def.line))
        .filter(|def| def.confidence >= threshold)
        .map(|def| DeadSymbol {
            qualified_name: def.qualified_name.clone(),
            kind: def.kind,
            file: def.file.clone(),
            line: def.line,
            confidence: def.confidence,
        })
        .collect();
    dead_symbols.sort_by(|a, b| {
        (&a.file, a.line, &a.qualified_name).cmp(&(&b.file, b.line, &b.qualified_name))
    });

    let mut unused_functions = Vec::new();
    let mut unused_classes = Vec::new();
    let mut unused_variables = Vec::new();
    let mut unused_imports = Vec::new();
    for dead in &dead_symbols {
        let name = dead.qualified_name.clone();
        match dead.kind {
            DefKind::Function | DefKind::Method => unused_functions.push(name),
            DefKind::Class => unused_classes.push(name),
            DefKind::Variable | DefKind::Constant => unused_variables.push(name),
            DefKind::Import => unused_imports.push(name),
            DefKind::Parameter => {}
        }
    }

    let summary = Summary {
        total_files,
        dead_symbol_count: dead_symbols.len(),
        finding_count: findings.len(),
    };

    AnalysisResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        findings,
        unused_functions,
        unused_classes,
        unused_variables,
        unused_imports,
        analysis_summary: summary,
        dead_symbols,
    }
}

fn is_suppressed(
    ignored_lines: &HashMap<PathBuf, HashSet<usize>>,
    file: &PathBuf,
    line: usize,
) -> bool {
    ignored_lines
        .get(file)
        .is_some_and(|lines| lines.contains(&line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;

    fn finding(rule: &str, severity: Severity, file: &str, line: usize) -> Finding {
        Finding::new(rule, severity, "msg", PathBuf::from(file), line, 1)
    }

    #[test]
    fn test_sorted_by_severity_then_location() {
        let findings = vec![
            finding("SKY-L002", Severity::Low, "b.py", 3),
            finding("SKY-D211", Severity::Critical, "z.py", 9),
            finding("SKY-Q002", Severity::Medium, "a.py", 1),
        ];
        let result = finalize(80, 3, &HashMap::new(), findings, Vec::new());
        let rules: Vec<&str> = result.findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(rules, ["SKY-D211", "SKY-Q002", "SKY-L002"]);
    }

    #[test]
    fn test_dedupe_on_rule_file_line_symbol() {
        let findings = vec![
            finding("SKY-S101", Severity::Critical, "a.py", 4),
            finding("SKY-S101", Severity::Critical, "a.py", 4),
        ];
        let result = finalize(80, 1, &HashMap::new(), findings, Vec::new());
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_pragma_suppression_drops_findings() {
        let ignored = HashMap::from([(PathBuf::from("a.py"), HashSet::from([4]))]);
        let findings = vec![finding("SKY-S101", Severity::Critical, "a.py", 4)];
        let result = finalize(80, 1, &ignored, findings, Vec::new());
        assert!(result.findings.is_empty());
    }
}
