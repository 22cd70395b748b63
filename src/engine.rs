use crate::error::AnalyzerError;
use crate::loader;
use crate::rules::{Finding, Severity};
use crate::symbols::{CallPair, DefKind, Definition, FileSymbols, Reference};
use crate::utils::CancelToken;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

lazy_static! {
    /// Go-engine rule ids rewritten to the unified SKY-D namespace.
    /// Unmapped G-prefixed ids pass through unchanged.
    static ref GO_RULE_REMAP: HashMap<&'static str, &'static str> = [
        ("G207", "D207"),
        ("G208", "D208"),
        ("G210", "D210"),
        ("G211", "D211"),
        ("G212", "D212"),
        ("G215", "D215"),
        ("G216", "D216"),
        ("G220", "D230"),
    ]
    .into_iter()
    .collect();
}

/// An external language engine: hands back findings plus the symbol triple
/// the resolver folds into the global table. New languages are new
/// implementations of this trait, not changes to the core.
pub trait Engine {
    fn name(&self) -> &str;
    fn analyze(&self, root: &Path, cancel: &CancelToken) -> Result<EngineReport, AnalyzerError>;
}

/// Top-level JSON object an engine prints on stdout.
#[derive(Debug, Deserialize)]
pub struct EngineReport {
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub findings: Vec<EngineFinding>,
    #[serde(default)]
    pub symbols: EngineSymbols,
}

#[derive(Debug, Default, Deserialize)]
pub struct EngineSymbols {
    #[serde(default)]
    pub defs: Vec<EngineDef>,
    #[serde(default)]
    pub refs: Vec<EngineRef>,
    #[serde(default)]
    pub call_pairs: Vec<EngineCallPair>,
}

#[derive(Debug, Deserialize)]
pub struct EngineDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
    pub line: usize,
    #[serde(default)]
    pub is_exported: bool,
    #[serde(default)]
    pub receiver: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EngineRef {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Deserialize)]
pub struct EngineCallPair {
    pub caller: String,
    pub callee: String,
}

#[derive(Debug, Deserialize)]
pub struct EngineFinding {
    pub rule_id: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    #[serde(default)]
    pub message: String,
    pub file: String,
    pub line: usize,
    #[serde(default)]
    pub col: usize,
    #[serde(default)]
    pub symbol: Option<String>,
}

fn default_confidence() -> u8 {
    100
}

/// The `skylos-go` subprocess. Invoked once per root that contains Go
/// files; exit 0 means success even when findings are present.
pub struct GoEngine {
    pub binary: String,
    pub skylos_version: String,
}

impl GoEngine {
    pub fn new(skylos_version: &str) -> Self {
        Self {
            binary: "skylos-go".to_string(),
            skylos_version: skylos_version.to_string(),
        }
    }
}

impl Engine for GoEngine {
    fn name(&self) -> &str {
        "skylos-go"
    }

    fn analyze(&self, root: &Path, cancel: &CancelToken) -> Result<EngineReport, AnalyzerError> {
        let abs_root = root
            .canonicalize()
            .map_err(|e| AnalyzerError::engine(format!("bad engine root: {e}")))?;
        let mut child = Command::new(&self.binary)
            .arg("analyze")
            .arg("--root")
            .arg(&abs_root)
            .arg("--format")
            .arg("json")
            .arg("--skylos-version")
            .arg(&self.skylos_version)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AnalyzerError::engine(format!("failed to spawn {}: {e}", self.binary)))?;

        // Drain stdout on a side thread so a chatty child never blocks on a
        // full pipe while the poll loop waits for it.
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalyzerError::engine("engine stdout unavailable"))?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        });

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AnalyzerError::engine("cancelled"));
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(Duration::from_millis(25)),
                Err(e) => return Err(AnalyzerError::engine(format!("engine wait failed: {e}"))),
            }
        };
        let output = reader
            .join()
            .map_err(|_| AnalyzerError::engine("engine reader thread panicked"))?;

        if !status.success() {
            return Err(AnalyzerError::engine(format!(
                "{} exited with {status}",
                self.binary
            )));
        }
        serde_json::from_slice(&output)
            .map_err(|e| AnalyzerError::engine(format!("malformed engine output: {e}")))
    }
}

/// Rewrites a Go rule id through the remap table: `SKY-G211` and `G211`
/// both become `SKY-D211`.
pub fn remap_rule_id(rule_id: &str) -> String {
    let bare = rule_id.strip_prefix("SKY-").unwrap_or(rule_id);
    match GO_RULE_REMAP.get(bare) {
        Some(mapped) => format!("SKY-{mapped}"),
        None => {
            if rule_id.starts_with("SKY-") {
                rule_id.to_string()
            } else {
                format!("SKY-{bare}")
            }
        }
    }
}

/// Converts an engine finding into the unified shape, applying the remap.
pub fn convert_finding(finding: EngineFinding) -> Finding {
    Finding {
        rule_id: remap_rule_id(&finding.rule_id),
        severity: Severity::parse(&finding.severity),
        confidence: finding.confidence,
        message: finding.message,
        file: PathBuf::from(finding.file),
        line: finding.line,
        col: finding.col,
        symbol: finding.symbol,
    }
}

/// Folds the engine's symbol triple into per-file symbols keyed the same
/// way as in-process collectors.
pub fn convert_symbols(root: &Path, symbols: EngineSymbols) -> Vec<FileSymbols> {
    let mut by_module: HashMap<String, FileSymbols> = HashMap::new();

    for def in symbols.defs {
        let file = PathBuf::from(&def.file);
        let module = loader::module_name(root, &file);
        let qualified = match &def.receiver {
            Some(receiver) if !receiver.is_empty() => {
                format!("{module}.{receiver}.{}", def.name)
            }
            _ => format!("{module}.{}", def.name),
        };
        let kind = match def.kind.as_str() {
            "method" => DefKind::Method,
            "variable" => DefKind::Variable,
            "constant" => DefKind::Constant,
            "type" => DefKind::Class,
            _ => DefKind::Function,
        };
        let mut definition = Definition::new(qualified, kind, module.clone(), file.clone(), def.line);
        definition.exported = def.is_exported;
        definition.receiver = def.receiver;
        definition.from_engine = true;
        definition.in_test_file = loader::is_test_file(&definition.file);

        let slot = by_module.entry(module.clone()).or_insert_with(|| FileSymbols {
            module,
            ..Default::default()
        });
        slot.defs.push(definition);
    }

    for reference in symbols.refs {
        let file = PathBuf::from(&reference.file);
        let module = loader::module_name(root, &file);
        let from_test_file = loader::is_test_file(&file);
        let slot = by_module.entry(module.clone()).or_insert_with(|| FileSymbols {
            module: module.clone(),
            ..Default::default()
        });
        slot.refs.push(Reference {
            name: reference.name,
            module,
            file,
            line: 0,
            from_test_file,
        });
    }

    if !symbols.call_pairs.is_empty() {
        let slot = by_module
            .entry(String::new())
            .or_insert_with(FileSymbols::default);
        for pair in symbols.call_pairs {
            slot.call_pairs.push(CallPair {
                caller: pair.caller,
                callee: pair.callee,
                from_test_file: false,
            });
        }
    }

    by_module.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_table() {
        assert_eq!(remap_rule_id("G211"), "SKY-D211");
        assert_eq!(remap_rule_id("SKY-G211"), "SKY-D211");
        assert_eq!(remap_rule_id("G220"), "SKY-D230");
        assert_eq!(remap_rule_id("G999"), "SKY-G999");
        assert_eq!(remap_rule_id("SKY-D201"), "SKY-D201");
    }

    #[test]
    fn test_report_deserialization() {
        let raw = r#"{
            "engine": "skylos-go",
            "version": "1.2.0",
            "findings": [
                {"rule_id": "G211", "severity": "CRITICAL",
                 "message": "SQL injection", "file": "db/query.go", "line": 17, "col": 2,
                 "symbol": "getUser"}
            ],
            "symbols": {
                "defs": [
                    {"name": "GetUser", "type": "function", "file": "db/query.go",
                     "line": 12, "is_exported": true}
                ],
                "refs": [{"name": "GetUser", "file": "main.go"}],
                "call_pairs": [{"caller": "main.main", "callee": "GetUser"}]
            }
        }"#;
        let report: EngineReport = serde_json::from_str(raw).expect("contract shape");
        assert_eq!(report.engine, "skylos-go");
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.symbols.defs[0].name, "GetUser");
        assert!(report.symbols.defs[0].is_exported);

        let finding = convert_finding(report.findings.into_iter().next().unwrap());
        assert_eq!(finding.rule_id, "SKY-D211");
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.line, 17);
    }

    #[test]
    fn test_missing_optional_fields() {
        let raw = r#"{"engine": "skylos-go", "version": "1.2.0", "findings": [], "symbols": {}}"#;
        let report: EngineReport = serde_json::from_str(raw).expect("minimal shape");
        assert!(report.symbols.defs.is_empty());
    }

    #[test]
    fn test_convert_symbols_qualifies_receivers() {
        let symbols = EngineSymbols {
            defs: vec![EngineDef {
                name: "Close".to_string(),
                kind: "method".to_string(),
                file: "store/db.go".to_string(),
                line: 40,
                is_exported: true,
                receiver: Some("Store".to_string()),
            }],
            refs: vec![],
            call_pairs: vec![],
        };
        let files = convert_symbols(Path::new(""), symbols);
        assert_eq!(files.len(), 1);
        let def = &files[0].defs[0];
        assert_eq!(def.qualified_name, "store.db.Store.Close");
        assert_eq!(def.kind, DefKind::Method);
        assert!(def.from_engine);
    }
}
