use crate::confidence;
use crate::engine::{self, Engine, GoEngine};
use crate::entry_point;
use crate::error::AnalyzerError;
use crate::loader::{self, Language, SourceFile};
use crate::report::{self, AnalysisResult};
use crate::resolver::Resolver;
use crate::rules::danger::DangerVisitor;
use crate::rules::logic::LogicVisitor;
use crate::rules::perf::PerfVisitor;
use crate::rules::quality::QualityVisitor;
use crate::rules::secrets;
use crate::rules::Finding;
use crate::symbols::{DefKind, FileSymbols, Reference, SymbolTable};
use crate::ts;
use crate::utils::{self, CancelToken, LineIndex};
use crate::visitor::SymbolCollector;
use rayon::prelude::*;
use rustpython_parser::{parse, Mode};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::warn;

/// Analyzer configuration, one per session.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Dead-code verdicts below this confidence are filtered out.
    pub confidence_threshold: u8,
    pub dead_code: bool,
    pub secrets: bool,
    pub danger: bool,
    pub quality: bool,
    /// When set, references made from test files keep non-test symbols
    /// alive.
    pub include_tests: bool,
    /// Extra exclusion globs on top of the default directory exclusions.
    pub exclude: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 80,
            dead_code: true,
            secrets: false,
            danger: false,
            quality: false,
            include_tests: false,
            exclude: Vec::new(),
        }
    }
}

/// Everything one worker produces for one file.
struct FileOutput {
    symbols: Option<FileSymbols>,
    findings: Vec<Finding>,
    file: PathBuf,
    ignored: HashSet<usize>,
}

/// One analysis session: configuration, file set, symbol table and
/// cancellation, created per invocation and discarded.
///
/// The run has two phases. File discovery, parsing, symbol collection and
/// rule detection fan out over a rayon pool, each worker filling its own
/// [`FileSymbols`] slot. After the join the merged table is frozen and
/// resolution, scoring and aggregation run single-threaded on it.
pub struct Skylos {
    config: AnalyzerConfig,
    cancel: CancelToken,
}

impl Skylos {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Token shared with callers that need to abort the run. Workers stop
    /// at the next file boundary; engine children are killed.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn analyze(&self, roots: &[PathBuf]) -> Result<AnalysisResult, AnalyzerError> {
        let files = loader::discover(roots, &self.config.exclude)?;
        let total_files = files.len();

        let outputs: Vec<FileOutput> = files
            .par_iter()
            .map(|file| self.process_file(file))
            .collect();

        let mut file_symbols = Vec::new();
        let mut findings = Vec::new();
        let mut ignored_lines: HashMap<PathBuf, HashSet<usize>> = HashMap::new();
        for output in outputs {
            if let Some(symbols) = output.symbols {
                file_symbols.push(symbols);
            }
            findings.extend(output.findings);
            if !output.ignored.is_empty() {
                ignored_lines.insert(output.file, output.ignored);
            }
        }

        self.run_go_engine(roots, &files, &mut findings, &mut file_symbols);

        let mut table = SymbolTable::build(file_symbols);
        let resolution = Resolver::new(&table, self.config.include_tests).resolve();
        confidence::score_definitions(&mut table, &ignored_lines);

        let dead_candidates = if self.config.dead_code {
            table
                .defs
                .iter()
                .enumerate()
                .filter(|(id, def)| !resolution.used.contains(id) && is_reportable(def.kind))
                .map(|(_, def)| def)
                .collect()
        } else {
            Vec::new()
        };

        Ok(report::finalize(
            self.config.confidence_threshold,
            total_files,
            &ignored_lines,
            findings,
            dead_candidates,
        ))
    }

    fn process_file(&self, file: &SourceFile) -> FileOutput {
        let mut output = FileOutput {
            symbols: None,
            findings: Vec::new(),
            file: file.path.clone(),
            ignored: utils::pragma_lines(&file.source),
        };
        if self.cancel.is_cancelled() {
            return output;
        }

        // The secret scan is line-based and runs for every language, parse
        // success or not.
        if self.config.secrets {
            output
                .findings
                .extend(secrets::scan_secrets(&file.source, &file.path));
        }

        match file.language {
            Language::Python => self.process_python(file, &mut output),
            Language::TypeScript | Language::JavaScript => match ts::collect_ts(file) {
                Ok(symbols) => output.symbols = Some(symbols),
                Err(e) => warn!(file = %file.path.display(), error = %e, "parse failed"),
            },
            // Go files are analyzed by the external engine after the join.
            Language::Go => {}
        }
        output
    }

    fn process_python(&self, file: &SourceFile, output: &mut FileOutput) {
        let line_index = LineIndex::new(&file.source);
        let parsed = match parse(&file.source, Mode::Module, &file.path.to_string_lossy()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "parse failed");
                return;
            }
        };
        let rustpython_ast::Mod::Module(module) = &parsed else {
            return;
        };

        let entry_calls = entry_point::main_guard_calls(&module.body);
        let collector = SymbolCollector::new(
            file.path.clone(),
            file.module_name.clone(),
            file.is_test,
            &line_index,
        );
        let mut symbols = collector.collect(&module.body);

        // Calls made from the main guard keep their targets alive, both by
        // simple and by module-qualified name.
        for call in entry_calls {
            let mut names = vec![call.clone()];
            if !file.module_name.is_empty() {
                names.push(format!("{}.{}", file.module_name, call));
            }
            for name in names {
                symbols.refs.push(Reference {
                    name,
                    module: file.module_name.clone(),
                    file: file.path.clone(),
                    line: 0,
                    from_test_file: file.is_test,
                });
            }
        }
        output.symbols = Some(symbols);

        if self.config.danger {
            let mut visitor = DangerVisitor::new(file.path.clone(), &line_index);
            for stmt in &module.body {
                visitor.visit_stmt(stmt);
            }
            output.findings.extend(visitor.findings);
        }
        if self.config.quality {
            let mut quality = QualityVisitor::new(file.path.clone(), &line_index);
            let mut logic = LogicVisitor::new(file.path.clone(), &line_index);
            let mut perf = PerfVisitor::new(file.path.clone(), &line_index);
            for stmt in &module.body {
                quality.visit_stmt(stmt);
                logic.visit_stmt(stmt);
                perf.visit_stmt(stmt);
            }
            output.findings.extend(quality.findings);
            output.findings.extend(logic.findings);
            output.findings.extend(perf.findings);
        }
    }

    /// Runs `skylos-go` once per root that contains Go files. Engine
    /// failure drops the language from the run with a warning; it never
    /// aborts.
    fn run_go_engine(
        &self,
        roots: &[PathBuf],
        files: &[SourceFile],
        findings: &mut Vec<Finding>,
        file_symbols: &mut Vec<FileSymbols>,
    ) {
        let go_roots: Vec<&PathBuf> = roots
            .iter()
            .filter(|root| {
                files
                    .iter()
                    .any(|f| f.language == Language::Go && f.path.starts_with(root))
            })
            .collect();
        if go_roots.is_empty() || self.cancel.is_cancelled() {
            return;
        }

        let go = GoEngine::new(env!("CARGO_PKG_VERSION"));
        for root in go_roots {
            match go.analyze(root, &self.cancel) {
                Ok(engine_report) => {
                    findings.extend(
                        engine_report
                            .findings
                            .into_iter()
                            .map(engine::convert_finding),
                    );
                    file_symbols.extend(engine::convert_symbols(root, engine_report.symbols));
                }
                Err(e) => {
                    warn!(engine = go.name(), root = %root.display(), error = %e,
                        "go analysis skipped");
                }
            }
        }
    }
}

fn is_reportable(kind: DefKind) -> bool {
    !matches!(kind, DefKind::Parameter)
}
