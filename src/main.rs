use clap::Parser;
use colored::Colorize;
use skylos::analyzer::{AnalyzerConfig, Skylos};
use skylos::report::AnalysisResult;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line surface. Exit codes: 0 when nothing is reported, 1 when
/// findings are present, 2 on usage or internal errors (clap's own usage
/// errors already exit with 2).
#[derive(Parser)]
#[command(name = "skylos", version, about = "Dead code and dangerous pattern analyzer")]
struct Cli {
    /// Root directories to analyze.
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Confidence threshold for dead-code verdicts (0-100).
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    confidence: u8,

    /// Emit the JSON document instead of the human report.
    #[arg(long)]
    json: bool,

    /// Scan for hardcoded secrets.
    #[arg(long)]
    secrets: bool,

    /// Scan for dangerous patterns.
    #[arg(long)]
    danger: bool,

    /// Scan for quality, logic and performance issues.
    #[arg(long)]
    quality: bool,

    /// Report dead code (default).
    #[arg(long = "dead-code", overrides_with = "no_dead_code")]
    dead_code: bool,

    /// Skip dead-code analysis.
    #[arg(long = "no-dead-code")]
    no_dead_code: bool,

    /// Exclusion globs applied on top of the default directory exclusions.
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Let references from test files keep non-test symbols alive.
    #[arg(long = "include-tests")]
    include_tests: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AnalyzerConfig {
        confidence_threshold: cli.confidence,
        dead_code: cli.dead_code || !cli.no_dead_code,
        secrets: cli.secrets,
        danger: cli.danger,
        quality: cli.quality,
        include_tests: cli.include_tests,
        exclude: cli.exclude.clone(),
    };

    let skylos = Skylos::new(config);
    let result = match skylos.analyze(&cli.roots) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("skylos: {e}");
            return ExitCode::from(2);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("skylos: {e}");
                return ExitCode::from(2);
            }
        }
    } else {
        print_report(&result);
    }

    if result.has_findings() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_report(result: &AnalysisResult) {
    println!("{}", "Skylos Analysis Results".bold());
    println!("=======================\n");

    println!(
        "Scanned {} files: {} dead symbols, {} findings",
        result.analysis_summary.total_files,
        result.analysis_summary.dead_symbol_count,
        result.analysis_summary.finding_count,
    );

    if !result.dead_symbols.is_empty() {
        println!("\n{}", "Dead Code".bold());
        println!("---------");
        for (i, dead) in result.dead_symbols.iter().enumerate() {
            println!(
                " {}. {} ({})",
                i + 1,
                dead.qualified_name,
                dead.kind.as_str()
            );
            println!(
                "    └─ {}:{} (confidence {})",
                dead.file.display(),
                dead.line,
                dead.confidence
            );
        }
    }

    if !result.findings.is_empty() {
        println!("\n{}", "Findings".bold());
        println!("--------");
        for (i, finding) in result.findings.iter().enumerate() {
            let severity = match finding.severity {
                skylos::rules::Severity::Critical => finding.severity.as_str().red().bold(),
                skylos::rules::Severity::High => finding.severity.as_str().red(),
                skylos::rules::Severity::Medium => finding.severity.as_str().yellow(),
                _ => finding.severity.as_str().normal(),
            };
            println!(
                " {}. [{}] {} {} ({}:{})",
                i + 1,
                finding.rule_id,
                severity,
                finding.message,
                finding.file.display(),
                finding.line,
            );
        }
    }
}
