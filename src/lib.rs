// Library root: exposes the analyzer modules for the CLI and for tests.

/// The per-invocation session: parallel file pipeline, join, resolve,
/// score, aggregate.
pub mod analyzer;

/// Dead-confidence scoring of unresolved definitions.
pub mod confidence;

/// External language engines (the `skylos-go` subprocess contract).
pub mod engine;

/// `if __name__ == "__main__"` entry-point detection.
pub mod entry_point;

/// Typed error kinds and their fatality contract.
pub mod error;

/// Framework decorator and dunder tables.
pub mod framework;

/// File discovery, language detection, module naming.
pub mod loader;

/// Findings and the output document.
pub mod report;

/// Cross-module reference resolution and the root set.
pub mod resolver;

/// Rule detectors: secrets, danger, logic, quality, perf.
pub mod rules;

/// Definitions, references, call pairs, the arena symbol table.
pub mod symbols;

/// Test-convention awareness.
pub mod test_aware;

/// TypeScript/JavaScript symbol collection via swc.
pub mod ts;

/// Line index, pragma scanner, cancellation token.
pub mod utils;

/// The Python AST symbol collector.
pub mod visitor;
