use std::path::PathBuf;
use thiserror::Error;

/// Error kinds surfaced by the analyzer.
///
/// Only `Config` is fatal (exit code 2). `Parse` and `Engine` are downgraded
/// to warnings at the call site: the affected file or language contributes
/// nothing to the symbol table and the run continues.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Bad root path or flag combination.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A single file failed to parse.
    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    /// An external language engine failed or returned malformed output.
    #[error("engine error: {message}")]
    Engine { message: String },
}

impl AnalyzerError {
    pub fn config(message: impl Into<String>) -> Self {
        AnalyzerError::Config {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        AnalyzerError::Engine {
            message: message.into(),
        }
    }
}
