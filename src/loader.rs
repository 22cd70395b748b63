use crate::error::AnalyzerError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Directory names never descended into, regardless of configuration.
const DEFAULT_EXCLUDED_DIRS: [&str; 10] = [
    ".git",
    "venv",
    ".venv",
    "build",
    "dist",
    "__pycache__",
    "node_modules",
    "vendor",
    "testdata",
    ".github",
];

lazy_static! {
    // A `tests/` or `test/` path segment marks the file as test code even
    // when the basename itself looks ordinary.
    static ref TEST_DIR_RE: Regex = Regex::new(r"(?:^|[/\\])tests?[/\\]").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Go,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Language> {
        match path.extension()?.to_str()? {
            "py" => Some(Language::Python),
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" => Some(Language::JavaScript),
            "go" => Some(Language::Go),
            _ => None,
        }
    }
}

/// One discovered source file with its metadata. Immutable after load.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    /// Dotted module path relative to the walked root:
    /// `pkg/sub.py` -> `pkg.sub`, `pkg/__init__.py` -> `pkg`.
    pub module_name: String,
    pub is_test: bool,
    pub source: String,
}

/// Discovers analyzable files under `roots`.
///
/// A non-existent root is fatal. Unreadable files are skipped with a
/// warning. `exclude_globs` are user-supplied patterns on top of the
/// default directory exclusions.
pub fn discover(
    roots: &[PathBuf],
    exclude_globs: &[String],
) -> Result<Vec<SourceFile>, AnalyzerError> {
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            return Err(AnalyzerError::config(format!(
                "root does not exist: {}",
                root.display()
            )));
        }
        let excludes = build_excludes(root, exclude_globs)?;
        walk_root(root, &excludes, &mut files);
    }
    Ok(files)
}

/// User exclusion globs, interpreted with gitignore semantics relative to
/// the walked root.
fn build_excludes(root: &Path, exclude_globs: &[String]) -> Result<Gitignore, AnalyzerError> {
    let mut builder = GitignoreBuilder::new(root);
    for glob in exclude_globs {
        builder
            .add_line(None, glob)
            .map_err(|e| AnalyzerError::config(format!("bad exclude pattern {glob:?}: {e}")))?;
    }
    builder
        .build()
        .map_err(|e| AnalyzerError::config(format!("bad exclude patterns: {e}")))
}

fn walk_root(root: &Path, excludes: &Gitignore, files: &mut Vec<SourceFile>) {
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            if name.starts_with('.') || DEFAULT_EXCLUDED_DIRS.contains(&name.as_ref()) {
                return false;
            }
        }
        !excludes
            .matched(entry.path(), entry.file_type().is_dir())
            .is_ignore()
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(language) = Language::from_path(path) else {
            continue;
        };
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        files.push(SourceFile {
            path: path.to_path_buf(),
            language,
            module_name: module_name(root, path),
            is_test: is_test_file(path),
            source,
        });
    }
}

/// Basename conventions: `test_*.py`, `foo_test.go`, plus anything under a
/// `tests/` directory.
pub fn is_test_file(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || TEST_DIR_RE.is_match(&path.to_string_lossy())
}

/// Dotted module path of `path` relative to `root`. `__init__.py` collapses
/// to its package; a bare top-level `__init__.py` takes the root's name.
pub fn module_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.last().map(String::as_str) == Some("__init__") {
        parts.pop();
    }
    if parts.is_empty() {
        // Either the root is the file itself, or a top-level __init__.py.
        let fallback = if relative.as_os_str().is_empty() {
            path.file_stem()
        } else {
            root.file_name()
        };
        return fallback
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
    }
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_nested() {
        let root = Path::new("/repo");
        assert_eq!(module_name(root, Path::new("/repo/pkg/sub.py")), "pkg.sub");
        assert_eq!(module_name(root, Path::new("/repo/pkg/__init__.py")), "pkg");
        assert_eq!(module_name(root, Path::new("/repo/code.py")), "code");
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(Path::new("test_loader.py")));
        assert!(is_test_file(Path::new("loader_test.go")));
        assert!(is_test_file(Path::new("pkg/tests/helpers.py")));
        assert!(!is_test_file(Path::new("loader.py")));
        assert!(!is_test_file(Path::new("contest.py")));
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("a.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("a.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("a.jsx")), Some(Language::JavaScript));
        assert_eq!(Language::from_path(Path::new("a.go")), Some(Language::Go));
        assert_eq!(Language::from_path(Path::new("a.rs")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }
}
