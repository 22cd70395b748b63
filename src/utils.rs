use rustpython_ast::TextSize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between the session, the worker pool
/// and engine subprocesses.
///
/// Tripping the token stops discovery and drains workers at the next file
/// boundary; in-flight work on a single file is not interrupted.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Suppression markers recognized anywhere on a source line.
///
/// Matching is a plain substring test, so the markers work unchanged in
/// Python, TypeScript and Go comments.
const PRAGMA_MARKERS: [&str; 3] = ["pragma: no skylos", "pragma: no cover", "noqa"];

/// Maps byte offsets to 1-indexed line/column positions.
///
/// The Python parser reports byte offsets; findings are reported in lines
/// and columns.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-indexed line containing `offset`.
    pub fn line(&self, offset: TextSize) -> usize {
        let offset = offset.to_usize();
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// 1-indexed (line, column) of `offset`.
    pub fn line_col(&self, offset: TextSize) -> (usize, usize) {
        let line = self.line(offset);
        let col = offset.to_usize() - self.line_starts[line - 1] + 1;
        (line, col)
    }
}

/// Collects the 1-indexed lines carrying a suppression marker.
///
/// Definitions on these lines are forced to confidence 0 and findings on
/// them are dropped by the aggregator.
pub fn pragma_lines(source: &str) -> HashSet<usize> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| PRAGMA_MARKERS.iter().any(|m| line.contains(m)))
        .map(|(i, _)| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pragma_detection() {
        let source = r#"
def used_function():
    return 42

def unused_function():  # pragma: no skylos
    return "ignored"

class MyClass:  # noqa
    pass

x = compute()  # pragma: no cover
"#;
        let ignored = pragma_lines(source);

        assert!(ignored.contains(&5), "pragma: no skylos on line 5");
        assert!(ignored.contains(&8), "noqa on line 8");
        assert!(ignored.contains(&11), "pragma: no cover on line 11");
        assert_eq!(ignored.len(), 3);
    }

    #[test]
    fn test_noqa_with_rule_code() {
        let source = "import os  # noqa: F401\n";
        let ignored = pragma_lines(source);
        assert!(ignored.contains(&1));
    }

    #[test]
    fn test_no_pragmas() {
        let source = "def regular_function():\n    return 42\n";
        assert!(pragma_lines(source).is_empty());
    }

    #[test]
    fn test_line_col() {
        let source = "abc\ndef\n";
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(TextSize::new(0)), (1, 1));
        assert_eq!(index.line_col(TextSize::new(5)), (2, 2));
    }
}
