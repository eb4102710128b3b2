//! Architectural Enforcement Integration Tests
//!
//! Source scanners shared by the tests in `tests/`. They enforce:
//! - No blocking I/O inside async code
//! - No thread sleeps, and timer sleeps only where a timer is the point
//!
//! The scanners are line based. Everything from the first `#[cfg(test)]`
//! line of a file onwards is treated as test code and skipped, matching the
//! crate convention of a trailing `mod tests`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source roots, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["workmate/core/src", "workmate/player/src"];

/// Files that are test support even though they live under `src/`
pub const TEST_SUPPORT_FILES: &[&str] = &["workmate/core/src/test_utils.rs"];

/// Kind of function a line sits in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// Plain function (runs before or outside the async runtime)
    Sync,
    /// `async fn`
    Async,
}

/// One production line of a source file
#[derive(Debug)]
pub struct SourceLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// Line with any trailing `//` comment removed
    pub code: &'a str,
    /// Raw line, trimmed
    pub text: &'a str,
    /// Function the line belongs to, if one was found
    pub enclosing: Option<FnKind>,
}

/// Workspace root, independent of the directory tests run from
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every production `.rs` file, as (path relative to the root, contents)
///
/// # Panics
///
/// Panics if a production directory is missing, so a moved crate cannot make
/// the checks pass vacuously.
pub fn production_sources() -> Vec<(String, String)> {
    let root = workspace_root();
    let mut sources = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.is_dir(), "production directory {dir} not found");

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if TEST_SUPPORT_FILES.contains(&relative.as_str()) {
                continue;
            }
            if let Ok(content) = fs::read_to_string(entry.path()) {
                sources.push((relative, content));
            }
        }
    }

    sources.sort();
    sources
}

/// Production lines of a file: comments stripped, test code skipped
pub fn production_lines(content: &str) -> Vec<SourceLine<'_>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let text = line.trim();
        if text.starts_with("#[cfg(test)]") {
            break;
        }
        if text.starts_with("//") {
            continue;
        }

        out.push(SourceLine {
            number: idx + 1,
            code: strip_comment(line),
            text,
            enclosing: enclosing_fn(&lines, idx),
        });
    }

    out
}

/// Remove a trailing `//` comment
pub fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a trimmed line starts a function signature
pub fn fn_signature(line: &str) -> Option<FnKind> {
    let mut rest = line;
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

/// Find the nearest function signature at or above `idx`
pub fn enclosing_fn(lines: &[&str], idx: usize) -> Option<FnKind> {
    (0..=idx).rev().find_map(|i| fn_signature(lines[i].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature_detection() {
        assert_eq!(fn_signature("fn main() {"), Some(FnKind::Sync));
        assert_eq!(fn_signature("pub fn load() -> Result<()> {"), Some(FnKind::Sync));
        assert_eq!(fn_signature("pub async fn run(&self) {"), Some(FnKind::Async));
        assert_eq!(fn_signature("pub(crate) async fn go() {"), Some(FnKind::Async));
        assert_eq!(fn_signature("let f = fnord;"), None);
    }

    #[test]
    fn test_enclosing_function() {
        let code = [
            "fn sync_part() {",
            "    read();",
            "}",
            "async fn async_part() {",
            "    read();",
            "}",
        ];
        assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Sync));
        assert_eq!(enclosing_fn(&code, 4), Some(FnKind::Async));
    }

    #[test]
    fn test_test_module_skipped() {
        let content = "fn a() {}\n// note\n#[cfg(test)]\nmod tests {\n    fn b() {}\n}\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "fn a() {}");
    }

    #[test]
    fn test_sources_found() {
        let sources = production_sources();
        assert!(sources
            .iter()
            .any(|(path, _)| path == "workmate/core/src/engine.rs"));
        assert!(sources
            .iter()
            .all(|(path, _)| path != "workmate/core/src/test_utils.rs"));
    }
}
