//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in the engine and player MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::io`, not `std::fs` or `std::io::stdin()`.
//!
//! Blocking calls in plain functions are acceptable. Config loading reads
//! the file with `std::fs`, so the player loads it before the runtime
//! starts and async code never calls the loaders.

use architectural_enforcement::{production_lines, production_sources, FnKind, SourceLine};

const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    ("block_on(", "Nested runtime block_on"),
    ("load_config(", "Blocking config load"),
    ("load_config_from_path(", "Blocking config load"),
    ("load_config_with_env(", "Blocking config load"),
];

fn violations_in(path: &str, lines: &[SourceLine<'_>]) -> Vec<String> {
    let mut violations = Vec::new();

    for line in lines {
        if line.enclosing != Some(FnKind::Async) {
            continue;
        }
        for (pattern, what) in BLOCKING_CALLS {
            if line.code.contains(pattern) {
                violations.push(format!("{path}:{} - {what}: {}", line.number, line.text));
            }
        }
    }

    violations
}

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();
    for (path, content) in production_sources() {
        violations.extend(violations_in(&path, &production_lines(&content)));
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O calls found in async code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs / tokio::io instead, or move the call before the runtime.");

        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}

#[test]
fn test_detects_blocking_read_in_async_fn() {
    let content = "async fn load() {\n    let s = std::fs::read_to_string(\"a\");\n}\n";
    let violations = violations_in("x.rs", &production_lines(content));
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("x.rs:2"));
}

#[test]
fn test_allows_blocking_read_in_sync_fn() {
    let content = "pub fn load() {\n    let s = std::fs::read_to_string(\"a\");\n}\n";
    assert!(violations_in("x.rs", &production_lines(content)).is_empty());
}

#[test]
fn test_ignores_test_modules() {
    let content = "#[cfg(test)]\nmod tests {\n    async fn t() {\n        std::fs::write(\"a\", b\"\");\n    }\n}\n";
    assert!(violations_in("x.rs", &production_lines(content)).is_empty());
}

#[test]
fn test_detects_config_load_in_async_fn() {
    let content = "async fn run() {\n    let c = load_config_from_path(None)?;\n}\n";
    let violations = violations_in("x.rs", &production_lines(content));
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("Blocking config load"));
}

#[test]
fn test_player_loads_config_outside_async_code() {
    let (_, main) = production_sources()
        .into_iter()
        .find(|(path, _)| path == "workmate/player/src/main.rs")
        .expect("player main.rs not found");

    let loads: Vec<_> = production_lines(&main)
        .into_iter()
        .filter(|line| line.code.contains("load_config_from_path("))
        .collect();

    assert!(!loads.is_empty(), "player no longer loads its config");
    assert!(loads.iter().all(|line| line.enclosing == Some(FnKind::Sync)));
}
