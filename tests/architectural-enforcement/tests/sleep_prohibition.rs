//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code MUST NOT block a thread with
//! `std::thread::sleep`, and MUST NOT use sleeps as synchronization.
//! **Exceptions**: the files that own a timer (random event delay, simulated
//! clip length) may await `tokio::time::sleep`; periodic work uses
//! `tokio::time::interval`.

use architectural_enforcement::{production_lines, production_sources, SourceLine};

/// Files whose job is to wait for a duration
const TIMER_OWNERS: &[&str] = &[
    "workmate/core/src/scheduler.rs",
    "workmate/player/src/surface.rs",
];

fn violations_in(path: &str, lines: &[SourceLine<'_>]) -> Vec<String> {
    let mut violations = Vec::new();
    let timer_owner = TIMER_OWNERS.contains(&path);

    for line in lines {
        if line.code.contains("thread::sleep") {
            violations.push(format!(
                "{path}:{} - Thread sleep: {}",
                line.number, line.text
            ));
        } else if (line.code.contains("::sleep(") || line.code.contains(".sleep("))
            && !timer_owner
        {
            violations.push(format!(
                "{path}:{} - Sleep outside a timer owner: {}",
                line.number, line.text
            ));
        }
    }

    violations
}

/// Test that production code does not sleep
#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();
    for (path, content) in production_sources() {
        violations.extend(violations_in(&path, &production_lines(&content)));
    }

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nAcceptable: tokio::time::sleep in timer owners, tokio::time::interval.");

        panic!("Found {} sleep violation(s)", violations.len());
    }
}

#[test]
fn test_thread_sleep_always_flagged() {
    let content = "fn wait() {\n    std::thread::sleep(d);\n}\n";
    let violations = violations_in("workmate/core/src/scheduler.rs", &production_lines(content));
    assert_eq!(violations.len(), 1);
}

#[test]
fn test_timer_sleep_only_in_owners() {
    let content = "async fn wait() {\n    tokio::time::sleep(d).await;\n}\n";
    let lines = production_lines(content);
    assert!(violations_in("workmate/core/src/scheduler.rs", &lines).is_empty());
    assert_eq!(violations_in("workmate/core/src/engine.rs", &lines).len(), 1);
}
