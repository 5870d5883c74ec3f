//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the balloon crates MUST NOT call sleep
//! methods. The dispatcher is paced by `tokio::time::interval`, the pipeline
//! wakes on queued batches, and the receiver wakes on input.
//! **Exceptions**: test code

use architectural_enforcement::{find_patterns, report, workspace_path};

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();
    for dir in ["balloon/core/src", "balloon/daemon/src"] {
        let path = workspace_path(dir);
        assert!(path.exists(), "missing source directory {}", path.display());
        violations.extend(find_patterns(&path, &["::sleep(", ".sleep("]));
    }

    if !violations.is_empty() {
        eprintln!("\n✅ ACCEPTABLE waiting:");
        eprintln!("  - tokio::time::interval() for the dispatcher tick");
        eprintln!("  - Notify wake-ups on the shared context");
        eprintln!("  - Test code (#[cfg(test)] modules)");
    }
    report("Sleep calls found in production code", &violations);
}
