//! Integration Test: Separation of Concerns
//!
//! **Policy**:
//! - The layout engine is plain data: no locks, no async runtime.
//! - Balloons, widgets and the dispatcher run on the tick and never block:
//!   no `.await`, no sockets, no locks.
//! - Sockets belong to `transport/` and `pipeline.rs` only.

use architectural_enforcement::{find_patterns, report, workspace_path};

const TICK_SIDE: [&str; 4] = [
    "balloon/core/src/dispatcher.rs",
    "balloon/core/src/balloon.rs",
    "balloon/core/src/widgets.rs",
    "balloon/core/src/layout",
];

#[test]
fn test_layout_has_no_shared_state() {
    let violations = find_patterns(
        &workspace_path("balloon/core/src/layout"),
        &["Mutex", "RwLock", "Notify", "tokio"],
    );
    report("Synchronization found in the layout engine", &violations);
}

#[test]
fn test_tick_side_never_blocks() {
    let mut violations = Vec::new();
    for dir in TICK_SIDE {
        let path = workspace_path(dir);
        assert!(path.exists(), "missing source path {}", path.display());
        violations.extend(find_patterns(
            &path,
            &[".await", "std::net", "UnixStream", ".lock()", "thread::sleep"],
        ));
    }
    report("Blocking calls found on the dispatcher tick", &violations);
}

#[test]
fn test_sockets_stay_in_transport() {
    let violations: Vec<_> = find_patterns(
        &workspace_path("balloon/core/src"),
        &["UnixStream", "UnixListener", "TcpStream"],
    )
    .into_iter()
    .filter(|v| {
        let path = v.path.to_string_lossy();
        !path.contains("transport") && !path.ends_with("pipeline.rs")
    })
    .collect();
    report("Socket use outside the transport layer", &violations);
}
