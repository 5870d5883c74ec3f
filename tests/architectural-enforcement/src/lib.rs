//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code
//! - The layout engine and dispatcher stay synchronous and lock-free
//! - Only the transport and pipeline touch sockets
//!
//! Helpers here walk the balloon crates' sources and hand back production
//! lines only: comments are stripped and everything from the first
//! `#[cfg(test)]` onwards is ignored.

use std::fs;
use std::path::{Path, PathBuf};

/// One offending source line
#[derive(Debug, Clone)]
pub struct Violation {
    /// File containing the line
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// Trimmed line text
    pub line: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}",
            self.path.display(),
            self.line_number,
            self.line
        )
    }
}

/// Absolute path of a directory relative to the workspace root
pub fn workspace_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

/// Every `.rs` file under `dir`, or just `dir` when it is a file
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    if dir.is_file() {
        return vec![dir.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Production lines of a file as `(line_number, code)`
///
/// Line comments are cut off and the test module is skipped.
pub fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| {
            let code_part = line.split("//").next().unwrap_or(line);
            (idx + 1, code_part.to_string())
        })
        .collect()
}

/// Lines under `dir` whose code contains any of `patterns`
pub fn find_patterns(dir: &Path, patterns: &[&str]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for path in rust_files(dir) {
        for (line_number, code) in production_lines(&path) {
            if patterns.iter().any(|p| code.contains(p)) {
                violations.push(Violation {
                    path: path.clone(),
                    line_number,
                    line: code.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Print violations and fail
pub fn report(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s): {title}\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_skip_comments_and_tests() {
        let dir = std::env::temp_dir().join(format!("arch-enf-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(
            &file,
            "fn a() {} // thread::sleep(x)\nfn b() { x.lock(); }\n#[cfg(test)]\nmod tests { fn c() { y.lock(); } }\n",
        )
        .unwrap();

        let found = find_patterns(&dir, &[".lock()", "::sleep("]);
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line_number, 2);
    }
}
