use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

fn sources(dir: &str) -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join(dir);
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn relative(path: &Path) -> String {
    path.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Lines above the first `#[cfg(test)]`, i.e. the code that ships.
fn shipped_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
}

fn assert_clean(rule: &str, violations: Vec<String>) {
    assert!(
        violations.is_empty(),
        "{rule}. Found in:\n{}",
        violations.join("\n")
    );
}

#[test]
fn tests_are_never_ignored() {
    let mut violations = Vec::new();
    for path in sources("src").into_iter().chain(sources("tests")) {
        if path.ends_with("source_hygiene.rs") {
            continue;
        }
        let contents = fs::read_to_string(&path).unwrap();
        for (idx, line) in contents.lines().enumerate() {
            if line.contains("#[ignore") {
                violations.push(format!("{}:{}", relative(&path), idx + 1));
            }
        }
    }
    assert_clean("#[ignore] is not allowed", violations);
}

#[test]
fn shipped_library_code_does_not_panic_on_errors() {
    let pattern = Regex::new(r"\.(unwrap|expect)\(").unwrap();
    let mut violations = Vec::new();
    for path in sources("src") {
        let contents = fs::read_to_string(&path).unwrap();
        for (idx, line) in shipped_lines(&contents) {
            if pattern.is_match(line) {
                violations.push(format!("{}:{}: {}", relative(&path), idx + 1, line.trim()));
            }
        }
    }
    assert_clean("propagate errors instead of unwrap/expect", violations);
}

#[test]
fn async_code_never_blocks_the_runtime_with_thread_sleep() {
    let pattern = Regex::new(r"\b(std::)?thread::sleep\b").unwrap();
    let mut violations = Vec::new();
    for path in sources("src") {
        let contents = fs::read_to_string(&path).unwrap();
        for (idx, line) in contents.lines().enumerate() {
            if pattern.is_match(line) {
                violations.push(format!("{}:{}", relative(&path), idx + 1));
            }
        }
    }
    assert_clean("use tokio::time::sleep in async code", violations);
}
