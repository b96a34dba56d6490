use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn dockerfile() -> String {
    fs::read_to_string(workspace_root().join("Dockerfile")).expect("read Dockerfile")
}

fn copy_sources(line: &str) -> Option<Vec<String>> {
    let rest = line.trim().strip_prefix("COPY ")?;
    if rest.contains("--from=") {
        return None;
    }
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    Some(tokens[..tokens.len() - 1].iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_build_uses_committed_lockfile() {
    let content = dockerfile();
    let sources: Vec<String> = content.lines().filter_map(copy_sources).flatten().collect();
    assert!(sources.iter().any(|s| s == "Cargo.toml"));
    assert!(sources.iter().any(|s| s == "Cargo.lock"));

    let build = content
        .lines()
        .find(|line| line.contains("cargo build"))
        .expect("cargo build step");
    assert!(build.contains("--locked"), "unlocked build: {}", build);
}

#[test]
fn test_copy_sources_exist() {
    let root = workspace_root();
    let missing: Vec<String> = dockerfile()
        .lines()
        .filter_map(copy_sources)
        .flatten()
        .filter(|src| !root.join(Path::new(src)).exists())
        .collect();
    assert!(missing.is_empty(), "missing COPY sources: {:?}", missing);
}

#[test]
fn test_runtime_serves_port_3000() {
    let content = dockerfile();
    assert!(content.lines().any(|line| line.trim() == "EXPOSE 3000"));
    assert!(content.contains(r#"CMD ["history-collector", "run"]"#));
}
