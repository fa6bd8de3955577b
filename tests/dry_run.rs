use std::process::Command;

fn magpie() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_magpie"));
    // Keep host CI environment from leaking into the assertions
    cmd.env_remove("AGENT_TYPE")
        .env_remove("MODEL_NAME")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_REF");
    cmd
}

#[test]
fn dry_run_assembles_standards_sections() {
    let dir = tempfile::tempdir().unwrap();
    let standards = dir.path().join("standards");
    std::fs::create_dir(&standards).unwrap();
    std::fs::write(standards.join("global.md"), "No TODOs in merged code.").unwrap();
    std::fs::write(standards.join("python.md"), "Type-hint public functions.").unwrap();
    std::fs::write(standards.join("style.md"), "Use CSS variables.").unwrap();

    let patch = dir.path().join("changes.patch");
    std::fs::write(&patch, "+++ b/src/app.py\n+++ b/src/app.css\n").unwrap();

    let output = magpie()
        .args(["run", "--dry-run", "--repo", "octocat/hello-world", "--pr", "7"])
        .arg("--diff-file")
        .arg(&patch)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "dry run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    // Reviewer role text plus global and both extension sections
    assert!(stdout.contains("Lead Developer"));
    assert!(stdout.contains("--- GLOBAL STANDARDS ---"));
    assert!(stdout.contains("--- SPECIFIC STANDARDS (PY) ---"));
    assert!(stdout.contains("--- SPECIFIC STANDARDS (CSS) ---"));
    // The diff is interpolated into the user message verbatim
    assert!(stdout.contains("+++ b/src/app.py"));
}

#[test]
fn dry_run_without_standards_store_still_assembles() {
    let dir = tempfile::tempdir().unwrap();
    let patch = dir.path().join("changes.patch");
    std::fs::write(&patch, "just some text, no diff markers\n").unwrap();

    let output = magpie()
        .args(["run", "--dry-run", "--repo", "octocat/hello-world", "--pr", "7"])
        .args(["--agent", "documenter"])
        .arg("--diff-file")
        .arg(&patch)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "dry run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Technical Writer"));
    assert!(stdout.contains("GUIDELINES AND STANDARDS:"));
    assert!(!stdout.contains("--- GLOBAL STANDARDS ---"));
}

#[test]
fn unknown_agent_fails_before_any_network_use() {
    let dir = tempfile::tempdir().unwrap();
    let patch = dir.path().join("changes.patch");
    std::fs::write(&patch, "+++ b/src/app.py\n").unwrap();

    let output = magpie()
        .args(["run", "--dry-run", "--repo", "octocat/hello-world", "--pr", "7"])
        .args(["--agent", "poet"])
        .arg("--diff-file")
        .arg(&patch)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("poet"));
}
