use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_magpie"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "magpie init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".magpie.toml");
    assert!(config_path.exists(), ".magpie.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[standards]"));
    assert!(content.contains("[review]"));

    // Verify it's valid TOML that magpie-core can parse
    let _config: magpie_core::MagpieConfig = toml::from_str(&content).unwrap();
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".magpie.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_magpie"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
}
