//! Integration tests for `npmgraph version`.

use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "npmgraph-cli", "--bin", "npmgraph", "--"]);
    cmd
}

#[test]
fn test_version_output() {
    let output = cargo_bin()
        .arg("version")
        .output()
        .expect("Failed to run version command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("npmgraph "), "stdout: {stdout}");
}

#[test]
fn test_download_refuses_existing_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("all_docs.json"), "{}").unwrap();

    let output = cargo_bin()
        .arg("--cwd")
        .arg(dir.path())
        .args(["download", "--url", "http://127.0.0.1:9/_all_docs"])
        .env_remove("NPMGRAPH_DATA_DIR")
        .output()
        .expect("Failed to run download command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--force"), "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(data.join("all_docs.json")).unwrap(), "{}");
}
