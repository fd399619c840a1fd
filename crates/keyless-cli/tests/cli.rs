//! Runs the built binary on inputs rejected before any network access

use std::process::Command;
use tempfile::TempDir;

fn keyless() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_keyless"));
    command.env_remove("KEYLESS_IDENTITY_TOKEN");
    command
}

#[test]
fn test_rejects_unsupported_file_type() {
    let dir = TempDir::new().unwrap();
    let artifact = dir.path().join("image.png");
    std::fs::write(&artifact, b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR").unwrap();
    let sig_out = dir.path().join("artifact.sig");

    let output = keyless()
        .args(["sign", "--artifact"])
        .arg(&artifact)
        .arg("--sig-out")
        .arg(&sig_out)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("file type currently not supported: image/png"), "{}", stderr);
    assert!(!sig_out.exists());
}

#[test]
fn test_missing_artifact() {
    let dir = TempDir::new().unwrap();
    let output = keyless()
        .args(["sign", "--artifact"])
        .arg(dir.path().join("absent"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("reading"));
}
