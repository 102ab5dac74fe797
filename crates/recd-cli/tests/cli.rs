use assert_cmd::Command;

fn recd() -> Command {
    Command::cargo_bin("recd").unwrap()
}

#[test]
fn help_lists_subcommands() {
    let out = recd().arg("--help").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("stream"));
    assert!(text.contains("listen"));
}

#[test]
fn stream_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.webm");
    let out = recd()
        .args(["stream", missing.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to open"));
}

#[test]
fn stream_rejects_non_websocket_url() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("clip.webm");
    std::fs::write(&src, b"\x1a\x45\xdf\xa3").unwrap();
    let out = recd()
        .args(["--url", "http://127.0.0.1:1", "stream", src.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unsupported URL scheme"));
}
