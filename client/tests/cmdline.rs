use assert_cmd::Command;

fn cmd() -> Command {
    Command::cargo_bin("rawland").unwrap()
}

#[test]
fn help_and_version() {
    cmd().arg("--help").assert().success();
    cmd().arg("-V").assert().success();
}

#[test]
fn needs_runtime_dir() {
    let output = cmd()
        .env_remove("XDG_RUNTIME_DIR")
        .env_remove("WAYLAND_DISPLAY")
        .arg("--quiet")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("XDG_RUNTIME_DIR"), "stderr: {stderr}");
}

#[test]
fn missing_compositor_is_an_error() {
    let dir = std::env::temp_dir();
    cmd()
        .env("XDG_RUNTIME_DIR", &dir)
        .env("WAYLAND_DISPLAY", format!("rawland-nobody-{}", fastrand::u64(..)))
        .arg("-q")
        .assert()
        .failure();
}

#[test]
fn size_must_be_positive() {
    cmd().args(["--width", "0"]).assert().failure();
    cmd().env("RAWLAND_HEIGHT", "-3").assert().failure();
    cmd().args(["--height", "16385"]).assert().failure();
}
