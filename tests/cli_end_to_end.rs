#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn script_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write script");
    file
}

#[test]
fn client_render_prints_response() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/render-manim")
            .json_body_includes(r#"{"sceneName":"Demo"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"success":true,"videoUrl":"/manim_videos/abc_Demo.mp4","message":"Manim animation rendered successfully.","logs":""}"#);
    });

    let script = script_file("class Demo(Scene): pass");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scenecast-cli"));
    let assert = cmd
        .env("SCENECAST_SERVER_URL", server.base_url())
        .arg("render")
        .arg(script.path())
        .arg("--scene")
        .arg("Demo")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"videoUrl\": \"/manim_videos/abc_Demo.mp4\""));
    mock.assert();
}

#[test]
fn client_render_failure_exits_non_zero() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/api/render-manim");
        then.status(504)
            .header("content-type", "application/json")
            .body(r#"{"success":false,"message":"Manim rendering timed out after 180 seconds. Check logs.","logs":""}"#);
    });

    let script = script_file("class Demo(Scene): pass");
    Command::new(assert_cmd::cargo::cargo_bin!("scenecast-cli"))
        .env("SCENECAST_SERVER_URL", server.base_url())
        .arg("render")
        .arg(script.path())
        .assert()
        .failure()
        .stderr(contains("timed out"));
}

#[test]
fn client_render_failure_prints_renderer_logs() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/api/render-manim");
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"success":false,"message":"Manim script error or no scenes found. Check logs.","logs":"Stdout:\n\n\nStderr:\nSyntaxError: invalid syntax"}"#);
    });

    let script = script_file("class Demo(Scene:");
    Command::new(assert_cmd::cargo::cargo_bin!("scenecast-cli"))
        .env("SCENECAST_SERVER_URL", server.base_url())
        .arg("render")
        .arg(script.path())
        .assert()
        .failure()
        .stderr(contains("Stderr:\nSyntaxError: invalid syntax"));
}

#[test]
fn client_missing_server_fails_fast() {
    Command::new(assert_cmd::cargo::cargo_bin!("scenecast-cli"))
        .arg("health")
        .env_remove("SCENECAST_SERVER_URL")
        .assert()
        .failure()
        .stderr(contains("MissingServer"));
}

#[cfg(unix)]
mod local_render {
    use super::{Command, contains, script_file};
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn fake_renderer(dir: &TempDir) -> std::path::PathBuf {
        let program = dir.path().join("fake-manim");
        fs::write(
            &program,
            r#"#!/bin/sh
set -eu
stem=$(basename "$3" .py)
mkdir -p "$6/videos/$stem/480p15"
printf 'movie' > "$6/videos/$stem/480p15/$4.mp4"
echo "rendered $4"
"#,
        )
        .expect("write renderer");
        let mut perms = fs::metadata(&program).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&program, perms).expect("set perms");
        program
    }

    #[test]
    fn server_render_command_prints_json_result() {
        let dir = TempDir::new().expect("temp dir");
        let program = fake_renderer(&dir);
        let script = script_file("class Demo(Scene): pass");

        let assert = Command::new(assert_cmd::cargo::cargo_bin!("scenecast"))
            .current_dir(dir.path())
            .env_remove("SCENECAST_CONFIG_FILE")
            .arg("render")
            .arg("--render-program")
            .arg(&program)
            .arg("--render-temp-root")
            .arg(dir.path().join("renders"))
            .arg("--videos-directory")
            .arg(dir.path().join("public"))
            .arg("--scene")
            .arg("Demo")
            .arg(script.path())
            .assert()
            .success();

        let output = String::from_utf8_lossy(&assert.get_output().stdout);
        assert!(output.contains("\"success\": true"), "stdout: {output}");
        assert!(output.contains("_Demo.mp4"));
        let published = fs::read_dir(dir.path().join("public"))
            .expect("public dir")
            .count();
        assert_eq!(published, 1);
    }

    #[test]
    fn server_render_command_fails_on_empty_script() {
        let dir = TempDir::new().expect("temp dir");
        let program = fake_renderer(&dir);
        let script = script_file("   ");

        Command::new(assert_cmd::cargo::cargo_bin!("scenecast"))
            .current_dir(dir.path())
            .arg("render")
            .arg("--render-program")
            .arg(&program)
            .arg("--videos-directory")
            .arg(dir.path().join("public"))
            .arg(script.path())
            .assert()
            .failure()
            .stdout(contains("Invalid Manim code provided"));
    }
}
