use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn ccmirror_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ccmirror"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("CCMIRROR_REMOTE_PASSWORD");
    cmd
}

/// Config pointing at `<root>/{requests,results,logs}` and an unreachable remote.
fn write_config(root: &Path) -> PathBuf {
    let path = root.join("config.yaml");
    let body = format!(
        "requests_dir: {root}/requests\n\
         results_dir: {root}/results\n\
         logs_dir: {root}/logs\n\
         remote:\n  \
           url: http://127.0.0.1:1\n  \
           username: mirror-bot\n  \
           password: secret\n  \
           timeout_secs: 1\n",
        root = root.display()
    );
    fs::write(&path, body).expect("write config");
    path
}

#[test]
fn missing_config_file_exits_with_configuration_code() {
    let home = TempDir::new().expect("home");
    ccmirror_cmd(home.path())
        .arg("run")
        .assert()
        .code(1)
        .stderr(contains("config not found"));
}

#[test]
fn missing_password_exits_with_configuration_code() {
    let home = TempDir::new().expect("home");
    let config = home.path().join("config.yaml");
    fs::write(
        &config,
        "requests_dir: /tmp/r\nresults_dir: /tmp/o\nlogs_dir: /tmp/l\nremote:\n  url: http://x\n  username: bot\n",
    )
    .unwrap();

    ccmirror_cmd(home.path())
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(contains("remote.password"));
}

#[test]
fn missing_request_folder_exits_with_code_2() {
    let home = TempDir::new().expect("home");
    let config = write_config(home.path());

    ccmirror_cmd(home.path())
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2);
}

#[test]
fn nothing_to_process_succeeds_without_remote() {
    let home = TempDir::new().expect("home");
    let config = write_config(home.path());
    fs::create_dir_all(home.path().join("requests")).unwrap();

    ccmirror_cmd(home.path())
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("No request file to process."));
}

#[test]
fn unreachable_remote_exits_with_code_3_and_leaves_files() {
    let home = TempDir::new().expect("home");
    let config = write_config(home.path());
    let requests = home.path().join("requests");
    fs::create_dir_all(&requests).unwrap();
    fs::write(requests.join("batch.csv"), "h\nC;A1;G1;R1;bot;2024-03-01;active\n").unwrap();

    ccmirror_cmd(home.path())
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .assert()
        .code(3)
        .stdout(contains("\"remote_connect_failed\""));
    assert!(requests.join("batch.csv").exists());
}

#[test]
fn discover_lists_pending_files_only() {
    let home = TempDir::new().expect("home");
    let config = write_config(home.path());
    let requests = home.path().join("requests");
    fs::create_dir_all(requests.join("nested")).unwrap();
    fs::write(requests.join("a.csv"), "").unwrap();
    fs::write(requests.join("nested").join("b.csv"), "").unwrap();
    fs::write(requests.join("a_20240101000000_OK.csv"), "").unwrap();
    fs::write(requests.join("notes.txt"), "").unwrap();

    let assert = ccmirror_cmd(home.path())
        .arg("discover")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let listed: Vec<&str> = stdout.lines().collect();
    assert_eq!(listed.len(), 2, "stdout: {stdout}");
    assert!(listed[0].ends_with("a.csv"));
    assert!(listed[1].ends_with("b.csv"));
}
