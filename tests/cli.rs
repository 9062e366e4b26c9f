#![allow(deprecated)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn unknown_task_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("storymap-build")
        .unwrap()
        .arg("uglify")
        .arg("--root")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tarea desconocida 'uglify'"));
}

#[test]
fn missing_package_json_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("storymap-build")
        .unwrap()
        .arg("--root")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("package.json"));
}
