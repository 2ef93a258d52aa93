//! CLI tests that need no interpreter.

mod common;

use common::TestProject;
use predicates::prelude::*;

#[test]
fn help_lists_the_commands() {
    let project = TestProject::new();
    project
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("ci"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn missing_toolchain_exits_10_before_touching_disk() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["build", "--no-pause"])
        .env("AVITO_BUILD_PYTHON", "no-such-python-5120")
        .assert()
        .code(10)
        .stderr(predicate::str::contains("BUILD FAILED at step 1"))
        .stderr(predicate::str::contains(
            "Python toolchain not found (tried: no-such-python-5120)",
        ))
        .stdout(predicate::str::contains("AVITO_BUILD_PYTHON"));

    assert!(!project.path("venv").exists());
    assert!(!project.path("dist/App").exists());
    assert_eq!(
        project.report()["outcome"]["stage"],
        serde_json::json!("provision")
    );
}

#[test]
fn missing_entry_script_is_an_input_error() {
    let project = TestProject::new();
    std::fs::remove_file(project.path("main.py")).expect("remove entry");

    project
        .cmd()
        .args(["build", "--no-pause"])
        .env("AVITO_BUILD_PYTHON", "no-such-python-5120")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("entry script not found"));
}

#[test]
fn descriptor_for_another_bundle_is_rejected() {
    let project = TestProject::new();
    project.write("release.toml", "app_name = \"Other\"\ndescriptor = \"App.spec\"\n");

    project
        .cmd()
        .args(["build", "--no-pause"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("produces 'App' but app_name is 'Other'"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let project = TestProject::new();
    project.write("release.toml", "app_name = \"App\"\nretries = 3\n");

    project
        .cmd()
        .args(["build", "--no-pause"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("release.toml"));
}

#[test]
fn russian_banner_on_request() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["build", "--no-pause", "--lang", "ru"])
        .env("AVITO_BUILD_PYTHON", "no-such-python-5120")
        .assert()
        .code(10)
        .stderr(predicate::str::contains("ОШИБКА СБОРКИ на шаге 1"));
}

#[test]
fn status_json_on_a_fresh_project() {
    let project = TestProject::new();

    let output = project
        .cmd()
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let status: serde_json::Value = serde_json::from_slice(&output).expect("status is JSON");
    assert_eq!(status["app_name"], "App");
    assert_eq!(status["environment"], "missing");
    assert_eq!(status["artifact"]["present"], false);
    assert!(status["last_run"].is_null());
}

#[cfg(unix)]
#[test]
fn status_reports_a_half_built_environment_as_stale() {
    let project = TestProject::new();
    project.write("venv/bin/python", "");

    project
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stale: no fingerprint"));
}

#[test]
fn clean_all_removes_environment_and_outputs() {
    let project = TestProject::new();
    project.write("venv/bin/python", "");
    project.write("build/App/warn-App.txt", "");
    project.write("dist/App/App", "exe");
    project.write("dist/release/App-v1.0.0-windows-x86_64.zip", "zip");

    project.cmd().arg("clean").assert().success();
    assert!(!project.path("venv").exists());
    assert!(project.path("dist/App/App").exists());

    project.cmd().args(["clean", "--all"]).assert().success();
    assert!(!project.path("build").exists());
    assert!(!project.path("dist/App").exists());
    assert!(!project.path("dist/release").exists());
}
