#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const TABLE: &str = r#"{
    "sdk": 25,
    "stubs": {
        "android.os.IFakeService$Stub": {
            "TRANSACTION_ok": 7,
            "TRANSACTION_gone": 66
        }
    }
}"#;

const HELPER: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/invocations.log"
case "$2" in
  7) printf 'AQID' ;;
  *) echo "no such service"; exit "$2" ;;
esac
"#;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/bindercall-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn bindercall() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_bindercall"));
    for var in [
        "BINDERCALL_HELPER",
        "BINDERCALL_SHELL",
        "BINDERCALL_OPCODES",
        "BINDERCALL_SDK",
    ] {
        command.env_remove(var);
    }
    command.arg("--log-level").arg("error");
    command
}

fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let table = dir.join("opcodes.json");
    std::fs::write(&table, TABLE).expect("table should be writable");
    let helper = dir.join("anycall");
    std::fs::write(&helper, HELPER).expect("helper should be writable");
    (table, helper)
}

fn call(dir: &Path, method: &str, format: &str) -> Output {
    let (table, helper) = fixture(dir);
    bindercall()
        .args(["--format", format, "call", "android.os.IFakeService", "fake", method])
        .args(["--arg", "int:1", "--arg", "string:hi"])
        .arg("--opcodes")
        .arg(&table)
        .arg("--helper")
        .arg(&helper)
        .args(["--shell", "/bin/sh", "--no-root-check", "--timeout", "10s"])
        .output()
        .expect("call should run")
}

#[test]
fn version_prints_package_version() {
    let output = bindercall().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("bindercall {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_reports_helper_defaults() {
    let output = bindercall()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("default_helper: /data/local/tmp/anycall"));
    assert!(stdout.contains("default_sdk: 25"));
}

#[test]
fn resolve_prints_opcode() {
    let dir = unique_temp_dir("resolve");
    let (table, _) = fixture(&dir);

    let output = bindercall()
        .args(["--format", "json", "resolve", "android.os.IFakeService", "ok"])
        .arg("--opcodes")
        .arg(&table)
        .output()
        .expect("resolve should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"opcode\":7"));
    assert!(stdout.contains("android.os.IFakeService$Stub.TRANSACTION_ok"));

    let output = bindercall()
        .args(["--format", "raw", "resolve", "android.os.IFakeService", "missing"])
        .arg("--opcodes")
        .arg(&table)
        .output()
        .expect("resolve should run");
    assert_eq!(output.status.code(), Some(120));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn call_prints_reply() {
    let dir = unique_temp_dir("call");
    let output = call(&dir, "ok", "json");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"reply\":\"AQID\""));
    assert!(stdout.contains("\"opcode\":7"));

    let log = std::fs::read_to_string(dir.join("invocations.log")).unwrap();
    assert!(log.starts_with("fake 7 "));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn call_raw_writes_reply_bytes() {
    let dir = unique_temp_dir("call-raw");
    let output = call(&dir, "ok", "raw");
    assert!(output.status.success());
    assert_eq!(output.stdout, vec![1, 2, 3]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn protocol_errors_pass_through_as_exit_code() {
    let dir = unique_temp_dir("call-gone");
    let output = call(&dir, "gone", "json");
    assert_eq!(output.status.code(), Some(66));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to get service"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_method_fails_before_helper_runs() {
    let dir = unique_temp_dir("call-unknown");
    let output = call(&dir, "nope", "json");
    assert_eq!(output.status.code(), Some(120));
    assert!(!dir.join("invocations.log").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn install_copies_only_once() {
    let dir = unique_temp_dir("install");
    let build = dir.join("assets/anycall/sdk23-25/x86_64/anycall");
    std::fs::create_dir_all(build.parent().unwrap()).unwrap();
    std::fs::write(&build, b"helper").unwrap();
    let dest = dir.join("device/anycall");

    let run = || {
        bindercall()
            .args(["--format", "json", "install", "--abi", "arm64-v8a,x86_64", "--sdk", "25"])
            .arg("--assets")
            .arg(dir.join("assets"))
            .arg("--helper")
            .arg(&dest)
            .output()
            .expect("install should run")
    };

    let first = run();
    assert!(first.status.success());
    assert!(String::from_utf8_lossy(&first.stdout).contains("\"installed\":true"));
    assert_eq!(std::fs::read(&dest).unwrap(), b"helper");

    let second = run();
    assert!(String::from_utf8_lossy(&second.stdout).contains("\"installed\":false"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn doctor_fails_without_helper() {
    let dir = unique_temp_dir("doctor");
    let output = bindercall()
        .args(["--format", "json", "doctor", "--shell", "/bin/sh"])
        .arg("--helper")
        .arg(dir.join("absent"))
        .output()
        .expect("doctor should run");
    assert_eq!(output.status.code(), Some(30));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"overall\":\"fail\""));
    let _ = std::fs::remove_dir_all(&dir);
}
