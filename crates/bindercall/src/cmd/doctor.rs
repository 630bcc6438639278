use std::path::{Path, PathBuf};

use bindercall_opcode::OpcodeTable;
use bindercall_shell::{ShellChannel, ShellError};
use serde::Serialize;

use crate::cmd::{DeviceArgs, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![
        shell_check(&args.device.shell),
        helper_check(&args.device.helper),
        opcode_table_check(&args.device),
    ];
    if args.probe {
        checks.push(probe_check(&args.device));
    }
    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("bindercall doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<14} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => println!("{}", output.overall),
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

/// Resolve a program name the way the shell would.
fn find_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = PathBuf::from(program);
        return path.is_file().then_some(path);
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn shell_check(program: &str) -> CheckResult {
    match find_program(program) {
        Some(path) => CheckResult::new("shell", CheckStatus::Pass, path.display().to_string()),
        None => CheckResult::new("shell", CheckStatus::Fail, format!("{program} not found")),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

fn helper_check(path: &Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(metadata) if !metadata.is_file() => CheckResult::new(
            "helper",
            CheckStatus::Fail,
            format!("{} is not a file", path.display()),
        ),
        // Start marks the helper executable, so this is only a warning.
        Ok(metadata) if !is_executable(&metadata) => CheckResult::new(
            "helper",
            CheckStatus::Warn,
            format!("{} is not executable yet", path.display()),
        ),
        Ok(metadata) => CheckResult::new(
            "helper",
            CheckStatus::Pass,
            format!("{} ({} bytes)", path.display(), metadata.len()),
        ),
        Err(err) => CheckResult::new(
            "helper",
            CheckStatus::Fail,
            format!("{}: {err}", path.display()),
        ),
    }
}

fn opcode_table_check(device: &DeviceArgs) -> CheckResult {
    let Some(path) = &device.opcodes else {
        return CheckResult::new("opcode_table", CheckStatus::Skip, "BINDERCALL_OPCODES not set");
    };
    match OpcodeTable::from_file(path) {
        Ok(table) => {
            let sdk = table
                .sdk
                .map_or_else(|| "unknown SDK".to_string(), |sdk| format!("SDK {sdk}"));
            let status = match (table.sdk, device.sdk) {
                (Some(table_sdk), Some(wanted)) if table_sdk != wanted => CheckStatus::Warn,
                _ if table.is_empty() => CheckStatus::Warn,
                _ => CheckStatus::Pass,
            };
            CheckResult::new(
                "opcode_table",
                status,
                format!("{} entries, {sdk}", table.len()),
            )
        }
        Err(err) => CheckResult::new("opcode_table", CheckStatus::Fail, err.to_string()),
    }
}

fn probe_check(device: &DeviceArgs) -> CheckResult {
    let channel = ShellChannel::new(device.shell_config());
    let result = channel.start();
    channel.stop();
    match result {
        Ok(()) => CheckResult::new("probe", CheckStatus::Pass, "privileged shell started"),
        Err(ShellError::ElevationFailed(reason)) => {
            CheckResult::new("probe", CheckStatus::Fail, format!("not root: {reason}"))
        }
        Err(err) => CheckResult::new("probe", CheckStatus::Fail, err.to_string()),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }
    CheckResult::new("features", CheckStatus::Info, features.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![CheckResult::new("x", CheckStatus::Pass, "ok")],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }

    #[test]
    fn finds_sh_on_path() {
        assert!(find_program("sh").is_some());
        assert!(find_program("/nonexistent/bindercall-shell").is_none());
    }
}
