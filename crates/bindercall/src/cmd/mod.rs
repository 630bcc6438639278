use clap::{Args, Subcommand};
use std::path::PathBuf;

use bindercall_client::{ClientConfig, DEFAULT_HELPER_PATH};
use bindercall_opcode::OpcodeTable;
use bindercall_parcel::{Arg, ParcelDialect, DEFAULT_SDK};
use bindercall_shell::ShellConfig;

use crate::exit::{opcode_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod doctor;
pub mod install;
pub mod resolve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call a service method and print the reply.
    Call(CallArgs),
    /// Look up a method's transaction code.
    Resolve(ResolveArgs),
    /// Install the helper binary for this device.
    Install(InstallArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Check shell, helper, and opcode table.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, format),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Install(args) => install::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

/// Options shared by commands that touch the device.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Helper binary path.
    #[arg(long, env = "BINDERCALL_HELPER", default_value = DEFAULT_HELPER_PATH)]
    pub helper: PathBuf,
    /// Privileged shell program.
    #[arg(long, env = "BINDERCALL_SHELL", default_value = "su")]
    pub shell: String,
    /// Accept a shell that does not run as uid 0.
    #[arg(long)]
    pub no_root_check: bool,
    /// Opcode table (JSON).
    #[arg(long, env = "BINDERCALL_OPCODES", value_name = "FILE")]
    pub opcodes: Option<PathBuf>,
    /// Target SDK level. Defaults to the table's level, then 25.
    #[arg(long, env = "BINDERCALL_SDK")]
    pub sdk: Option<u32>,
}

impl DeviceArgs {
    pub fn load_table(&self) -> CliResult<OpcodeTable> {
        let path = self
            .opcodes
            .as_ref()
            .ok_or_else(|| CliError::new(USAGE, "no opcode table (use --opcodes or BINDERCALL_OPCODES)"))?;
        OpcodeTable::from_file(path).map_err(|err| opcode_error("cannot load opcode table", err))
    }

    pub fn sdk_for(&self, table: Option<&OpcodeTable>) -> u32 {
        self.sdk
            .or_else(|| table.and_then(|table| table.sdk))
            .unwrap_or(DEFAULT_SDK)
    }

    pub fn shell_config(&self) -> ShellConfig {
        ShellConfig::default()
            .with_program(self.shell.clone())
            .with_require_root(!self.no_root_check)
    }

    pub fn client_config(&self, sdk: u32) -> ClientConfig {
        ClientConfig::default()
            .with_helper(self.helper.clone())
            .with_dialect(ParcelDialect::new(sdk))
            .with_shell(self.shell_config())
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Interface descriptor, e.g. android.os.IPowerManager.
    pub interface: String,
    /// Service name registered with the service manager, e.g. power.
    pub service: String,
    /// Method name.
    pub method: String,
    /// Argument as KIND:VALUE, repeatable (int:1, string:text, null:string, ...).
    #[arg(long = "arg", value_name = "KIND:VALUE", value_parser = call::parse_arg)]
    pub args: Vec<Arg>,
    /// Give up waiting after this long (e.g. 10s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Do not parse a status header at the start of the reply.
    #[arg(long)]
    pub no_status: bool,
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Interface descriptor.
    pub interface: String,
    /// Method name.
    pub method: String,
    /// Opcode table (JSON), repeatable; tables are merged in order.
    #[arg(long, env = "BINDERCALL_OPCODES", value_name = "FILE", required = true, value_delimiter = ',')]
    pub opcodes: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Asset root containing anycall/<sdk-dir>/<abi>/anycall.
    #[arg(long, value_name = "DIR")]
    pub assets: PathBuf,
    /// Device ABIs in preference order. Defaults to the host's.
    #[arg(long, value_delimiter = ',')]
    pub abi: Option<Vec<String>>,
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Also start the shell and run the root probe.
    #[arg(long)]
    pub probe: bool,
}
