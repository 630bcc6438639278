use bindercall_client::helper::{host_abis, install_if_changed, locate};
use serde::Serialize;

use crate::cmd::InstallArgs;
use crate::exit::{call_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InstallOutput {
    source: String,
    destination: String,
    sdk: u32,
    installed: bool,
}

pub fn run(args: InstallArgs, format: OutputFormat) -> CliResult<i32> {
    let sdk = args.device.sdk_for(None);
    let abis: Vec<String> = match args.abi {
        Some(abis) => abis,
        None => host_abis().iter().map(|abi| abi.to_string()).collect(),
    };

    let source = locate(&args.assets, sdk, &abis).map_err(|err| call_error("no helper build", err))?;
    let installed = install_if_changed(&source, &args.device.helper)
        .map_err(|err| call_error("install failed", err))?;

    let out = InstallOutput {
        source: source.display().to_string(),
        destination: args.device.helper.display().to_string(),
        sdk,
        installed,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            let state = if out.installed { "installed" } else { "up to date" };
            println!("{} -> {} ({state})", out.source, out.destination);
        }
        OutputFormat::Raw => println!("{}", out.destination),
    }
    Ok(SUCCESS)
}
