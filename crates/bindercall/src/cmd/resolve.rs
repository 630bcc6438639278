use bindercall_opcode::{cache_key, OpcodeProvider, OpcodeTable};
use serde::Serialize;

use crate::cmd::ResolveArgs;
use crate::exit::{opcode_error, CliError, CliResult, CANNOT_RESOLVE, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ResolveOutput {
    key: String,
    opcode: u32,
    sdk: Option<u32>,
}

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let mut table = OpcodeTable::new();
    for path in &args.opcodes {
        let loaded =
            OpcodeTable::from_file(path).map_err(|err| opcode_error("cannot load opcode table", err))?;
        table
            .merge(loaded)
            .map_err(|err| opcode_error("cannot merge opcode tables", err))?;
    }

    let key = cache_key(&args.interface, &args.method);
    let opcode = table
        .lookup(&args.interface, &args.method)
        .map_err(|failure| CliError::new(CANNOT_RESOLVE, format!("{key}: {failure}")))?;

    let out = ResolveOutput {
        key,
        opcode,
        sdk: table.sdk,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{} = {}", out.key, out.opcode);
            if let Some(sdk) = out.sdk {
                println!("  (table for SDK {sdk})");
            }
        }
        OutputFormat::Raw => println!("{}", out.opcode),
    }
    Ok(SUCCESS)
}
