mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "bindercall",
    version,
    about = "Call hidden Android system-service methods through a root helper"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "bindercall",
            "call",
            "android.os.IPowerManager",
            "power",
            "goToSleep",
            "--arg",
            "long:0",
            "--arg",
            "int:0",
            "--opcodes",
            "/tmp/opcodes.json",
        ])
        .expect("call args should parse");

        let Command::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.args.len(), 2);
    }

    #[test]
    fn rejects_malformed_arg() {
        let err = Cli::try_parse_from([
            "bindercall",
            "call",
            "a.IFoo",
            "foo",
            "bar",
            "--arg",
            "int:not-a-number",
        ])
        .expect_err("bad arg should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_resolve_subcommand() {
        let cli = Cli::try_parse_from([
            "bindercall",
            "resolve",
            "a.IFoo",
            "bar",
            "--opcodes",
            "/tmp/t.json",
        ])
        .expect("resolve args should parse");
        assert!(matches!(cli.command, Command::Resolve(_)));
    }
}
