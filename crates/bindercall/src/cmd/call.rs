use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bindercall_client::{CallError, Client};
use bindercall_parcel::{Arg, ParcelReader, Value};

use crate::cmd::CallArgs;
use crate::exit::{call_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_reply, OutputFormat, ReplyOutput};

const POLL: Duration = Duration::from_millis(100);

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.timeout.as_deref().map(parse_timeout).transpose()?;
    let table = args.device.load_table()?;
    let sdk = args.device.sdk_for(Some(&table));
    let client = Client::with_table(table, args.device.client_config(sdk));

    let interrupted = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(interrupted.clone())?;

    client
        .start()
        .map_err(|err| call_error("cannot start privileged shell", err))?;
    let pending = client
        .call(&args.interface, &args.service, &args.method, &args.args)
        .map_err(|err| call_error("call failed", err))?;

    let started = Instant::now();
    let result = loop {
        if let Some(result) = pending.wait_timeout(POLL) {
            break result;
        }
        if interrupted.load(Ordering::SeqCst) {
            client.stop();
            return Err(CliError::new(INTERRUPTED, "interrupted"));
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                client.stop();
                return Err(CliError::new(TIMEOUT, format!("no reply after {limit:?}")));
            }
        }
    };
    client.stop();

    let opcode = client.resolver().resolve(&args.interface, &args.method);
    let describe = |code: i32, reply: ParcelReader| {
        ReplyOutput::new(&args.interface, &args.service, &args.method, opcode, code, reply, !args.no_status)
    };

    match result {
        Ok(reply) => {
            print_reply(&describe(SUCCESS, reply), format);
            Ok(SUCCESS)
        }
        Err(CallError::Remote {
            code,
            reply: Some(reply),
        }) => {
            print_reply(&describe(code, reply), format);
            Ok(code)
        }
        Err(err) => Err(call_error("call failed", err)),
    }
}

fn install_ctrlc_handler(interrupted: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse a `KIND:VALUE` argument.
///
/// Scalars: `byte`, `int`, `long`, `float`, `double`, `bool` (sent as int),
/// `string`. Arrays take comma lists: `bools`, `ints`, `longs`, `doubles`,
/// `strings`; `bytes` takes base64 and `chars` takes text. `null:KIND`
/// sends the absent form of a nullable kind.
pub fn parse_arg(spec: &str) -> Result<Arg, String> {
    let (kind, value) = spec
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:VALUE, got {spec:?}"))?;
    let invalid = |what: &str| format!("invalid {what}: {value:?}");

    match kind {
        "byte" => value.parse().map(Arg::Byte).map_err(|_| invalid("byte")),
        "int" => value.parse().map(Arg::Int).map_err(|_| invalid("int")),
        "long" => value.parse().map(Arg::Long).map_err(|_| invalid("long")),
        "float" => value.parse().map(Arg::Float).map_err(|_| invalid("float")),
        "double" => value.parse().map(Arg::Double).map_err(|_| invalid("double")),
        "bool" => parse_bool(value).map(|flag| Arg::Int(i32::from(flag))),
        "string" => Ok(Arg::String(Some(value.to_string()))),
        "bytes" => STANDARD
            .decode(value)
            .map(|bytes| Arg::ByteArray(Some(bytes)))
            .map_err(|err| format!("invalid base64 {value:?}: {err}")),
        "chars" => Ok(Arg::CharArray(Some(value.encode_utf16().collect()))),
        "bools" => parse_list(value, parse_bool).map(|v| Arg::BooleanArray(Some(v))),
        "ints" => parse_list(value, |item| item.parse::<i32>().map_err(|_| invalid("int list")))
            .map(|v| Arg::IntArray(Some(v))),
        "longs" => parse_list(value, |item| item.parse::<i64>().map_err(|_| invalid("long list")))
            .map(|v| Arg::LongArray(Some(v))),
        "doubles" => parse_list(value, |item| item.parse::<f64>().map_err(|_| invalid("double list")))
            .map(|v| Arg::DoubleArray(Some(v))),
        "strings" => parse_list(value, |item| Ok(Some(item.to_string())))
            .map(|v| Arg::Value(Value::StringArray(v))),
        "binder" if value == "null" => Ok(Arg::Binder(None)),
        "binder" => Err("only null binders can be sent".to_string()),
        "null" => null_of(value),
        other => Err(format!("unknown argument kind {other:?}")),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("invalid bool: {other:?}")),
    }
}

fn parse_list<T>(
    value: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value.split(',').map(|item| parse(item.trim())).collect()
}

fn null_of(kind: &str) -> Result<Arg, String> {
    let arg = match kind {
        "string" => Arg::String(None),
        "bytes" => Arg::ByteArray(None),
        "chars" => Arg::CharArray(None),
        "bools" => Arg::BooleanArray(None),
        "ints" => Arg::IntArray(None),
        "longs" => Arg::LongArray(None),
        "doubles" => Arg::DoubleArray(None),
        "bundle" => Arg::Bundle(None),
        "map" => Arg::Map(None),
        "list" => Arg::List(None),
        "array" => Arg::Array(None),
        "binder" => Arg::Binder(None),
        "value" => Arg::Value(Value::Null),
        other => return Err(format!("{other:?} has no null form")),
    };
    Ok(arg)
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_arg("int:-5").unwrap(), Arg::Int(-5));
        assert_eq!(parse_arg("long:9000000000").unwrap(), Arg::Long(9_000_000_000));
        assert_eq!(parse_arg("bool:true").unwrap(), Arg::Int(1));
        assert_eq!(
            parse_arg("string:a:b").unwrap(),
            Arg::String(Some("a:b".to_string()))
        );
    }

    #[test]
    fn parses_arrays_and_nulls() {
        assert_eq!(parse_arg("ints:1, 2,3").unwrap(), Arg::IntArray(Some(vec![1, 2, 3])));
        assert_eq!(parse_arg("ints:").unwrap(), Arg::IntArray(Some(vec![])));
        assert_eq!(parse_arg("bytes:AQID").unwrap(), Arg::ByteArray(Some(vec![1, 2, 3])));
        assert_eq!(parse_arg("null:string").unwrap(), Arg::String(None));
        assert_eq!(parse_arg("binder:null").unwrap(), Arg::Binder(None));
    }

    #[test]
    fn rejects_bad_specs() {
        assert!(parse_arg("int").is_err());
        assert!(parse_arg("int:x").is_err());
        assert!(parse_arg("widget:1").is_err());
        assert!(parse_arg("null:int").is_err());
        assert!(parse_arg("binder:7").is_err());
    }

    #[test]
    fn parse_timeout_units() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("bad").is_err());
    }
}
