use std::io::{IsTerminal, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bindercall_parcel::ParcelReader;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExceptionOutput {
    pub code: i32,
    pub name: &'static str,
    pub message: Option<String>,
    pub service_specific_code: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ReplyOutput {
    pub interface: String,
    pub service: String,
    pub method: String,
    pub opcode: Option<u32>,
    pub code: i32,
    pub size: usize,
    pub reply: String,
    pub exception: Option<ExceptionOutput>,
    /// Offset of the first return value, after the status header.
    pub data_offset: Option<usize>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ReplyOutput {
    pub fn new(
        interface: &str,
        service: &str,
        method: &str,
        opcode: Option<u32>,
        code: i32,
        reply: ParcelReader,
        read_status: bool,
    ) -> Self {
        let bytes = reply.as_bytes().to_vec();
        let (exception, data_offset) = if read_status {
            read_status_header(reply)
        } else {
            (None, None)
        };
        Self {
            interface: interface.to_string(),
            service: service.to_string(),
            method: method.to_string(),
            opcode,
            code,
            size: bytes.len(),
            reply: STANDARD.encode(&bytes),
            exception,
            data_offset,
            bytes,
        }
    }
}

fn read_status_header(mut reply: ParcelReader) -> (Option<ExceptionOutput>, Option<usize>) {
    match reply.read_exception() {
        Ok(None) => (None, Some(reply.position())),
        Ok(Some(exception)) => (
            Some(ExceptionOutput {
                code: exception.code,
                name: exception.name(),
                message: exception.message,
                service_specific_code: exception.service_specific_code,
            }),
            None,
        ),
        Err(err) => {
            tracing::debug!(error = %err, "reply has no readable status header");
            (None, None)
        }
    }
}

pub fn print_reply(out: &ReplyOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["call".to_string(), format!("{}.{}", out.interface, out.method)]);
            table.add_row(vec!["service".to_string(), out.service.clone()]);
            table.add_row(vec!["opcode".to_string(), optional(out.opcode)]);
            table.add_row(vec!["code".to_string(), out.code.to_string()]);
            table.add_row(vec!["size".to_string(), out.size.to_string()]);
            table.add_row(vec!["exception".to_string(), exception_text(out)]);
            table.add_row(vec!["reply".to_string(), hex_dump(&out.bytes)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Reply from {}.{} ({}):", out.interface, out.method, out.service);
            println!("  Opcode:     {}", optional(out.opcode));
            println!("  Code:       {}", out.code);
            println!("  Size:       {} bytes", out.size);
            println!("  Exception:  {}", exception_text(out));
            if let Some(offset) = out.data_offset {
                println!("  Data at:    {offset}");
            }
            for line in hex_dump(&out.bytes).lines() {
                println!("  {line}");
            }
        }
        OutputFormat::Raw => print_raw(&out.bytes),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn exception_text(out: &ReplyOutput) -> String {
    match &out.exception {
        None => "none".to_string(),
        Some(ex) => {
            let mut text = format!("{} ({})", ex.name, ex.code);
            if let Some(message) = &ex.message {
                text.push_str(": ");
                text.push_str(message);
            }
            if let Some(code) = ex.service_specific_code {
                text.push_str(&format!(" [service code {code}]"));
            }
            text
        }
    }
}

/// Sixteen bytes per line, offset first.
pub fn hex_dump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            format!("{:04x}: {}", row * 16, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_rows() {
        let data: Vec<u8> = (0u8..18).collect();
        let dump = hex_dump(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: 00 01 02"));
        assert_eq!(lines[1], "0010: 10 11");
    }

    #[test]
    fn status_header_is_decoded() {
        // Status 0, then an int return value.
        let reply = ParcelReader::new(vec![0u8, 0, 0, 0, 7, 0, 0, 0]);
        let out = ReplyOutput::new("a.IFoo", "foo", "bar", Some(3), 0, reply, true);
        assert!(out.exception.is_none());
        assert_eq!(out.data_offset, Some(4));
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"reply\":\"AAAAAAcAAAA=\""));
        assert!(!json.contains("bytes"));
    }

    #[test]
    fn remote_exception_is_reported() {
        // SecurityException with a null message.
        let mut data = (-1i32).to_le_bytes().to_vec();
        data.extend_from_slice(&(-1i32).to_le_bytes());
        let out = ReplyOutput::new("a.IFoo", "foo", "bar", None, 0, ParcelReader::new(data), true);
        let exception = out.exception.unwrap();
        assert_eq!(exception.name, "SecurityException");
        assert_eq!(exception.message, None);
    }
}
