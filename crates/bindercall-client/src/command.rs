use std::path::Path;

use bindercall_shell::quote;

/// Build the helper invocation: `<helper> <service> <opcode> <payload>`.
pub fn helper_command(helper: &Path, service: &str, opcode: u32, payload: &str) -> String {
    format!(
        "{} {} {opcode} {}",
        quote(&helper.to_string_lossy()),
        quote(service),
        quote(payload)
    )
}
