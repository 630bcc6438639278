//! Call hidden Android system-service methods through a privileged helper.
//!
//! # Crate Structure
//!
//! - [`parcel`]: Binder parcel encoding of call arguments and reply decoding
//! - [`opcode`]: Transaction code tables and the memoizing resolver
//! - [`shell`]: Persistent privileged shell with correlated completions
//! - [`client`]: The call façade tying the three together

/// Re-export parcel types.
pub mod parcel {
    pub use bindercall_parcel::*;
}

/// Re-export opcode resolution types.
pub mod opcode {
    pub use bindercall_opcode::*;
}

/// Re-export shell channel types.
pub mod shell {
    pub use bindercall_shell::*;
}

/// Re-export client types.
pub mod client {
    pub use bindercall_client::*;
}

pub use bindercall_client::{CallError, Client, ClientConfig, PendingCall};
pub use bindercall_parcel::{Arg, ParcelReader, Value};
