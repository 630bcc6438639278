//! Call hidden Android system-service methods from a privileged shell.
//!
//! A [`Client`] resolves the method's transaction code, encodes the
//! arguments as a parcel, and runs the helper binary through a persistent
//! root shell:
//!
//! ```text
//! <helper> <service> <opcode> <base64 payload>
//! ```
//!
//! The helper performs the binder transaction and prints the reply as
//! base64, which comes back as a [`ParcelReader`](bindercall_parcel::ParcelReader).

pub mod client;
pub mod codes;
pub mod command;
pub mod config;
pub mod error;
pub mod helper;
pub mod pending;

pub use client::Client;
pub use codes::ProtocolErrorKind;
pub use config::{ClientConfig, DEFAULT_HELPER_PATH};
pub use error::{CallError, Result};
pub use pending::PendingCall;
