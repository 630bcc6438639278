//! Persistent privileged shell with correlated command completions.
//!
//! One long-lived shell process (normally `su`) executes commands strictly
//! one at a time. Each submitted command carries a caller-chosen
//! correlation id and receives exactly one [`Completion`] with the exit code
//! and captured stdout lines, unless the channel is stopped first.

pub mod channel;
pub mod completion;
pub mod config;
pub mod error;
pub mod quote;
mod session;

pub use channel::{ChannelState, ShellChannel};
pub use completion::{Completion, CompletionHandler};
pub use config::ShellConfig;
pub use error::{Result, ShellError};
pub use quote::quote;
