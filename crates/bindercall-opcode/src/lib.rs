//! Transaction code resolution for hidden Android service methods.
//!
//! A remote method is addressed by a small integer, fixed when the target OS
//! image was built. This crate maps `(interface, method)` pairs to those
//! codes through a pluggable [`OpcodeProvider`] and memoizes the results in
//! a bounded LRU cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod resolver;
pub mod table;

pub use cache::LruCache;
pub use config::{ResolverConfig, DEFAULT_CACHE_CAPACITY};
pub use error::{OpcodeError, Result};
pub use provider::{cache_key, stub_name, transaction_field, LookupFailure, OpcodeProvider};
pub use resolver::TransactionResolver;
pub use table::OpcodeTable;

/// First code available to interface methods.
pub const FIRST_CALL_TRANSACTION: u32 = 0x0000_0001;
/// Last code available to interface methods.
pub const LAST_CALL_TRANSACTION: u32 = 0x00ff_ffff;
