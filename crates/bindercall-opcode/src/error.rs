/// Errors that can occur while loading opcode tables.
///
/// Lookups never fail with these; a missing opcode is `None`.
#[derive(Debug, thiserror::Error)]
pub enum OpcodeError {
    /// The table file could not be read.
    #[error("failed to read opcode table {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// The table file exceeds the size limit.
    #[error("opcode table {path} too large ({size} bytes, max {max})")]
    TooLarge {
        path: std::path::PathBuf,
        size: u64,
        max: u64,
    },

    /// The table is not valid JSON of the expected shape.
    #[error("invalid opcode table: {0}")]
    Json(#[from] serde_json::Error),

    /// Two merged tables disagree on a code.
    #[error("conflicting opcode for {key}: {existing} vs {incoming}")]
    Conflict {
        key: String,
        existing: serde_json::Value,
        incoming: serde_json::Value,
    },
}

pub type Result<T> = std::result::Result<T, OpcodeError>;
