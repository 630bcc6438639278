use std::fmt;

/// Name of the generated stub type for an interface.
pub fn stub_name(interface: &str) -> String {
    format!("{interface}$Stub")
}

/// Name of the constant holding a method's transaction code.
pub fn transaction_field(method: &str) -> String {
    format!("TRANSACTION_{method}")
}

/// Cache key for an interface/method pair: `<stub>.TRANSACTION_<method>`.
pub fn cache_key(interface: &str, method: &str) -> String {
    format!("{}.{}", stub_name(interface), transaction_field(method))
}

/// Why a lookup produced no opcode.
///
/// Reported to the resolver for logging; callers only ever see "not found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// No stub type is known for the interface.
    StubNotFound { stub: String },
    /// The stub has no constant for the method.
    FieldNotFound { stub: String, field: String },
    /// The constant exists but does not hold a usable code.
    FieldInaccessible { stub: String, field: String, reason: String },
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::StubNotFound { stub } => write!(f, "stub {stub} not found"),
            LookupFailure::FieldNotFound { stub, field } => {
                write!(f, "field {field} not found on {stub}")
            }
            LookupFailure::FieldInaccessible {
                stub,
                field,
                reason,
            } => write!(f, "field {stub}.{field} inaccessible: {reason}"),
        }
    }
}

/// Source of transaction codes.
pub trait OpcodeProvider: Send + Sync {
    /// Look up the code of `method` on `interface`.
    fn lookup(&self, interface: &str, method: &str) -> Result<u32, LookupFailure>;
}

impl<P: OpcodeProvider + ?Sized> OpcodeProvider for Box<P> {
    fn lookup(&self, interface: &str, method: &str) -> Result<u32, LookupFailure> {
        (**self).lookup(interface, method)
    }
}

impl<P: OpcodeProvider + ?Sized> OpcodeProvider for std::sync::Arc<P> {
    fn lookup(&self, interface: &str, method: &str) -> Result<u32, LookupFailure> {
        (**self).lookup(interface, method)
    }
}
