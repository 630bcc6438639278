use std::fmt;

/// Tags written ahead of generic values.
pub mod tag {
    pub const NULL: i32 = -1;
    pub const STRING: i32 = 0;
    pub const INTEGER: i32 = 1;
    pub const MAP: i32 = 2;
    pub const BUNDLE: i32 = 3;
    pub const SHORT: i32 = 5;
    pub const LONG: i32 = 6;
    pub const FLOAT: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const BOOLEAN: i32 = 9;
    pub const LIST: i32 = 11;
    pub const BYTE_ARRAY: i32 = 13;
    pub const STRING_ARRAY: i32 = 14;
    pub const BINDER: i32 = 15;
    pub const OBJECT_ARRAY: i32 = 17;
    pub const INT_ARRAY: i32 = 18;
    pub const LONG_ARRAY: i32 = 19;
    pub const BYTE: i32 = 20;
    pub const BOOLEAN_ARRAY: i32 = 23;
    pub const DOUBLE_ARRAY: i32 = 28;
}

/// Kind of kernel object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Binder,
    FileDescriptor,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Binder => f.write_str("binder"),
            ObjectKind::FileDescriptor => f.write_str("file descriptor"),
        }
    }
}

/// A live kernel object reference.
///
/// Parcels that travel through the helper as text cannot carry these, so
/// encoding one fails; only the null reference is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub raw: u64,
}

/// A self-describing value: written as a tag followed by its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int(i32),
    Map(Vec<(Value, Value)>),
    Bundle(Vec<(String, Value)>),
    Short(i16),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    List(Vec<Value>),
    ByteArray(Vec<u8>),
    StringArray(Vec<Option<String>>),
    /// A null binder. Live binders are rejected at encode time.
    NullBinder,
    ObjectArray(Vec<Value>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    Byte(i8),
    BooleanArray(Vec<bool>),
    DoubleArray(Vec<f64>),
}

impl Value {
    /// Tag written ahead of this value.
    pub fn tag(&self) -> i32 {
        match self {
            Value::Null => tag::NULL,
            Value::String(_) => tag::STRING,
            Value::Int(_) => tag::INTEGER,
            Value::Map(_) => tag::MAP,
            Value::Bundle(_) => tag::BUNDLE,
            Value::Short(_) => tag::SHORT,
            Value::Long(_) => tag::LONG,
            Value::Float(_) => tag::FLOAT,
            Value::Double(_) => tag::DOUBLE,
            Value::Bool(_) => tag::BOOLEAN,
            Value::List(_) => tag::LIST,
            Value::ByteArray(_) => tag::BYTE_ARRAY,
            Value::StringArray(_) => tag::STRING_ARRAY,
            Value::NullBinder => tag::BINDER,
            Value::ObjectArray(_) => tag::OBJECT_ARRAY,
            Value::IntArray(_) => tag::INT_ARRAY,
            Value::LongArray(_) => tag::LONG_ARRAY,
            Value::Byte(_) => tag::BYTE,
            Value::BooleanArray(_) => tag::BOOLEAN_ARRAY,
            Value::DoubleArray(_) => tag::DOUBLE_ARRAY,
        }
    }
}

/// A top-level call argument.
///
/// Each variant maps to exactly one encoding rule. `None` payloads are
/// written as the `-1` "absent" length where the wire format defines one.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Option<String>),
    BooleanArray(Option<Vec<bool>>),
    ByteArray(Option<Vec<u8>>),
    CharArray(Option<Vec<u16>>),
    IntArray(Option<Vec<i32>>),
    LongArray(Option<Vec<i64>>),
    DoubleArray(Option<Vec<f64>>),
    Bundle(Option<Vec<(String, Value)>>),
    Map(Option<Vec<(Value, Value)>>),
    List(Option<Vec<Value>>),
    Array(Option<Vec<Value>>),
    Binder(Option<ObjectRef>),
    /// Generic fallback: the tagged value encoding.
    Value(Value),
}

impl Arg {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Byte(_) => "byte",
            Arg::Int(_) => "int",
            Arg::Long(_) => "long",
            Arg::Float(_) => "float",
            Arg::Double(_) => "double",
            Arg::String(_) => "string",
            Arg::BooleanArray(_) => "boolean[]",
            Arg::ByteArray(_) => "byte[]",
            Arg::CharArray(_) => "char[]",
            Arg::IntArray(_) => "int[]",
            Arg::LongArray(_) => "long[]",
            Arg::DoubleArray(_) => "double[]",
            Arg::Bundle(_) => "bundle",
            Arg::Map(_) => "map",
            Arg::List(_) => "list",
            Arg::Array(_) => "object[]",
            Arg::Binder(_) => "binder",
            Arg::Value(_) => "value",
        }
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Long(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::String(Some(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::String(Some(value))
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}
