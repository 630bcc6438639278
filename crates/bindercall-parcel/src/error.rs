use crate::value::ObjectKind;

/// Errors that can occur while encoding or decoding parcel data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParcelError {
    /// The buffer ended before a complete value could be read.
    #[error("unexpected end of parcel (needed {needed} bytes, {remaining} remaining)")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A length field holds a value that cannot describe real data.
    #[error("invalid length {0} in parcel")]
    InvalidLength(i32),

    /// A collection is too large to describe with a 32-bit length.
    #[error("collection too large for parcel ({0} elements)")]
    TooLarge(usize),

    /// A String16 payload is not valid UTF-16.
    #[error("string is not valid UTF-16")]
    InvalidUtf16,

    /// A generic value carries a tag this decoder does not know.
    #[error("unknown value tag {0}")]
    UnknownValueTag(i32),

    /// A bundle header does not carry the expected magic word.
    #[error("bad bundle magic 0x{0:08x}")]
    BadBundleMagic(u32),

    /// A live kernel object cannot cross the text transport.
    #[error("{0} objects cannot be marshalled into a detached parcel")]
    ObjectNotMarshallable(ObjectKind),

    /// A flattened object has a type word this decoder does not know.
    #[error("unknown flat object type 0x{0:08x}")]
    UnknownObjectType(u32),

    /// A position outside the buffer was requested.
    #[error("position {position} is beyond parcel size {size}")]
    InvalidPosition { position: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, ParcelError>;
