//! Binder Parcel wire encoding for out-of-process Android service calls.
//!
//! Calls are built as a detached parcel: an interface-token header followed
//! by the method arguments, each written with one fixed rule:
//! - primitives are little-endian and 4-byte aligned
//! - strings are UTF-16 with a length prefix and a zero terminator
//! - containers carry an element count, `-1` meaning "absent"
//!
//! [`ParcelReader`] is the inverse, used to walk a reply field by field.

pub mod dialect;
pub mod error;
pub mod reader;
pub mod value;
pub mod writer;

pub use dialect::{ParcelDialect, DEFAULT_SDK};
pub use error::{ParcelError, Result};
pub use reader::{decode_reply, exception, ParcelReader, RemoteException};
pub use value::{tag, Arg, ObjectKind, ObjectRef, Value};
pub use writer::{encode_call, is_marshallable, ParcelWriter, BUNDLE_MAGIC};
