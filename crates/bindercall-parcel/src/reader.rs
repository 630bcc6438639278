use bytes::Bytes;

use crate::dialect::ParcelDialect;
use crate::error::{ParcelError, Result};
use crate::value::{tag, ObjectKind, ObjectRef, Value};
use crate::writer::{BINDER_TYPE_BINDER, BUNDLE_MAGIC};

/// `flat_binder_object` type word for a remote binder handle.
pub const BINDER_TYPE_HANDLE: u32 = 0x7368_2a85;
/// `flat_binder_object` type word for a file descriptor.
pub const BINDER_TYPE_FD: u32 = 0x6664_2a85;

/// Exception codes found at the head of a reply.
pub mod exception {
    pub const NONE: i32 = 0;
    pub const SECURITY: i32 = -1;
    pub const BAD_PARCELABLE: i32 = -2;
    pub const ILLEGAL_ARGUMENT: i32 = -3;
    pub const NULL_POINTER: i32 = -4;
    pub const ILLEGAL_STATE: i32 = -5;
    pub const NETWORK_MAIN_THREAD: i32 = -6;
    pub const UNSUPPORTED_OPERATION: i32 = -7;
    pub const SERVICE_SPECIFIC: i32 = -8;
    pub const PARCELABLE: i32 = -9;
    pub const HAS_REPLY_HEADER: i32 = -128;
    pub const TRANSACTION_FAILED: i32 = -129;
}

/// An exception reported by the remote service in its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteException {
    pub code: i32,
    pub message: Option<String>,
    /// Service-defined error code (only for `SERVICE_SPECIFIC`).
    pub service_specific_code: Option<i32>,
}

impl RemoteException {
    /// Symbolic name of the exception code.
    pub fn name(&self) -> &'static str {
        match self.code {
            exception::SECURITY => "SecurityException",
            exception::BAD_PARCELABLE => "BadParcelableException",
            exception::ILLEGAL_ARGUMENT => "IllegalArgumentException",
            exception::NULL_POINTER => "NullPointerException",
            exception::ILLEGAL_STATE => "IllegalStateException",
            exception::NETWORK_MAIN_THREAD => "NetworkOnMainThreadException",
            exception::UNSUPPORTED_OPERATION => "UnsupportedOperationException",
            exception::SERVICE_SPECIFIC => "ServiceSpecificException",
            exception::PARCELABLE => "ParcelableException",
            exception::TRANSACTION_FAILED => "TransactionFailedException",
            _ => "RuntimeException",
        }
    }
}

impl std::fmt::Display for RemoteException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// Cursor over a parcel buffer with typed sequential reads.
///
/// Reads start at offset 0. Field order is defined by the remote
/// interface; the reader only exposes the cursor.
#[derive(Debug, Clone)]
pub struct ParcelReader {
    data: Bytes,
    pos: usize,
    dialect: ParcelDialect,
}

impl ParcelReader {
    /// Wrap a buffer using the default dialect.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_dialect(data, ParcelDialect::default())
    }

    /// Wrap a buffer using an explicit dialect.
    pub fn with_dialect(data: impl Into<Bytes>, dialect: ParcelDialect) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            dialect,
        }
    }

    pub fn dialect(&self) -> ParcelDialect {
        self.dialect
    }

    /// The whole underlying buffer, independent of the cursor.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Positions past the end are rejected.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(ParcelError::InvalidPosition {
                position,
                size: self.data.len(),
            });
        }
        self.pos = position;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&[u8]> {
        if self.remaining() < needed {
            return Err(ParcelError::UnexpectedEof {
                needed,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += needed;
        Ok(&self.data[start..start + needed])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn skip_padded(&mut self, len: usize) -> Result<()> {
        let padded = len + (4 - len % 4) % 4;
        self.take(padded).map(|_| ())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.take_array().map(i32::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take_array().map(u32::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.take_array().map(i64::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.take_array().map(u64::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.take_array().map(f64::from_le_bytes)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Read a byte widened to an int, truncating as the runtime does.
    pub fn read_byte(&mut self) -> Result<i8> {
        Ok(self.read_i32()? as i8)
    }

    /// Read a length word; `None` for the `-1` "absent" marker.
    ///
    /// `min_item_size` bounds the claimed length by the bytes left, so a
    /// corrupt length cannot trigger a huge allocation.
    fn read_length(&mut self, min_item_size: usize) -> Result<Option<usize>> {
        let len = self.read_i32()?;
        if len == -1 {
            return Ok(None);
        }
        let count = usize::try_from(len).map_err(|_| ParcelError::InvalidLength(len))?;
        let needed = count.saturating_mul(min_item_size);
        if needed > self.remaining() {
            return Err(ParcelError::UnexpectedEof {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(Some(count))
    }

    pub fn read_string16(&mut self) -> Result<Option<String>> {
        let Some(units) = self.read_length(2)? else {
            return Ok(None);
        };
        let byte_len = (units + 1) * 2;
        let raw = self.take(byte_len)?;
        let decoded: Vec<u16> = raw[..units * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let text = String::from_utf16(&decoded).map_err(|_| ParcelError::InvalidUtf16)?;
        let padding = (4 - byte_len % 4) % 4;
        self.take(padding)?;
        Ok(Some(text))
    }

    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.read_length(1)? else {
            return Ok(None);
        };
        let bytes = self.take(len)?.to_vec();
        let padding = (4 - len % 4) % 4;
        self.take(padding)?;
        Ok(Some(bytes))
    }

    fn read_array<T>(
        &mut self,
        min_item_size: usize,
        mut read_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Option<Vec<T>>> {
        let Some(len) = self.read_length(min_item_size)? else {
            return Ok(None);
        };
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(read_item(self)?);
        }
        Ok(Some(items))
    }

    pub fn read_boolean_array(&mut self) -> Result<Option<Vec<bool>>> {
        self.read_array(4, Self::read_bool)
    }

    pub fn read_char_array(&mut self) -> Result<Option<Vec<u16>>> {
        self.read_array(4, |r| Ok(r.read_i32()? as u16))
    }

    pub fn read_int_array(&mut self) -> Result<Option<Vec<i32>>> {
        self.read_array(4, Self::read_i32)
    }

    pub fn read_long_array(&mut self) -> Result<Option<Vec<i64>>> {
        self.read_array(8, Self::read_i64)
    }

    pub fn read_double_array(&mut self) -> Result<Option<Vec<f64>>> {
        self.read_array(8, Self::read_f64)
    }

    pub fn read_string_array(&mut self) -> Result<Option<Vec<Option<String>>>> {
        self.read_array(4, Self::read_string16)
    }

    /// Read a list or object array of tagged values.
    pub fn read_value_list(&mut self) -> Result<Option<Vec<Value>>> {
        self.read_array(4, Self::read_value)
    }

    pub fn read_map(&mut self) -> Result<Option<Vec<(Value, Value)>>> {
        self.read_array(8, |r| Ok((r.read_value()?, r.read_value()?)))
    }

    pub fn read_bundle(&mut self) -> Result<Option<Vec<(String, Value)>>> {
        let length = self.read_i32()?;
        match length {
            -1 => return Ok(None),
            0 => return Ok(Some(Vec::new())),
            n if n < 0 => return Err(ParcelError::InvalidLength(n)),
            _ => {}
        }
        let magic = self.read_u32()?;
        if magic != BUNDLE_MAGIC {
            return Err(ParcelError::BadBundleMagic(magic));
        }
        let start = self.pos;
        let entries = self
            .read_array(8, |r| {
                let key = r.read_string16()?.unwrap_or_default();
                Ok((key, r.read_value()?))
            })?
            .unwrap_or_default();
        self.set_position(start + length as usize)?;
        Ok(Some(entries))
    }

    /// Read a flattened binder. `None` for the null binder.
    pub fn read_binder(&mut self) -> Result<Option<ObjectRef>> {
        let object_type = self.read_u32()?;
        let _flags = self.read_u32()?;
        let raw = self.read_u64()?;
        let _cookie = self.read_u64()?;
        if self.dialect.has_binder_stability() {
            let _stability = self.read_i32()?;
        }
        match object_type {
            BINDER_TYPE_BINDER if raw == 0 => Ok(None),
            BINDER_TYPE_BINDER | BINDER_TYPE_HANDLE => Ok(Some(ObjectRef {
                kind: ObjectKind::Binder,
                raw,
            })),
            BINDER_TYPE_FD => Ok(Some(ObjectRef {
                kind: ObjectKind::FileDescriptor,
                raw,
            })),
            other => Err(ParcelError::UnknownObjectType(other)),
        }
    }

    fn skip_container_length(&mut self) -> Result<()> {
        if self.dialect.length_prefixed_containers() {
            self.read_i32()?;
        }
        Ok(())
    }

    /// Read a tagged value.
    pub fn read_value(&mut self) -> Result<Value> {
        let value_tag = self.read_i32()?;
        let value = match value_tag {
            tag::NULL => Value::Null,
            tag::STRING => Value::String(self.read_string16()?.unwrap_or_default()),
            tag::INTEGER => Value::Int(self.read_i32()?),
            tag::MAP => {
                self.skip_container_length()?;
                Value::Map(self.read_map()?.unwrap_or_default())
            }
            tag::BUNDLE => Value::Bundle(self.read_bundle()?.unwrap_or_default()),
            tag::SHORT => Value::Short(self.read_i32()? as i16),
            tag::LONG => Value::Long(self.read_i64()?),
            tag::FLOAT => Value::Float(self.read_f32()?),
            tag::DOUBLE => Value::Double(self.read_f64()?),
            tag::BOOLEAN => Value::Bool(self.read_bool()?),
            tag::LIST => {
                self.skip_container_length()?;
                Value::List(self.read_value_list()?.unwrap_or_default())
            }
            tag::BYTE_ARRAY => Value::ByteArray(self.read_byte_array()?.unwrap_or_default()),
            tag::STRING_ARRAY => Value::StringArray(self.read_string_array()?.unwrap_or_default()),
            tag::BINDER => match self.read_binder()? {
                None => Value::NullBinder,
                Some(object) => return Err(ParcelError::ObjectNotMarshallable(object.kind)),
            },
            tag::OBJECT_ARRAY => {
                self.skip_container_length()?;
                Value::ObjectArray(self.read_value_list()?.unwrap_or_default())
            }
            tag::INT_ARRAY => Value::IntArray(self.read_int_array()?.unwrap_or_default()),
            tag::LONG_ARRAY => Value::LongArray(self.read_long_array()?.unwrap_or_default()),
            tag::BYTE => Value::Byte(self.read_byte()?),
            tag::BOOLEAN_ARRAY => {
                Value::BooleanArray(self.read_boolean_array()?.unwrap_or_default())
            }
            tag::DOUBLE_ARRAY => Value::DoubleArray(self.read_double_array()?.unwrap_or_default()),
            other => return Err(ParcelError::UnknownValueTag(other)),
        };
        Ok(value)
    }

    /// Read an interface-token header, returning the interface name.
    pub fn read_interface_token(&mut self) -> Result<Option<String>> {
        let _policy = self.read_i32()?;
        if self.dialect.has_work_source() {
            let _work_source = self.read_i32()?;
        }
        if self.dialect.has_system_header() {
            let _header = self.read_i32()?;
        }
        self.read_string16()
    }

    /// Read the status header at the start of a reply.
    ///
    /// Returns `None` when the call completed without an exception; the
    /// cursor is then positioned at the first return value.
    ///
    /// A fat reply header (`-128`) stands in for the status word of a clean
    /// reply: it is skipped and the return values follow it directly.
    pub fn read_exception(&mut self) -> Result<Option<RemoteException>> {
        let code = self.read_i32()?;
        if code == exception::HAS_REPLY_HEADER {
            let header_start = self.pos;
            let header_size = self.read_i32()?;
            let header_size =
                usize::try_from(header_size).map_err(|_| ParcelError::InvalidLength(header_size))?;
            self.set_position(header_start + header_size)?;
            return Ok(None);
        }
        if code == exception::NONE {
            return Ok(None);
        }

        let message = self.read_string16()?;
        if self.dialect.has_remote_stack_trace() && self.remaining() >= 4 {
            let header_start = self.pos;
            let trace_size = self.read_i32()?;
            if trace_size > 0 {
                self.set_position(header_start + trace_size as usize)?;
            }
        }

        let service_specific_code = match code {
            exception::SERVICE_SPECIFIC => Some(self.read_i32()?),
            exception::PARCELABLE => {
                let size = self.read_i32()?;
                if size > 0 {
                    self.skip_padded(size as usize)?;
                }
                None
            }
            _ => None,
        };

        tracing::debug!(code, ?message, "reply carries remote exception");
        Ok(Some(RemoteException {
            code,
            message,
            service_specific_code,
        }))
    }
}

/// Wrap a decoded reply buffer for field-by-field reads from offset 0.
pub fn decode_reply(data: impl Into<Bytes>, dialect: ParcelDialect) -> ParcelReader {
    ParcelReader::with_dialect(data, dialect)
}
