use bytes::{BufMut, Bytes, BytesMut};

use crate::dialect::{ParcelDialect, SYSTEM_HEADER, UNSET_WORK_SOURCE};
use crate::error::{ParcelError, Result};
use crate::value::{Arg, ObjectRef, Value};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Magic word following the length of a non-empty bundle ("BNDL").
pub const BUNDLE_MAGIC: u32 = 0x4C44_4E42;

/// `flat_binder_object` type word for a local binder.
pub const BINDER_TYPE_BINDER: u32 = 0x7362_2a85;

/// Default flags of a flattened local binder (priority mask | accepts fds).
pub const FLAT_BINDER_FLAGS: u32 = 0x7f | 0x100;

/// Size of a flattened binder object with 64-bit pointers.
pub const FLAT_BINDER_SIZE: usize = 24;

/// Encodes values into the parcel wire format.
///
/// Wire rules:
/// - every primitive is little-endian and occupies a multiple of 4 bytes
/// - byte data and strings are zero-padded to the next 4-byte boundary
/// - absent arrays and strings are written as length `-1`
pub struct ParcelWriter {
    buf: BytesMut,
    dialect: ParcelDialect,
}

impl ParcelWriter {
    /// Create a writer for the default dialect.
    pub fn new() -> Self {
        Self::with_dialect(ParcelDialect::default())
    }

    /// Create a writer for an explicit dialect.
    pub fn with_dialect(dialect: ParcelDialect) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            dialect,
        }
    }

    pub fn dialect(&self) -> ParcelDialect {
        self.dialect
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish writing and return the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_i32(i32::from(value));
    }

    /// Write a UTF-16 string: unit count, units, a zero terminator, padding.
    pub fn write_string16(&mut self, value: Option<&str>) -> Result<()> {
        let Some(value) = value else {
            self.write_i32(-1);
            return Ok(());
        };

        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_i32(length_of(units.len())?);
        let start = self.buf.len();
        for unit in units.iter().copied().chain(std::iter::once(0)) {
            self.buf.put_u16_le(unit);
        }
        self.pad_from(start);
        Ok(())
    }

    /// Write a byte array: length, raw bytes, padding.
    pub fn write_byte_array(&mut self, value: Option<&[u8]>) -> Result<()> {
        let Some(value) = value else {
            self.write_i32(-1);
            return Ok(());
        };

        self.write_i32(length_of(value.len())?);
        let start = self.buf.len();
        self.buf.put_slice(value);
        self.pad_from(start);
        Ok(())
    }

    /// Write the interface-token header checked by the remote stub.
    pub fn write_interface_token(&mut self, interface: &str) -> Result<()> {
        self.write_i32(self.dialect.strict_mode_policy());
        if self.dialect.has_work_source() {
            self.write_i32(UNSET_WORK_SOURCE);
        }
        if self.dialect.has_system_header() {
            self.write_i32(SYSTEM_HEADER);
        }
        self.write_string16(Some(interface))
    }

    /// Write a binder reference. Only the null reference can be marshalled.
    pub fn write_binder(&mut self, object: Option<&ObjectRef>) -> Result<()> {
        if let Some(object) = object {
            return Err(ParcelError::ObjectNotMarshallable(object.kind));
        }
        self.write_u32(BINDER_TYPE_BINDER);
        self.write_u32(FLAT_BINDER_FLAGS);
        self.write_u64(0);
        self.write_u64(0);
        if self.dialect.has_binder_stability() {
            self.write_i32(0);
        }
        Ok(())
    }

    /// Write one top-level call argument.
    pub fn write_arg(&mut self, arg: &Arg) -> Result<()> {
        match arg {
            Arg::Byte(v) => self.write_i32(i32::from(*v)),
            Arg::Int(v) => self.write_i32(*v),
            Arg::Long(v) => self.write_i64(*v),
            Arg::Float(v) => self.write_f32(*v),
            Arg::Double(v) => self.write_f64(*v),
            Arg::String(v) => self.write_string16(v.as_deref())?,
            Arg::BooleanArray(v) => self.write_array(v.as_deref(), |w, b| {
                w.write_bool(*b);
                Ok(())
            })?,
            Arg::ByteArray(v) => self.write_byte_array(v.as_deref())?,
            Arg::CharArray(v) => self.write_array(v.as_deref(), |w, c| {
                w.write_i32(i32::from(*c));
                Ok(())
            })?,
            Arg::IntArray(v) => self.write_array(v.as_deref(), |w, i| {
                w.write_i32(*i);
                Ok(())
            })?,
            Arg::LongArray(v) => self.write_array(v.as_deref(), |w, l| {
                w.write_i64(*l);
                Ok(())
            })?,
            Arg::DoubleArray(v) => self.write_array(v.as_deref(), |w, d| {
                w.write_f64(*d);
                Ok(())
            })?,
            Arg::Bundle(v) => self.write_bundle(v.as_deref())?,
            Arg::Map(v) => self.write_map(v.as_deref())?,
            Arg::List(v) | Arg::Array(v) => self.write_value_list(v.as_deref())?,
            Arg::Binder(v) => self.write_binder(v.as_ref())?,
            Arg::Value(v) => self.write_value(v)?,
        }
        Ok(())
    }

    /// Write a tagged value.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.write_i32(value.tag());
        match value {
            Value::Null => {}
            Value::String(s) => self.write_string16(Some(s))?,
            Value::Int(v) => self.write_i32(*v),
            Value::Map(entries) => {
                self.length_prefixed(|w| w.write_map(Some(entries)))?;
            }
            Value::Bundle(entries) => self.write_bundle(Some(entries))?,
            Value::Short(v) => self.write_i32(i32::from(*v)),
            Value::Long(v) => self.write_i64(*v),
            Value::Float(v) => self.write_f32(*v),
            Value::Double(v) => self.write_f64(*v),
            Value::Bool(v) => self.write_bool(*v),
            Value::List(items) | Value::ObjectArray(items) => {
                self.length_prefixed(|w| w.write_value_list(Some(items)))?;
            }
            Value::ByteArray(bytes) => self.write_byte_array(Some(bytes))?,
            Value::StringArray(items) => {
                self.write_array(Some(items), |w, s| w.write_string16(s.as_deref()))?;
            }
            Value::NullBinder => self.write_binder(None)?,
            Value::IntArray(items) => self.write_array(Some(items), |w, i| {
                w.write_i32(*i);
                Ok(())
            })?,
            Value::LongArray(items) => self.write_array(Some(items), |w, l| {
                w.write_i64(*l);
                Ok(())
            })?,
            Value::Byte(v) => self.write_i32(i32::from(*v)),
            Value::BooleanArray(items) => self.write_array(Some(items), |w, b| {
                w.write_bool(*b);
                Ok(())
            })?,
            Value::DoubleArray(items) => self.write_array(Some(items), |w, d| {
                w.write_f64(*d);
                Ok(())
            })?,
        }
        Ok(())
    }

    /// Write a string-keyed bundle: length, magic, entry count, entries.
    pub fn write_bundle(&mut self, entries: Option<&[(String, Value)]>) -> Result<()> {
        let entries = match entries {
            None => {
                self.write_i32(-1);
                return Ok(());
            }
            Some([]) => {
                self.write_i32(0);
                return Ok(());
            }
            Some(entries) => entries,
        };

        let length_pos = self.buf.len();
        self.write_i32(-1);
        self.write_u32(BUNDLE_MAGIC);
        let start = self.buf.len();
        self.write_i32(length_of(entries.len())?);
        for (key, value) in entries {
            self.write_string16(Some(key))?;
            self.write_value(value)?;
        }
        self.patch_length(length_pos, start)
    }

    /// Write a map of tagged keys to tagged values.
    pub fn write_map(&mut self, entries: Option<&[(Value, Value)]>) -> Result<()> {
        let Some(entries) = entries else {
            self.write_i32(-1);
            return Ok(());
        };
        self.write_i32(length_of(entries.len())?);
        for (key, value) in entries {
            self.write_value(key)?;
            self.write_value(value)?;
        }
        Ok(())
    }

    fn write_value_list(&mut self, items: Option<&[Value]>) -> Result<()> {
        self.write_array(items, |w, v| w.write_value(v))
    }

    fn write_array<T>(
        &mut self,
        items: Option<&[T]>,
        mut write_item: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        let Some(items) = items else {
            self.write_i32(-1);
            return Ok(());
        };
        self.write_i32(length_of(items.len())?);
        for item in items {
            write_item(self, item)?;
        }
        Ok(())
    }

    fn length_prefixed(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if !self.dialect.length_prefixed_containers() {
            return body(self);
        }
        let length_pos = self.buf.len();
        self.write_i32(-1);
        let start = self.buf.len();
        body(self)?;
        self.patch_length(length_pos, start)
    }

    fn patch_length(&mut self, length_pos: usize, start: usize) -> Result<()> {
        let length = length_of(self.buf.len() - start)?;
        self.buf[length_pos..length_pos + 4].copy_from_slice(&length.to_le_bytes());
        Ok(())
    }

    fn pad_from(&mut self, start: usize) {
        let written = self.buf.len() - start;
        let padding = (4 - written % 4) % 4;
        self.buf.put_bytes(0, padding);
    }
}

impl Default for ParcelWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn length_of(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| ParcelError::TooLarge(len))
}

/// Encode a complete call payload: the interface token, then each argument.
pub fn encode_call(dialect: ParcelDialect, interface: &str, args: &[Arg]) -> Result<Bytes> {
    let mut writer = ParcelWriter::with_dialect(dialect);
    writer.write_interface_token(interface)?;
    for (index, arg) in args.iter().enumerate() {
        writer.write_arg(arg).inspect_err(|err| {
            tracing::debug!(index, kind = arg.kind(), error = %err, "argument failed to encode");
        })?;
    }
    tracing::trace!(interface, args = args.len(), size = writer.len(), "encoded call payload");
    Ok(writer.into_bytes())
}

/// Whether `arg` can be detached from this process as plain bytes.
pub fn is_marshallable(arg: &Arg) -> bool {
    !matches!(arg, Arg::Binder(Some(_)))
}
