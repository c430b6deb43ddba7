use std::borrow::Cow;
use std::ops::Deref;

use tinyvec::ArrayVec;

use crate::error::{DecodeError, WriteError};
use crate::types::PhysicalType;

/// A single value handed to a column writer.
///
/// Byte arrays and fixed length byte arrays are both `Bytes`, the column's
/// [`PhysicalType`] decides which one a value is.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Int96([u8; 12]),
    Float(f32),
    Double(f64),
    Bytes(Cow<'a, [u8]>),
}

impl<'a> Value<'a> {
    pub fn bytes<B: Into<Cow<'a, [u8]>>>(bytes: B) -> Self {
        Value::Bytes(bytes.into())
    }

    /// The name of the kind of value this is, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Int96(_) => "int96",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Boolean(b) => Value::Boolean(b),
            Value::Int32(i) => Value::Int32(i),
            Value::Int64(i) => Value::Int64(i),
            Value::Int96(b) => Value::Int96(b),
            Value::Float(f) => Value::Float(f),
            Value::Double(f) => Value::Double(f),
            Value::Bytes(b) => Value::Bytes(Cow::Owned(b.into_owned())),
        }
    }

    /// A copy of this value which borrows any bytes from `self`.
    pub fn reborrow(&self) -> Value<'_> {
        match self {
            Value::Bytes(b) => Value::Bytes(Cow::Borrowed(b.as_ref())),
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Int32(i) => Value::Int32(*i),
            Value::Int64(i) => Value::Int64(*i),
            Value::Int96(b) => Value::Int96(*b),
            Value::Float(f) => Value::Float(*f),
            Value::Double(f) => Value::Double(*f),
        }
    }

    /// The little endian bytes of this value as stored in a column of type
    /// `physical_type`.
    ///
    /// Byte arrays are returned without any length prefix. This fails if the
    /// value does not belong in such a column.
    pub(crate) fn bytes_for(
        &self,
        physical_type: PhysicalType,
    ) -> Result<ValueBytes<'_>, WriteError> {
        match (physical_type, self) {
            (PhysicalType::Boolean, Value::Boolean(b)) => Ok(ValueBytes::inline(&[u8::from(*b)])),
            (PhysicalType::Int32, Value::Int32(i)) => Ok(ValueBytes::inline(&i.to_le_bytes())),
            (PhysicalType::Int64, Value::Int64(i)) => Ok(ValueBytes::inline(&i.to_le_bytes())),
            (PhysicalType::Int96, Value::Int96(b)) => Ok(ValueBytes::inline(b)),
            (PhysicalType::Float, Value::Float(f)) => Ok(ValueBytes::inline(&f.to_le_bytes())),
            (PhysicalType::Double, Value::Double(f)) => Ok(ValueBytes::inline(&f.to_le_bytes())),
            (PhysicalType::ByteArray, Value::Bytes(b)) => {
                if b.len() > i32::MAX as usize {
                    Err(WriteError::ValueTooLarge(b.len()))
                } else {
                    Ok(ValueBytes::Slice(b))
                }
            }
            (PhysicalType::FixedLenByteArray(len), Value::Bytes(b)) => {
                if b.len() != len {
                    Err(WriteError::InvalidLength {
                        expected: len,
                        received: b.len(),
                    })
                } else {
                    Ok(ValueBytes::Slice(b))
                }
            }
            (expected, other) => Err(WriteError::TypeMismatch {
                expected,
                received: other.type_name(),
            }),
        }
    }

    /// The inverse of `bytes_for` for fixed width types. `bytes` must be
    /// exactly as wide as a value of `physical_type`.
    pub(crate) fn from_fixed_bytes(
        physical_type: PhysicalType,
        bytes: &'a [u8],
    ) -> Result<Value<'a>, DecodeError> {
        let short = |_| DecodeError::TryingToReadPastEnd;
        match physical_type {
            PhysicalType::Int32 => Ok(Value::Int32(i32::from_le_bytes(
                bytes.try_into().map_err(short)?,
            ))),
            PhysicalType::Int64 => Ok(Value::Int64(i64::from_le_bytes(
                bytes.try_into().map_err(short)?,
            ))),
            PhysicalType::Int96 => Ok(Value::Int96(bytes.try_into().map_err(short)?)),
            PhysicalType::Float => Ok(Value::Float(f32::from_le_bytes(
                bytes.try_into().map_err(short)?,
            ))),
            PhysicalType::Double => Ok(Value::Double(f64::from_le_bytes(
                bytes.try_into().map_err(short)?,
            ))),
            PhysicalType::FixedLenByteArray(len) if bytes.len() == len => {
                Ok(Value::Bytes(Cow::Borrowed(bytes)))
            }
            PhysicalType::FixedLenByteArray(_) => Err(DecodeError::TryingToReadPastEnd),
            PhysicalType::ByteArray => Ok(Value::Bytes(Cow::Borrowed(bytes))),
            PhysicalType::Boolean => Ok(Value::Boolean(bytes.first().copied().unwrap_or(0) != 0)),
        }
    }
}

/// The raw bytes of a value, either copied out of a primitive or borrowed
/// from the value's own buffer.
#[derive(Debug, Clone)]
pub(crate) enum ValueBytes<'v> {
    Inline(ArrayVec<[u8; 12]>),
    Slice(&'v [u8]),
}

impl<'v> ValueBytes<'v> {
    fn inline(bytes: &[u8]) -> Self {
        let mut inline = ArrayVec::new();
        inline.extend_from_slice(bytes);
        ValueBytes::Inline(inline)
    }
}

impl<'v> Deref for ValueBytes<'v> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ValueBytes::Inline(a) => a.as_slice(),
            ValueBytes::Slice(s) => s,
        }
    }
}

impl From<bool> for Value<'static> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value<'static> {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value<'static> {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f32> for Value<'static> {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value<'static> {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<[u8; 12]> for Value<'static> {
    fn from(b: [u8; 12]) -> Self {
        Value::Int96(b)
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(b: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(b))
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Bytes(Cow::Borrowed(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Value<'static> {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(b))
    }
}

impl From<String> for Value<'static> {
    fn from(s: String) -> Self {
        Value::Bytes(Cow::Owned(s.into_bytes()))
    }
}
