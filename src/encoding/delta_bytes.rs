use std::borrow::Cow;

use crate::buffer::SlabBuffer;
use crate::config::ColumnConfig;
use crate::error::{AllocError, DecodeError, WriteError};
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

use super::{decode_delta_binary_packed, DeltaBinaryPackedEncoder, ValuesWriter};

/// Writes all the lengths of a page's byte arrays delta binary packed, followed
/// by the concatenated bytes of the arrays.
#[derive(Debug)]
pub struct DeltaLengthByteArrayEncoder {
    physical_type: PhysicalType,
    lengths: DeltaBinaryPackedEncoder<i32>,
    data: SlabBuffer,
}

impl DeltaLengthByteArrayEncoder {
    pub fn new(physical_type: PhysicalType, config: &ColumnConfig) -> Self {
        DeltaLengthByteArrayEncoder {
            physical_type,
            lengths: DeltaBinaryPackedEncoder::new(config.new_buffer()),
            data: config.new_buffer(),
        }
    }

    /// Append one byte array. On error nothing has been appended.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        let len = i32::try_from(bytes.len()).map_err(|_| WriteError::ValueTooLarge(bytes.len()))?;
        let mark = self.data.len();
        self.data.write(bytes)?;
        if let Err(e) = self.lengths.append(len) {
            self.data.truncate(mark);
            return Err(e.into());
        }
        Ok(())
    }

    /// Undo the most recent `append`, which added `len` bytes
    fn pop(&mut self, len: usize) {
        self.lengths.pop();
        self.data.truncate(self.data.len().saturating_sub(len));
    }

    pub(crate) fn to_vec(&self) -> Result<Vec<u8>, AllocError> {
        let mut out = self.lengths.to_vec()?;
        self.data.copy_to(&mut out)?;
        Ok(out)
    }

    fn clear(&mut self) {
        self.lengths.clear();
        self.data.reset();
    }
}

impl ValuesWriter for DeltaLengthByteArrayEncoder {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        let bytes = value.bytes_for(self.physical_type)?;
        self.append(&bytes)
    }

    fn buffered_size(&self) -> usize {
        self.lengths.len() + self.data.len()
    }

    fn allocated_size(&self) -> usize {
        self.lengths.allocated_size() + self.data.allocated_size()
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        Ok(self.to_vec()?)
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaLengthByteArray
    }

    fn reset(&mut self) {
        self.clear()
    }
}

/// Incremental encoding of byte arrays.
///
/// Each value is stored as the length of the prefix it shares with the
/// previous value and the remaining suffix. The prefix lengths are written
/// delta binary packed, the suffixes delta length byte array encoded.
#[derive(Debug)]
pub struct DeltaByteArrayEncoder {
    physical_type: PhysicalType,
    prefix_lengths: DeltaBinaryPackedEncoder<i32>,
    suffixes: DeltaLengthByteArrayEncoder,
    previous: Vec<u8>,
}

impl DeltaByteArrayEncoder {
    pub fn new(physical_type: PhysicalType, config: &ColumnConfig) -> Self {
        DeltaByteArrayEncoder {
            physical_type,
            prefix_lengths: DeltaBinaryPackedEncoder::new(config.new_buffer()),
            suffixes: DeltaLengthByteArrayEncoder::new(PhysicalType::ByteArray, config),
            previous: Vec::new(),
        }
    }
}

fn shared_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl ValuesWriter for DeltaByteArrayEncoder {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        let bytes = value.bytes_for(self.physical_type)?;
        let prefix = shared_prefix(&self.previous, &bytes);
        let prefix_len = i32::try_from(prefix).map_err(|_| WriteError::ValueTooLarge(prefix))?;
        let suffix = &bytes[prefix..];
        self.suffixes.append(suffix)?;
        if let Err(e) = self.prefix_lengths.append(prefix_len) {
            self.suffixes.pop(suffix.len());
            return Err(e.into());
        }
        self.previous.clear();
        self.previous.extend_from_slice(&bytes);
        Ok(())
    }

    fn buffered_size(&self) -> usize {
        self.prefix_lengths.len() + self.suffixes.buffered_size()
    }

    fn allocated_size(&self) -> usize {
        self.prefix_lengths.allocated_size()
            + self.suffixes.allocated_size()
            + self.previous.capacity()
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        let mut out = self.prefix_lengths.to_vec()?;
        let suffixes = self.suffixes.to_vec()?;
        super::Sink::append(&mut out, &suffixes)?;
        Ok(out)
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaByteArray
    }

    fn reset(&mut self) {
        self.prefix_lengths.clear();
        self.suffixes.clear();
        self.previous.clear();
    }
}

fn lengths_to_usize(lengths: Vec<i32>) -> Result<Vec<usize>, DecodeError> {
    lengths
        .into_iter()
        .map(|l| usize::try_from(l).map_err(|_| DecodeError::NegativeLength(i64::from(l))))
        .collect()
}

/// Decode a delta length byte array stream, borrowing the values from `data`.
///
/// Returns the values and the number of bytes consumed.
pub(crate) fn decode_delta_length_byte_array(
    data: &[u8],
) -> Result<(Vec<Value<'_>>, usize), DecodeError> {
    let (lengths, mut offset) = decode_delta_binary_packed::<i32>(data)?;
    let lengths = lengths_to_usize(lengths)?;
    let mut values = Vec::with_capacity(lengths.len());
    for len in lengths {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .ok_or(DecodeError::TryingToReadPastEnd)?;
        values.push(Value::Bytes(Cow::Borrowed(&data[offset..end])));
        offset = end;
    }
    Ok((values, offset))
}

/// Decode a delta byte array stream. Every value of a fixed length column
/// must have the column's width.
pub(crate) fn decode_delta_byte_array(
    physical_type: PhysicalType,
    data: &[u8],
) -> Result<Vec<Value<'static>>, DecodeError> {
    let (prefixes, consumed) = decode_delta_binary_packed::<i32>(data)?;
    let prefixes = lengths_to_usize(prefixes)?;
    let (suffixes, _) = decode_delta_length_byte_array(&data[consumed..])?;
    if prefixes.len() != suffixes.len() {
        return Err(DecodeError::ValueCountMismatch {
            expected: prefixes.len(),
            decoded: suffixes.len(),
        });
    }

    let mut previous: Vec<u8> = Vec::new();
    let mut values = Vec::with_capacity(prefixes.len());
    for (prefix, suffix) in prefixes.into_iter().zip(suffixes) {
        if prefix > previous.len() {
            return Err(DecodeError::InvalidHeader("prefix longer than previous value"));
        }
        let suffix = match &suffix {
            Value::Bytes(b) => &b[..],
            _ => &[][..],
        };
        let mut current = Vec::with_capacity(prefix + suffix.len());
        current.extend_from_slice(&previous[..prefix]);
        current.extend_from_slice(suffix);
        if let PhysicalType::FixedLenByteArray(width) = physical_type {
            if current.len() != width {
                return Err(DecodeError::InvalidHeader("fixed length value has wrong width"));
            }
        }
        previous.clear();
        previous.extend_from_slice(&current);
        values.push(Value::Bytes(Cow::Owned(current)));
    }
    Ok(values)
}
