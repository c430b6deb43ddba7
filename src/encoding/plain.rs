use crate::buffer::SlabBuffer;
use crate::error::{DecodeError, WriteError};
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

use super::{raw::RawDecoder, Sink, ValuesWriter};

/// Write `value` in the plain layout of `physical_type`, returning the number
/// of bytes written.
///
/// Numbers are little endian, byte arrays carry a 4 byte little endian length
/// prefix, everything else is written as is.
pub(crate) fn write_plain<S: Sink>(
    physical_type: PhysicalType,
    value: &Value<'_>,
    out: &mut S,
) -> Result<usize, WriteError> {
    let bytes = value.bytes_for(physical_type)?;
    let mut written = 0;
    if physical_type == PhysicalType::ByteArray {
        let len = u32::try_from(bytes.len()).map_err(|_| WriteError::ValueTooLarge(bytes.len()))?;
        out.append(&len.to_le_bytes())?;
        written += 4;
    }
    out.append(&bytes)?;
    Ok(written + bytes.len())
}

/// The size of `value` once written by [`write_plain`]
pub(crate) fn plain_size(physical_type: PhysicalType, len: usize) -> usize {
    match physical_type {
        PhysicalType::ByteArray => 4 + len,
        _ => len,
    }
}

/// Writes values in their plain layout.
///
/// Used directly for floating point and int96 columns and to write dictionary
/// pages. Fixed width byte arrays must have exactly the column's width.
#[derive(Debug)]
pub struct PlainEncoder {
    physical_type: PhysicalType,
    buf: SlabBuffer,
}

impl PlainEncoder {
    pub fn new(physical_type: PhysicalType, buf: SlabBuffer) -> Self {
        PlainEncoder { physical_type, buf }
    }
}

impl ValuesWriter for PlainEncoder {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        let mark = self.buf.len();
        if let Err(e) = write_plain(self.physical_type, &value, &mut self.buf) {
            // a length prefix may have made it in without its bytes
            self.buf.truncate(mark);
            return Err(e);
        }
        Ok(())
    }

    fn buffered_size(&self) -> usize {
        self.buf.len()
    }

    fn allocated_size(&self) -> usize {
        self.buf.allocated_size()
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        Ok(self.buf.to_vec()?)
    }

    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn reset(&mut self) {
        self.buf.reset()
    }
}

/// See the discussion on [`write_plain`] for the layout
#[derive(Clone, Debug)]
pub(crate) struct PlainDecoder<'a> {
    physical_type: PhysicalType,
    decoder: RawDecoder<'a>,
}

impl<'a> PlainDecoder<'a> {
    pub(crate) fn new(physical_type: PhysicalType, data: &'a [u8]) -> Self {
        PlainDecoder {
            physical_type,
            decoder: RawDecoder::new(data),
        }
    }

    fn try_next(&mut self) -> Result<Value<'a>, DecodeError> {
        match self.physical_type {
            PhysicalType::ByteArray => {
                let len = self.decoder.read_u32_le()? as usize;
                let bytes = self.decoder.read_bytes(len)?;
                Value::from_fixed_bytes(PhysicalType::ByteArray, bytes)
            }
            PhysicalType::Boolean => Err(DecodeError::UnsupportedEncoding {
                encoding: Encoding::Plain,
                physical_type: PhysicalType::Boolean,
            }),
            fixed => {
                // every other type has a fixed width
                let width = fixed.fixed_width().unwrap_or(0);
                if width == 0 {
                    return Err(DecodeError::InvalidHeader("zero width values"));
                }
                let bytes = self.decoder.read_bytes(width)?;
                Value::from_fixed_bytes(fixed, bytes)
            }
        }
    }
}

impl<'a> Iterator for PlainDecoder<'a> {
    type Item = Result<Value<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.done() {
            None
        } else {
            Some(self.try_next())
        }
    }
}
