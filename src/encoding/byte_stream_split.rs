use crate::buffer::SlabBuffer;
use crate::config::ColumnConfig;
use crate::error::{DecodeError, WriteError};
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

use super::ValuesWriter;

/// Scatters the bytes of each fixed width value across one stream per byte
/// position.
///
/// For a page of `n` values `k` bytes wide the output is `k` streams of `n`
/// bytes, stream `i` holding byte `i` of every value in order. Similar values
/// then line up into runs a page compressor does well on.
#[derive(Debug)]
pub struct ByteStreamSplitEncoder {
    physical_type: PhysicalType,
    streams: Vec<SlabBuffer>,
}

impl ByteStreamSplitEncoder {
    pub fn new(physical_type: PhysicalType, config: &ColumnConfig) -> Self {
        let width = physical_type.fixed_width().unwrap_or(0);
        ByteStreamSplitEncoder {
            physical_type,
            streams: (0..width).map(|_| config.new_buffer()).collect(),
        }
    }
}

impl ValuesWriter for ByteStreamSplitEncoder {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        let bytes = value.bytes_for(self.physical_type)?;
        // every stream holds one byte per value written
        let count = self.streams.first().map_or(0, SlabBuffer::len);
        for (stream, byte) in self.streams.iter_mut().zip(bytes.iter()) {
            if let Err(e) = stream.write(&[*byte]) {
                for stream in &mut self.streams {
                    stream.truncate(count);
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn buffered_size(&self) -> usize {
        self.streams.iter().map(SlabBuffer::len).sum()
    }

    fn allocated_size(&self) -> usize {
        self.streams.iter().map(SlabBuffer::allocated_size).sum()
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        let mut out = Vec::new();
        for stream in &self.streams {
            stream.copy_to(&mut out)?;
        }
        Ok(out)
    }

    fn encoding(&self) -> Encoding {
        Encoding::ByteStreamSplit
    }

    fn reset(&mut self) {
        for stream in &mut self.streams {
            stream.reset();
        }
    }
}

/// Gather the values of a byte stream split page back together.
pub(crate) fn decode_byte_stream_split(
    physical_type: PhysicalType,
    data: &[u8],
) -> Result<Vec<Value<'static>>, DecodeError> {
    let width = match physical_type.fixed_width() {
        Some(width) if width > 0 => width,
        _ => {
            return Err(DecodeError::UnsupportedEncoding {
                encoding: Encoding::ByteStreamSplit,
                physical_type,
            })
        }
    };
    if data.len() % width != 0 {
        return Err(DecodeError::InvalidHeader(
            "byte stream split page is not a whole number of values",
        ));
    }
    let count = data.len() / width;
    let mut scratch = vec![0_u8; width];
    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        for (b, slot) in scratch.iter_mut().enumerate() {
            *slot = data[b * count + i];
        }
        values.push(Value::from_fixed_bytes(physical_type, &scratch)?.into_owned());
    }
    Ok(values)
}
