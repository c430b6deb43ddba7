use crate::buffer::SlabBuffer;
use crate::error::{AllocError, DecodeError, WriteError};
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

use super::{bitpack, leb128, raw::RawDecoder, Sink, ValuesWriter};

const GROUP_SIZE: usize = 8;
// keeps a bit packed run header within a single byte
const MAX_GROUPS_PER_RUN: usize = 63;

/// The in-progress state of a run length / bit packed hybrid stream.
///
/// A stream is a sequence of runs, each introduced by a uLEB128 header. An even
/// header `count << 1` is followed by a single value repeated `count` times,
/// stored little endian in the fewest whole bytes that fit `bit_width` bits. An
/// odd header `groups << 1 | 1` is followed by `groups` groups of 8 values, each
/// group bit packed into `bit_width` bytes.
///
/// Values only become a repeated run once at least 8 equal values have been
/// seen, anything shorter is bit packed.
#[derive(Clone, Debug)]
pub(crate) struct RleState {
    bit_width: u8,
    previous: u64,
    repeat_count: usize,
    buffered: [u64; GROUP_SIZE],
    num_buffered: usize,
    bit_packed_run: Vec<u8>,
    bit_packed_groups: usize,
}

impl RleState {
    pub(crate) fn new(bit_width: u8) -> Self {
        RleState {
            bit_width,
            previous: 0,
            repeat_count: 0,
            buffered: [0; GROUP_SIZE],
            num_buffered: 0,
            bit_packed_run: Vec::new(),
            bit_packed_groups: 0,
        }
    }

    /// Append `value`. On error nothing has been appended, though a run which
    /// was already complete may have been written to `out`.
    pub(crate) fn append<S: Sink>(&mut self, out: &mut S, value: u64) -> Result<(), AllocError> {
        let repeats = value == self.previous;
        if !repeats && self.repeat_count >= GROUP_SIZE {
            self.flush_rle_run(out)?;
        }
        if repeats && self.repeat_count + 1 >= GROUP_SIZE {
            // in a repeated run, the value is accounted for by the count
            self.repeat_count += 1;
            return Ok(());
        }
        if self.num_buffered + 1 == GROUP_SIZE && self.bit_packed_groups >= MAX_GROUPS_PER_RUN {
            self.end_bit_packed_run(out)?;
        }

        if repeats {
            self.repeat_count += 1;
        } else {
            self.repeat_count = 1;
            self.previous = value;
        }
        self.buffered[self.num_buffered] = value;
        self.num_buffered += 1;
        if self.num_buffered == GROUP_SIZE {
            self.pack_group();
        }
        Ok(())
    }

    fn pack_group(&mut self) {
        if self.bit_packed_groups == 0 {
            // room for the run header, filled in by end_bit_packed_run
            self.bit_packed_run.clear();
            self.bit_packed_run.push(0);
        }
        bitpack::pack(&self.buffered, self.bit_width, &mut self.bit_packed_run);
        self.num_buffered = 0;
        self.repeat_count = 0;
        self.bit_packed_groups += 1;
    }

    fn end_bit_packed_run<S: Sink>(&mut self, out: &mut S) -> Result<(), AllocError> {
        if self.bit_packed_groups == 0 {
            return Ok(());
        }
        // at most 63 groups, so the header is a single uLEB128 byte
        self.bit_packed_run[0] = ((self.bit_packed_groups as u8) << 1) | 1;
        out.append(&self.bit_packed_run)?;
        self.bit_packed_run.clear();
        self.bit_packed_groups = 0;
        Ok(())
    }

    fn flush_rle_run<S: Sink>(&mut self, out: &mut S) -> Result<(), AllocError> {
        self.end_bit_packed_run(out)?;
        let mut run = [0_u8; leb128::MAX_LEN + 8];
        let header = leb128::encode_unsigned(&mut run, (self.repeat_count as u64) << 1)?;
        let width = (self.bit_width as usize).div_ceil(8);
        run[header..header + width].copy_from_slice(&self.previous.to_le_bytes()[..width]);
        out.append(&run[..header + width])?;
        self.repeat_count = 0;
        self.num_buffered = 0;
        Ok(())
    }

    /// Flush whatever run is in progress. Partial groups are padded with zeros,
    /// readers rely on the page's value count to ignore them.
    pub(crate) fn finish<S: Sink>(mut self, out: &mut S) -> Result<(), AllocError> {
        if self.repeat_count >= GROUP_SIZE {
            self.flush_rle_run(out)
        } else if self.num_buffered > 0 {
            if self.bit_packed_groups >= MAX_GROUPS_PER_RUN {
                self.end_bit_packed_run(out)?;
            }
            for slot in &mut self.buffered[self.num_buffered..] {
                *slot = 0;
            }
            self.pack_group();
            self.end_bit_packed_run(out)
        } else {
            self.end_bit_packed_run(out)
        }
    }

    fn pending_len(&self) -> usize {
        self.bit_packed_run.len() + bitpack::packed_len(self.num_buffered, self.bit_width)
    }
}

/// Encodes unsigned integers of at most `bit_width` bits as a run length / bit
/// packed hybrid. See [`RleState`] for the layout.
#[derive(Debug)]
pub struct RleBitPackedEncoder {
    bit_width: u8,
    state: RleState,
    buf: SlabBuffer,
}

impl RleBitPackedEncoder {
    pub fn new(bit_width: u8, buf: SlabBuffer) -> Self {
        RleBitPackedEncoder {
            bit_width,
            state: RleState::new(bit_width),
            buf,
        }
    }

    pub fn append(&mut self, value: u64) -> Result<(), AllocError> {
        self.state.append(&mut self.buf, value)
    }

    pub fn len(&self) -> usize {
        self.buf.len() + self.state.pending_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn allocated_size(&self) -> usize {
        self.buf.allocated_size() + self.state.bit_packed_run.capacity()
    }

    /// The encoded stream, including any run still in progress
    pub fn to_vec(&self) -> Result<Vec<u8>, AllocError> {
        let mut out = self.buf.to_vec()?;
        self.state.clone().finish(&mut out)?;
        Ok(out)
    }

    pub fn reset(&mut self) {
        self.state = RleState::new(self.bit_width);
        self.buf.reset();
    }
}

/// Writes booleans as a bit width 1 hybrid stream prefixed with its length as
/// a 4 byte little endian integer.
#[derive(Debug)]
pub struct RleValuesEncoder {
    encoder: RleBitPackedEncoder,
}

impl RleValuesEncoder {
    pub fn new(bit_width: u8, buf: SlabBuffer) -> Self {
        RleValuesEncoder {
            encoder: RleBitPackedEncoder::new(bit_width, buf),
        }
    }
}

impl ValuesWriter for RleValuesEncoder {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        match value {
            Value::Boolean(b) => Ok(self.encoder.append(u64::from(b))?),
            other => Err(WriteError::TypeMismatch {
                expected: PhysicalType::Boolean,
                received: other.type_name(),
            }),
        }
    }

    fn buffered_size(&self) -> usize {
        self.encoder.len()
    }

    fn allocated_size(&self) -> usize {
        self.encoder.allocated_size()
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        let stream = self.encoder.to_vec()?;
        let len = u32::try_from(stream.len()).map_err(|_| WriteError::ValueTooLarge(stream.len()))?;
        let mut out = Vec::new();
        out.try_reserve_exact(4 + stream.len())
            .map_err(|_| AllocError::new(4 + stream.len()))?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&stream);
        Ok(out)
    }

    fn encoding(&self) -> Encoding {
        Encoding::Rle
    }

    fn reset(&mut self) {
        self.encoder.reset()
    }
}

/// Decodes a hybrid stream. This iterator does not know how many values the
/// stream holds and will yield the zero padding of a final bit packed group,
/// callers should `take` the number of values they expect.
#[derive(Clone, Debug)]
pub(crate) struct RleBitPackedDecoder<'a> {
    decoder: RawDecoder<'a>,
    bit_width: u8,
    repeat_remaining: usize,
    repeat_value: u64,
    unpacked: Vec<u64>,
    unpacked_pos: usize,
}

impl<'a> RleBitPackedDecoder<'a> {
    pub(crate) fn new(data: &'a [u8], bit_width: u8) -> Result<Self, DecodeError> {
        if bit_width > 64 {
            return Err(DecodeError::InvalidBitWidth(bit_width));
        }
        Ok(RleBitPackedDecoder {
            decoder: RawDecoder::new(data),
            bit_width,
            repeat_remaining: 0,
            repeat_value: 0,
            unpacked: Vec::new(),
            unpacked_pos: 0,
        })
    }

    fn try_next(&mut self) -> Result<Option<u64>, DecodeError> {
        loop {
            if self.repeat_remaining > 0 {
                self.repeat_remaining -= 1;
                return Ok(Some(self.repeat_value));
            }
            if self.unpacked_pos < self.unpacked.len() {
                self.unpacked_pos += 1;
                return Ok(Some(self.unpacked[self.unpacked_pos - 1]));
            }
            if self.decoder.done() {
                return Ok(None);
            }
            let header = self.decoder.read_unsigned()?;
            if header & 1 == 0 {
                self.repeat_remaining = (header >> 1) as usize;
                let width = (self.bit_width as usize).div_ceil(8);
                let mut value = [0_u8; 8];
                value[..width].copy_from_slice(self.decoder.read_bytes(width)?);
                self.repeat_value = u64::from_le_bytes(value);
            } else {
                let groups = (header >> 1) as usize;
                let count = groups
                    .checked_mul(GROUP_SIZE)
                    .ok_or(DecodeError::InvalidHeader("bit packed run too long"))?;
                let len = bitpack::packed_len(count, self.bit_width);
                if len > self.decoder.remaining() {
                    return Err(DecodeError::TryingToReadPastEnd);
                }
                let packed = self.decoder.read_bytes(len)?;
                self.unpacked.clear();
                self.unpacked_pos = 0;
                bitpack::unpack(packed, self.bit_width, count, &mut self.unpacked)?;
            }
        }
    }
}

impl<'a> Iterator for RleBitPackedDecoder<'a> {
    type Item = Result<u64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}

/// Decode `num_values` booleans written by [`RleValuesEncoder`]
pub(crate) fn decode_rle_booleans(data: &[u8], num_values: usize) -> Result<Vec<bool>, DecodeError> {
    let mut decoder = RawDecoder::new(data);
    let len = decoder.read_u32_le()? as usize;
    let stream = decoder.read_bytes(len)?;
    RleBitPackedDecoder::new(stream, 1)?
        .take(num_values)
        .map(|v| v.map(|v| v != 0))
        .collect()
}
