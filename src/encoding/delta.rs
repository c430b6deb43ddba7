use std::fmt::Debug;

use crate::buffer::SlabBuffer;
use crate::error::{AllocError, DecodeError, WriteError};
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

use super::{bitpack, leb128, raw::RawDecoder, Sink, ValuesWriter};

const BLOCK_SIZE: usize = 128;
const MINIBLOCKS_PER_BLOCK: usize = 4;
const MINIBLOCK_SIZE: usize = BLOCK_SIZE / MINIBLOCKS_PER_BLOCK;

/// An integer type delta encoding can be applied to.
///
/// Deltas are computed with wrapping arithmetic in the type's own width so an
/// int32 column never needs more than 32 bits per packed delta.
pub trait DeltaInt: Copy + Ord + Default + Debug {
    const PHYSICAL_TYPE: PhysicalType;
    const BITS: u8;

    fn from_value(value: &Value<'_>) -> Option<Self>;
    fn into_value(self) -> Value<'static>;
    fn wrapping_sub(self, other: Self) -> Self;
    fn wrapping_add(self, other: Self) -> Self;
    fn to_i64(self) -> i64;
    /// Truncates to the width of `Self`
    fn from_i64(val: i64) -> Self;
    fn to_unsigned(self) -> u64;
    fn from_unsigned(val: u64) -> Self;
}

impl DeltaInt for i32 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Int32;
    const BITS: u8 = 32;

    fn from_value(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Int32(i) => Some(*i),
            _ => None,
        }
    }

    fn into_value(self) -> Value<'static> {
        Value::Int32(self)
    }

    fn wrapping_sub(self, other: Self) -> Self {
        i32::wrapping_sub(self, other)
    }

    fn wrapping_add(self, other: Self) -> Self {
        i32::wrapping_add(self, other)
    }

    fn to_i64(self) -> i64 {
        i64::from(self)
    }

    fn from_i64(val: i64) -> Self {
        val as i32
    }

    fn to_unsigned(self) -> u64 {
        u64::from(self as u32)
    }

    fn from_unsigned(val: u64) -> Self {
        val as u32 as i32
    }
}

impl DeltaInt for i64 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Int64;
    const BITS: u8 = 64;

    fn from_value(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    fn into_value(self) -> Value<'static> {
        Value::Int64(self)
    }

    fn wrapping_sub(self, other: Self) -> Self {
        i64::wrapping_sub(self, other)
    }

    fn wrapping_add(self, other: Self) -> Self {
        i64::wrapping_add(self, other)
    }

    fn to_i64(self) -> i64 {
        self
    }

    fn from_i64(val: i64) -> Self {
        val
    }

    fn to_unsigned(self) -> u64 {
        self as u64
    }

    fn from_unsigned(val: u64) -> Self {
        val as i64
    }
}

/// Encodes integers as differences between consecutive values.
///
/// The stream starts with a header of uLEB128 block size (128), miniblocks per
/// block (4) and total value count, followed by the first value zigzag encoded.
/// Every block of 128 deltas then stores its minimum delta (zigzag), one bit
/// width byte per miniblock, and the miniblocks of `delta - min` bit packed.
/// Miniblocks past the last value are not written.
#[derive(Debug)]
pub struct DeltaBinaryPackedEncoder<T> {
    blocks: SlabBuffer,
    first_value: T,
    previous: T,
    total: usize,
    deltas: Vec<T>,
}

impl<T: DeltaInt> DeltaBinaryPackedEncoder<T> {
    pub fn new(blocks: SlabBuffer) -> Self {
        DeltaBinaryPackedEncoder {
            blocks,
            first_value: T::default(),
            previous: T::default(),
            total: 0,
            deltas: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    /// Append `value`. On error nothing has been appended.
    pub(crate) fn append(&mut self, value: T) -> Result<(), AllocError> {
        if self.total == 0 {
            self.first_value = value;
        } else {
            // a full block is only written out once the next delta arrives
            if self.deltas.len() == BLOCK_SIZE {
                self.flush_deltas()?;
            }
            self.deltas.push(value.wrapping_sub(self.previous));
        }
        self.previous = value;
        self.total += 1;
        Ok(())
    }

    /// Undo the most recent `append`
    pub(crate) fn pop(&mut self) {
        if let Some(delta) = self.deltas.pop() {
            self.previous = self.previous.wrapping_sub(delta);
            self.total -= 1;
        } else if self.total == 1 {
            self.first_value = T::default();
            self.previous = T::default();
            self.total = 0;
        }
    }

    fn flush_deltas(&mut self) -> Result<(), AllocError> {
        let mark = self.blocks.len();
        if let Err(e) = flush_block(&self.deltas, &mut self.blocks) {
            self.blocks.truncate(mark);
            return Err(e);
        }
        self.deltas.clear();
        Ok(())
    }

    pub(crate) fn to_vec(&self) -> Result<Vec<u8>, AllocError> {
        let mut out = Vec::new();
        leb128::write_unsigned(&mut out, BLOCK_SIZE as u64)?;
        leb128::write_unsigned(&mut out, MINIBLOCKS_PER_BLOCK as u64)?;
        leb128::write_unsigned(&mut out, self.total as u64)?;
        leb128::write_zigzag(&mut out, self.first_value.to_i64())?;
        self.blocks.copy_to(&mut out)?;
        if !self.deltas.is_empty() {
            flush_block(&self.deltas, &mut out)?;
        }
        Ok(out)
    }

    pub(crate) fn len(&self) -> usize {
        // header estimate plus at most 8 bytes per pending delta
        self.blocks.len() + 32 + self.deltas.len() * std::mem::size_of::<T>()
    }

    pub(crate) fn allocated_size(&self) -> usize {
        self.blocks.allocated_size() + self.deltas.capacity() * std::mem::size_of::<T>()
    }

    pub(crate) fn clear(&mut self) {
        self.blocks.reset();
        self.first_value = T::default();
        self.previous = T::default();
        self.total = 0;
        self.deltas.clear();
    }
}

fn flush_block<T: DeltaInt, S: Sink>(deltas: &[T], out: &mut S) -> Result<(), AllocError> {
    let Some(min) = deltas.iter().copied().min() else {
        return Ok(());
    };
    leb128::write_zigzag(out, min.to_i64())?;

    let adjusted: Vec<u64> = deltas
        .iter()
        .map(|d| d.wrapping_sub(min).to_unsigned())
        .collect();
    let mut widths = [0_u8; MINIBLOCKS_PER_BLOCK];
    for (width, miniblock) in widths.iter_mut().zip(adjusted.chunks(MINIBLOCK_SIZE)) {
        *width = bitpack::bit_width(miniblock.iter().copied().max().unwrap_or(0));
    }
    out.append(&widths)?;

    let mut packed = Vec::new();
    let mut padded = [0_u64; MINIBLOCK_SIZE];
    for (width, miniblock) in widths.iter().zip(adjusted.chunks(MINIBLOCK_SIZE)) {
        padded[..miniblock.len()].copy_from_slice(miniblock);
        padded[miniblock.len()..].fill(0);
        packed.clear();
        bitpack::pack(&padded, *width, &mut packed);
        out.append(&packed)?;
    }
    Ok(())
}

impl<T: DeltaInt> ValuesWriter for DeltaBinaryPackedEncoder<T> {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        let v = T::from_value(&value).ok_or(WriteError::TypeMismatch {
            expected: T::PHYSICAL_TYPE,
            received: value.type_name(),
        })?;
        Ok(self.append(v)?)
    }

    fn buffered_size(&self) -> usize {
        self.len()
    }

    fn allocated_size(&self) -> usize {
        DeltaBinaryPackedEncoder::allocated_size(self)
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        Ok(self.to_vec()?)
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaBinaryPacked
    }

    fn reset(&mut self) {
        self.clear()
    }
}

/// Decode a complete delta binary packed stream from the front of `data`.
///
/// Returns the values and the number of bytes the stream occupied, so that
/// streams which are concatenated can be decoded one after another.
pub(crate) fn decode_delta_binary_packed<T: DeltaInt>(
    data: &[u8],
) -> Result<(Vec<T>, usize), DecodeError> {
    let mut decoder = RawDecoder::new(data);
    let block_size = decoder.read_unsigned()? as usize;
    let miniblocks = decoder.read_unsigned()? as usize;
    let total = decoder.read_unsigned()? as usize;
    let first = T::from_i64(decoder.read_zigzag()?);

    if block_size == 0 || miniblocks == 0 || block_size % miniblocks != 0 {
        return Err(DecodeError::InvalidHeader("bad block layout"));
    }
    let miniblock_size = block_size / miniblocks;
    if miniblock_size % 8 != 0 {
        return Err(DecodeError::InvalidHeader("miniblock size not a multiple of 8"));
    }
    if total == 0 {
        return Ok((Vec::new(), decoder.offset()));
    }
    // every block takes at least its min delta and bit width bytes
    let maximum = (data.len() / miniblocks.saturating_add(1))
        .saturating_add(1)
        .saturating_mul(block_size)
        .saturating_add(1);
    if total > maximum {
        return Err(DecodeError::OverlargeAllocation {
            attempted: total,
            maximum,
        });
    }

    let mut values = Vec::with_capacity(total);
    values.push(first);
    let mut previous = first;
    let mut unpacked = Vec::new();
    while values.len() < total {
        let min = T::from_i64(decoder.read_zigzag()?);
        let widths = decoder.read_bytes(miniblocks)?;
        for width in widths {
            if values.len() >= total {
                break;
            }
            if *width > T::BITS {
                return Err(DecodeError::InvalidBitWidth(*width));
            }
            let packed = decoder.read_bytes(bitpack::packed_len(miniblock_size, *width))?;
            unpacked.clear();
            bitpack::unpack(packed, *width, miniblock_size, &mut unpacked)?;
            for raw in unpacked.iter().take(total - values.len()) {
                let delta = min.wrapping_add(T::from_unsigned(*raw));
                previous = previous.wrapping_add(delta);
                values.push(previous);
            }
        }
    }
    Ok((values, decoder.offset()))
}
