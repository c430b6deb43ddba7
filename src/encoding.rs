//! The encoders a column writer can choose between.
//!
//! Every encoder implements [`ValuesWriter`], the uniform contract the
//! dictionary writer and the page layer drive. [`Encoder`] is the closed set of
//! them, built from an ([`Encoding`], [`PhysicalType`]) pair.

pub(crate) mod bitpack;
pub(crate) mod leb128;
pub(crate) mod raw;

mod plain;
pub use plain::PlainEncoder;
pub(crate) use plain::{plain_size, write_plain, PlainDecoder};
mod rle;
pub use rle::{RleBitPackedEncoder, RleValuesEncoder};
pub(crate) use rle::{decode_rle_booleans, RleBitPackedDecoder, RleState};
mod delta;
pub use delta::DeltaBinaryPackedEncoder;
pub(crate) use delta::{decode_delta_binary_packed, DeltaInt};
mod delta_bytes;
pub use delta_bytes::{DeltaByteArrayEncoder, DeltaLengthByteArrayEncoder};
pub(crate) use delta_bytes::{decode_delta_byte_array, decode_delta_length_byte_array};
mod byte_stream_split;
pub use byte_stream_split::ByteStreamSplitEncoder;
pub(crate) use byte_stream_split::decode_byte_stream_split;

use crate::config::ColumnConfig;
use crate::error::{AllocError, ConfigError, WriteError};
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

pub(crate) trait Sink {
    fn append(&mut self, bytes: &[u8]) -> Result<(), AllocError>;
}

impl Sink for Vec<u8> {
    fn append(&mut self, bytes: &[u8]) -> Result<(), AllocError> {
        self.try_reserve(bytes.len())
            .map_err(|_| AllocError::new(bytes.len()))?;
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// The contract every encoder of column values fulfils.
///
/// Values are written one at a time in row order. `bytes` returns the encoded
/// page so far and `reset` prepares the writer for the next page.
pub trait ValuesWriter {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError>;

    /// An estimate of the size of the encoded page so far
    fn buffered_size(&self) -> usize;

    /// The memory held by this writer
    fn allocated_size(&self) -> usize;

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError>;

    /// The encoding of the bytes `bytes` would currently return
    fn encoding(&self) -> Encoding;

    fn reset(&mut self);
}

/// One of the encoders of this crate.
#[derive(Debug)]
pub enum Encoder {
    Plain(PlainEncoder),
    Rle(RleValuesEncoder),
    DeltaBinaryPacked32(DeltaBinaryPackedEncoder<i32>),
    DeltaBinaryPacked64(DeltaBinaryPackedEncoder<i64>),
    DeltaLengthByteArray(DeltaLengthByteArrayEncoder),
    DeltaByteArray(DeltaByteArrayEncoder),
    ByteStreamSplit(ByteStreamSplitEncoder),
}

impl Encoder {
    /// Build the encoder for `encoding` over values of `physical_type`.
    ///
    /// Dictionary encodings are not handled here, see
    /// [`crate::DictionaryFallbackWriter`].
    pub fn new(
        encoding: Encoding,
        physical_type: PhysicalType,
        config: &ColumnConfig,
    ) -> Result<Encoder, ConfigError> {
        let unsupported = ConfigError::UnsupportedEncoding {
            encoding,
            physical_type,
        };
        match (encoding, physical_type) {
            (Encoding::Plain, PhysicalType::Boolean) => Err(unsupported),
            (Encoding::Plain, _) => Ok(Encoder::Plain(PlainEncoder::new(
                physical_type,
                config.new_buffer(),
            ))),
            (Encoding::Rle, PhysicalType::Boolean) => {
                Ok(Encoder::Rle(RleValuesEncoder::new(1, config.new_buffer())))
            }
            (Encoding::DeltaBinaryPacked, PhysicalType::Int32) => Ok(
                Encoder::DeltaBinaryPacked32(DeltaBinaryPackedEncoder::new(config.new_buffer())),
            ),
            (Encoding::DeltaBinaryPacked, PhysicalType::Int64) => Ok(
                Encoder::DeltaBinaryPacked64(DeltaBinaryPackedEncoder::new(config.new_buffer())),
            ),
            (Encoding::DeltaLengthByteArray, PhysicalType::ByteArray) => {
                Ok(Encoder::DeltaLengthByteArray(
                    DeltaLengthByteArrayEncoder::new(physical_type, config),
                ))
            }
            (
                Encoding::DeltaByteArray,
                PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_),
            ) => Ok(Encoder::DeltaByteArray(DeltaByteArrayEncoder::new(
                physical_type,
                config,
            ))),
            (
                Encoding::ByteStreamSplit,
                PhysicalType::Int32
                | PhysicalType::Int64
                | PhysicalType::Float
                | PhysicalType::Double
                | PhysicalType::FixedLenByteArray(_),
            ) => Ok(Encoder::ByteStreamSplit(ByteStreamSplitEncoder::new(
                physical_type,
                config,
            ))),
            _ => Err(unsupported),
        }
    }
}

macro_rules! each_encoder {
    ($encoder:expr, $e:ident => $body:expr) => {
        match $encoder {
            Encoder::Plain($e) => $body,
            Encoder::Rle($e) => $body,
            Encoder::DeltaBinaryPacked32($e) => $body,
            Encoder::DeltaBinaryPacked64($e) => $body,
            Encoder::DeltaLengthByteArray($e) => $body,
            Encoder::DeltaByteArray($e) => $body,
            Encoder::ByteStreamSplit($e) => $body,
        }
    };
}

impl ValuesWriter for Encoder {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        each_encoder!(self, e => e.write(value))
    }

    fn buffered_size(&self) -> usize {
        each_encoder!(self, e => e.buffered_size())
    }

    fn allocated_size(&self) -> usize {
        each_encoder!(self, e => e.allocated_size())
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        each_encoder!(self, e => e.bytes())
    }

    fn encoding(&self) -> Encoding {
        each_encoder!(self, e => e.encoding())
    }

    fn reset(&mut self) {
        each_encoder!(self, e => e.reset())
    }
}
