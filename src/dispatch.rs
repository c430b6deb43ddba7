//! Picks the encodings a column is written with.

use crate::config::ColumnConfig;
use crate::dictionary::DictionaryFallbackWriter;
use crate::encoding::Encoder;
use crate::error::ConfigError;
use crate::policy::{is_byte_stream_split_enabled, is_dictionary_enabled};
use crate::types::{ColumnDescriptor, Encoding, PhysicalType};
use crate::writer::ColumnValuesWriter;

/// The encodings chosen for a column.
///
/// `primary` is what a page starts out encoded with. When it is a dictionary
/// encoding, `fallback` is what the writer switches to once the dictionary is
/// abandoned, otherwise the two are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingPlan {
    pub primary: Encoding,
    pub fallback: Encoding,
}

impl EncodingPlan {
    pub fn uses_dictionary(&self) -> bool {
        self.primary.is_dictionary()
    }
}

/// Choose the encodings for values of `physical_type` under `config`.
///
/// | type | fallback | with byte stream split |
/// |---|---|---|
/// | boolean | RLE | RLE |
/// | fixed len byte array | DELTA_BYTE_ARRAY | BYTE_STREAM_SPLIT |
/// | byte array | DELTA_BYTE_ARRAY | DELTA_BYTE_ARRAY |
/// | int32, int64 | DELTA_BINARY_PACKED | BYTE_STREAM_SPLIT |
/// | int96 | PLAIN | PLAIN |
/// | float, double | PLAIN | BYTE_STREAM_SPLIT |
///
/// Every type but boolean and int96 is dictionary encoded first unless the
/// column has dictionaries disabled.
pub fn select_encoding(physical_type: PhysicalType, config: &ColumnConfig) -> EncodingPlan {
    let split = is_byte_stream_split_enabled(config);
    let fallback = match physical_type {
        PhysicalType::Boolean => Encoding::Rle,
        PhysicalType::FixedLenByteArray(_) if split => Encoding::ByteStreamSplit,
        PhysicalType::FixedLenByteArray(_) => Encoding::DeltaByteArray,
        PhysicalType::ByteArray => Encoding::DeltaByteArray,
        PhysicalType::Int32 | PhysicalType::Int64 if split => Encoding::ByteStreamSplit,
        PhysicalType::Int32 | PhysicalType::Int64 => Encoding::DeltaBinaryPacked,
        PhysicalType::Int96 => Encoding::Plain,
        PhysicalType::Float | PhysicalType::Double if split => Encoding::ByteStreamSplit,
        PhysicalType::Float | PhysicalType::Double => Encoding::Plain,
    };
    let dictionary = match physical_type {
        PhysicalType::Boolean | PhysicalType::Int96 => false,
        _ => is_dictionary_enabled(config),
    };
    EncodingPlan {
        primary: if dictionary {
            Encoding::RleDictionary
        } else {
            fallback
        },
        fallback,
    }
}

/// Build the writer the page layer feeds the values of `column` to.
#[tracing::instrument(skip(column, config), fields(column = %column), err)]
pub fn new_values_writer(
    column: &ColumnDescriptor,
    config: &ColumnConfig,
) -> Result<ColumnValuesWriter, ConfigError> {
    config.validate()?;
    let physical_type = column.physical_type();
    if physical_type == PhysicalType::FixedLenByteArray(0) {
        return Err(ConfigError::MissingTypeLength);
    }
    let plan = select_encoding(physical_type, config);
    let fallback = Encoder::new(plan.fallback, physical_type, config)?;
    tracing::trace!(primary = %plan.primary, fallback = %plan.fallback, "new column writer");
    let writer = if plan.uses_dictionary() {
        ColumnValuesWriter::dictionary(
            column.clone(),
            plan,
            DictionaryFallbackWriter::new(physical_type, config, fallback),
        )
    } else {
        ColumnValuesWriter::direct(column.clone(), plan, fallback)
    };
    Ok(writer)
}
