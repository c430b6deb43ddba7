//! Reading pages back.
//!
//! Every encoding a [`ColumnValuesWriter`](crate::ColumnValuesWriter) can emit
//! decodes here, which is what lets the round trip of a column be checked.

use crate::dictionary::DictionaryPage;
use crate::encoding::{
    decode_byte_stream_split, decode_delta_binary_packed, decode_delta_byte_array,
    decode_delta_length_byte_array, decode_rle_booleans, raw::RawDecoder, DeltaInt, PlainDecoder,
    RleBitPackedDecoder,
};
use crate::error::DecodeError;
use crate::types::{Encoding, PhysicalType};
use crate::value::Value;

/// Decode `num_values` values of `physical_type` from a page encoded with
/// `encoding`.
///
/// Dictionary encoded pages need the dictionary page they were written with.
pub fn decode_page<'a>(
    physical_type: PhysicalType,
    encoding: Encoding,
    data: &'a [u8],
    num_values: usize,
    dictionary: Option<&'a DictionaryPage>,
) -> Result<Vec<Value<'a>>, DecodeError> {
    let unsupported = DecodeError::UnsupportedEncoding {
        encoding,
        physical_type,
    };
    let values = match (encoding, physical_type) {
        (Encoding::Plain, PhysicalType::Boolean) => return Err(unsupported),
        (Encoding::Plain, _) => decode_plain(physical_type, data)?,
        (Encoding::Rle, PhysicalType::Boolean) => decode_rle_booleans(data, num_values)?
            .into_iter()
            .map(Value::Boolean)
            .collect(),
        (Encoding::RleDictionary | Encoding::PlainDictionary, PhysicalType::Boolean) => {
            return Err(unsupported)
        }
        (Encoding::RleDictionary | Encoding::PlainDictionary, _) => {
            let dictionary = dictionary.ok_or(DecodeError::MissingDictionary)?;
            decode_dictionary_indices(physical_type, data, num_values, dictionary)?
        }
        (Encoding::DeltaBinaryPacked, PhysicalType::Int32) => decode_delta::<i32>(data)?,
        (Encoding::DeltaBinaryPacked, PhysicalType::Int64) => decode_delta::<i64>(data)?,
        (Encoding::DeltaLengthByteArray, PhysicalType::ByteArray) => {
            decode_delta_length_byte_array(data)?.0
        }
        (
            Encoding::DeltaByteArray,
            PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_),
        ) => decode_delta_byte_array(physical_type, data)?,
        (
            Encoding::ByteStreamSplit,
            PhysicalType::Int32
            | PhysicalType::Int64
            | PhysicalType::Float
            | PhysicalType::Double
            | PhysicalType::FixedLenByteArray(_),
        ) => decode_byte_stream_split(physical_type, data)?,
        _ => return Err(unsupported),
    };
    if values.len() != num_values {
        return Err(DecodeError::ValueCountMismatch {
            expected: num_values,
            decoded: values.len(),
        });
    }
    Ok(values)
}

/// Decode the values of a dictionary page.
pub fn decode_dictionary_page(
    physical_type: PhysicalType,
    page: &DictionaryPage,
) -> Result<Vec<Value<'_>>, DecodeError> {
    if page.encoding != Encoding::Plain && page.encoding != Encoding::PlainDictionary {
        return Err(DecodeError::UnsupportedEncoding {
            encoding: page.encoding,
            physical_type,
        });
    }
    let values = decode_plain(physical_type, &page.data)?;
    if values.len() != page.num_values {
        return Err(DecodeError::ValueCountMismatch {
            expected: page.num_values,
            decoded: values.len(),
        });
    }
    Ok(values)
}

fn decode_plain(physical_type: PhysicalType, data: &[u8]) -> Result<Vec<Value<'_>>, DecodeError> {
    PlainDecoder::new(physical_type, data).collect()
}

fn decode_delta<T: DeltaInt>(data: &[u8]) -> Result<Vec<Value<'static>>, DecodeError> {
    let (values, _) = decode_delta_binary_packed::<T>(data)?;
    Ok(values.into_iter().map(T::into_value).collect())
}

fn decode_dictionary_indices<'a>(
    physical_type: PhysicalType,
    data: &[u8],
    num_values: usize,
    dictionary: &'a DictionaryPage,
) -> Result<Vec<Value<'a>>, DecodeError> {
    let entries = decode_dictionary_page(physical_type, dictionary)?;
    let mut decoder = RawDecoder::new(data);
    let bit_width = decoder.read_u8()?;
    if bit_width > 32 {
        return Err(DecodeError::InvalidBitWidth(bit_width));
    }
    let indices = &data[decoder.offset()..];
    RleBitPackedDecoder::new(indices, bit_width)?
        .take(num_values)
        .map(|index| {
            let index = index?;
            usize::try_from(index)
                .ok()
                .and_then(|i| entries.get(i))
                .cloned()
                .ok_or(DecodeError::InvalidDictionaryIndex {
                    index,
                    len: entries.len(),
                })
        })
        .collect()
}
