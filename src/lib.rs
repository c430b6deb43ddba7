//! # Colenc
//!
//! Chooses how each column of a columnar page writer encodes its values, and
//! runs the dictionary encoding most columns start out with.
//!
//! A column is described by a [`ColumnDescriptor`]: its path and its
//! [`PhysicalType`]. [`WriterProperties`] resolve into a per column
//! [`ColumnConfig`], and [`select_encoding`] turns the two into an
//! [`EncodingPlan`]: the encoding a page starts with and the one it falls back
//! to. [`new_values_writer`] builds the [`ColumnValuesWriter`] which the page
//! layer then feeds values to, one at a time, in row order.
//!
//! Apart from booleans and int96 every column starts out dictionary encoded.
//! The [`DictionaryFallbackWriter`] deduplicates values into a [`Dictionary`]
//! until the dictionary holds more entries, or takes more bytes, than the
//! column allows. At that point every value written so far is replayed, in
//! order, into the fallback encoder and the dictionary is dropped. A page
//! records whichever encoding was in force when it was flushed.
//!
//! ```
//! use colenc::{new_values_writer, ColumnDescriptor, Encoding, PhysicalType, Value, WriterProperties};
//!
//! let column = ColumnDescriptor::new("sensor.reading", PhysicalType::Int32);
//! let props = WriterProperties::default().with_max_dictionary_entries(3);
//! let mut writer = new_values_writer(&column, &props.column_config(column.path()))?;
//!
//! for v in [5, 7, 5, 9, 12, 7] {
//!     writer.write_value(v)?;
//! }
//! // the fourth distinct value pushed the column off its dictionary
//! assert!(writer.is_fallen_back());
//!
//! let page = writer.flush_page()?;
//! assert_eq!(page.encoding, Encoding::DeltaBinaryPacked);
//! let values: Vec<Value<'_>> = [5, 7, 5, 9, 12, 7].into_iter().map(Value::Int32).collect();
//! assert_eq!(page.decode(&column)?, values);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Encodings
//!
//! The encoders follow the parquet layouts: PLAIN, RLE (the run length / bit
//! packed hybrid), DELTA_BINARY_PACKED, DELTA_LENGTH_BYTE_ARRAY,
//! DELTA_BYTE_ARRAY, BYTE_STREAM_SPLIT and RLE_DICTIONARY data pages with PLAIN
//! dictionary pages. [`decode_page`] reads all of them back.
//!
//! ## Memory
//!
//! Encoders write into slab buffers obtained from the column's
//! [`BufferAllocator`]. A failed allocation is returned as an [`AllocError`]
//! and never retried.

mod buffer;
mod config;
mod decode;
mod dictionary;
mod dispatch;
pub mod encoding;
pub mod error;
mod policy;
mod types;
mod value;
mod writer;

pub use buffer::{BufferAllocator, HeapAllocator, SlabBuffer};
pub use config::{
    ColumnConfig, ColumnProperties, WriterProperties, DEFAULT_BYTE_STREAM_SPLIT_ENABLED,
    DEFAULT_CHECK_DICTIONARY_COMPRESSION, DEFAULT_DICTIONARY_ENABLED, DEFAULT_DICTIONARY_PAGE_SIZE,
    DEFAULT_MAX_DICTIONARY_ENTRIES, DEFAULT_PAGE_SIZE,
};
pub use decode::{decode_dictionary_page, decode_page};
pub use dictionary::{Dictionary, DictionaryFallbackWriter, DictionaryPage};
pub use dispatch::{new_values_writer, select_encoding, EncodingPlan};
pub use encoding::{Encoder, ValuesWriter};
pub use error::{AllocError, ConfigError, DecodeError, WriteError};
pub use policy::{
    is_byte_stream_split_enabled, is_dictionary_enabled, is_dictionary_profitable, DictionaryLimits,
    FallbackReason, MAX_DICTIONARY_ENTRIES,
};
pub use types::{ColumnDescriptor, ColumnPath, Encoding, PhysicalType};
pub use value::Value;
pub use writer::{ColumnValuesWriter, EncodedPage};
