use thiserror::Error;

use crate::types::{Encoding, PhysicalType};

/// A column could not be given a writer.
///
/// These are raised when a writer is constructed and are never recovered
/// from by substituting some default encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown physical type code {0}")]
    UnknownPhysicalType(i32),
    #[error("fixed length byte array columns need a positive type length")]
    MissingTypeLength,
    #[error("unknown encoding code {0}")]
    UnknownEncoding(i32),
    #[error("{encoding} cannot encode {physical_type} values")]
    UnsupportedEncoding {
        encoding: Encoding,
        physical_type: PhysicalType,
    },
    #[error("invalid value for `{name}`: {reason}")]
    InvalidProperty { name: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to allocate {requested} bytes")]
pub struct AllocError {
    pub requested: usize,
}

impl AllocError {
    pub fn new(requested: usize) -> Self {
        Self { requested }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("invalid type of value, expected `{expected}` but received `{received}`")]
    TypeMismatch {
        expected: PhysicalType,
        received: &'static str,
    },
    #[error("fixed length value has {received} bytes, expected {expected}")]
    InvalidLength { expected: usize, received: usize },
    #[error("byte array of {0} bytes is too large to encode")]
    ValueTooLarge(usize),
    #[error("the page has been finalized, reset the writer before writing again")]
    PageFinalized,
    #[error("no dictionary is available, the writer fell back to {0}")]
    NoDictionary(Encoding),
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("bad leb128")]
    BadLeb(#[from] ::leb128::read::Error),
    #[error("trying to read past end")]
    TryingToReadPastEnd,
    #[error("invalid bit width {0}")]
    InvalidBitWidth(u8),
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    #[error("negative length {0}")]
    NegativeLength(i64),
    #[error("dictionary encoded page decoded without a dictionary")]
    MissingDictionary,
    #[error("dictionary index {index} out of range for dictionary of {len} entries")]
    InvalidDictionaryIndex { index: u64, len: usize },
    #[error("{encoding} cannot decode {physical_type} values")]
    UnsupportedEncoding {
        encoding: Encoding,
        physical_type: PhysicalType,
    },
    #[error("expected {expected} values but decoded {decoded}")]
    ValueCountMismatch { expected: usize, decoded: usize },
    #[error("attempted to allocate {attempted} which is larger than the maximum of {maximum}")]
    OverlargeAllocation { attempted: usize, maximum: usize },
}
