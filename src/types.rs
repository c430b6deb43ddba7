use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The physical storage type of a column.
///
/// This is the closed set of value layouts a page can hold. Logical types
/// (dates, decimals, strings, ...) are all stored as one of these.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    /// A legacy 12 byte timestamp
    Int96,
    Float,
    Double,
    /// Variable length bytes
    ByteArray,
    /// Bytes of a fixed width, the width is the column's type length
    FixedLenByteArray(usize),
}

impl PhysicalType {
    /// Parse a physical type from its parquet type code.
    ///
    /// `type_length` is only consulted for fixed length byte arrays and must be
    /// present and positive for them.
    pub fn from_raw(code: i32, type_length: Option<usize>) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(Self::Boolean),
            1 => Ok(Self::Int32),
            2 => Ok(Self::Int64),
            3 => Ok(Self::Int96),
            4 => Ok(Self::Float),
            5 => Ok(Self::Double),
            6 => Ok(Self::ByteArray),
            7 => match type_length {
                Some(len) if len > 0 => Ok(Self::FixedLenByteArray(len)),
                _ => Err(ConfigError::MissingTypeLength),
            },
            other => Err(ConfigError::UnknownPhysicalType(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Boolean => 0,
            Self::Int32 => 1,
            Self::Int64 => 2,
            Self::Int96 => 3,
            Self::Float => 4,
            Self::Double => 5,
            Self::ByteArray => 6,
            Self::FixedLenByteArray(_) => 7,
        }
    }

    /// The width in bytes of a single value, `None` for variable length types
    /// and for booleans (which are stored as bits).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::ByteArray => None,
            Self::Int32 | Self::Float => Some(4),
            Self::Int64 | Self::Double => Some(8),
            Self::Int96 => Some(12),
            Self::FixedLenByteArray(len) => Some(*len),
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Int32 => write!(f, "INT32"),
            Self::Int64 => write!(f, "INT64"),
            Self::Int96 => write!(f, "INT96"),
            Self::Float => write!(f, "FLOAT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::ByteArray => write!(f, "BYTE_ARRAY"),
            Self::FixedLenByteArray(len) => write!(f, "FIXED_LEN_BYTE_ARRAY({})", len),
        }
    }
}

/// The on-wire scheme used for the values of a page.
///
/// Every emitted page is labelled with one of these so a reader knows how to
/// decode it.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Encoding {
    Plain,
    /// Deprecated dictionary encoding, decodable but never written
    PlainDictionary,
    /// Run length / bit packed hybrid
    Rle,
    /// Deprecated bit packed encoding, never written
    BitPacked,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    /// Dictionary indices as a run length / bit packed hybrid
    RleDictionary,
    ByteStreamSplit,
}

impl Encoding {
    pub fn from_raw(code: i32) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(Self::Plain),
            2 => Ok(Self::PlainDictionary),
            3 => Ok(Self::Rle),
            4 => Ok(Self::BitPacked),
            5 => Ok(Self::DeltaBinaryPacked),
            6 => Ok(Self::DeltaLengthByteArray),
            7 => Ok(Self::DeltaByteArray),
            8 => Ok(Self::RleDictionary),
            9 => Ok(Self::ByteStreamSplit),
            other => Err(ConfigError::UnknownEncoding(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Plain => 0,
            Self::PlainDictionary => 2,
            Self::Rle => 3,
            Self::BitPacked => 4,
            Self::DeltaBinaryPacked => 5,
            Self::DeltaLengthByteArray => 6,
            Self::DeltaByteArray => 7,
            Self::RleDictionary => 8,
            Self::ByteStreamSplit => 9,
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Self::PlainDictionary | Self::RleDictionary)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "PLAIN",
            Self::PlainDictionary => "PLAIN_DICTIONARY",
            Self::Rle => "RLE",
            Self::BitPacked => "BIT_PACKED",
            Self::DeltaBinaryPacked => "DELTA_BINARY_PACKED",
            Self::DeltaLengthByteArray => "DELTA_LENGTH_BYTE_ARRAY",
            Self::DeltaByteArray => "DELTA_BYTE_ARRAY",
            Self::RleDictionary => "RLE_DICTIONARY",
            Self::ByteStreamSplit => "BYTE_STREAM_SPLIT",
        };
        write!(f, "{}", name)
    }
}

/// The dotted path of a column in a (possibly nested) schema.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ColumnPath(Vec<String>);

impl ColumnPath {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.0.iter().enumerate() {
            if index != 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl From<&str> for ColumnPath {
    fn from(s: &str) -> Self {
        Self(s.split('.').map(String::from).collect())
    }
}

impl From<String> for ColumnPath {
    fn from(s: String) -> Self {
        ColumnPath::from(s.as_str())
    }
}

impl From<Vec<String>> for ColumnPath {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

/// A leaf column: where it lives in the schema and how its values are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    path: ColumnPath,
    physical_type: PhysicalType,
}

impl ColumnDescriptor {
    pub fn new<P: Into<ColumnPath>>(path: P, physical_type: PhysicalType) -> Self {
        Self {
            path: path.into(),
            physical_type,
        }
    }

    /// Build a descriptor from a parquet type code, failing on codes this
    /// crate does not know how to write.
    pub fn from_raw<P: Into<ColumnPath>>(
        path: P,
        type_code: i32,
        type_length: Option<usize>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(path, PhysicalType::from_raw(type_code, type_length)?))
    }

    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.physical_type, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_type_codes_round_trip() {
        let types = [
            PhysicalType::Boolean,
            PhysicalType::Int32,
            PhysicalType::Int64,
            PhysicalType::Int96,
            PhysicalType::Float,
            PhysicalType::Double,
            PhysicalType::ByteArray,
            PhysicalType::FixedLenByteArray(16),
        ];
        for typ in types {
            assert_eq!(PhysicalType::from_raw(typ.code(), Some(16)).unwrap(), typ);
        }
    }

    #[test]
    fn unknown_physical_type_is_an_error() {
        assert_eq!(
            PhysicalType::from_raw(8, None),
            Err(ConfigError::UnknownPhysicalType(8))
        );
        assert_eq!(
            PhysicalType::from_raw(-1, None),
            Err(ConfigError::UnknownPhysicalType(-1))
        );
    }

    #[test]
    fn fixed_len_byte_array_needs_a_length() {
        assert_eq!(
            PhysicalType::from_raw(7, None),
            Err(ConfigError::MissingTypeLength)
        );
        assert_eq!(
            PhysicalType::from_raw(7, Some(0)),
            Err(ConfigError::MissingTypeLength)
        );
    }

    #[test]
    fn encoding_codes_round_trip() {
        for code in [0, 2, 3, 4, 5, 6, 7, 8, 9] {
            assert_eq!(Encoding::from_raw(code).unwrap().code(), code);
        }
        assert_eq!(Encoding::from_raw(1), Err(ConfigError::UnknownEncoding(1)));
    }

    #[test]
    fn column_path_display() {
        let path = ColumnPath::from("a.b.c");
        assert_eq!(path.parts().len(), 3);
        assert_eq!(path.to_string(), "a.b.c");
    }
}
