//! Turns a column's configuration into the decisions the dispatcher and the
//! dictionary writer act on. Nothing here has state of its own.

use std::fmt;

use crate::config::ColumnConfig;

/// The largest dictionary any column may build. Dictionary indices are
/// written as non negative int32s.
pub const MAX_DICTIONARY_ENTRIES: usize = (i32::MAX - 1) as usize;

/// Whether the column's fallback encoder should be byte stream split for the
/// types which support it.
pub fn is_byte_stream_split_enabled(config: &ColumnConfig) -> bool {
    config.byte_stream_split_enabled
}

/// Whether the column is wrapped in a dictionary writer at all.
pub fn is_dictionary_enabled(config: &ColumnConfig) -> bool {
    config.dictionary_enabled
}

/// Why a dictionary writer gave up its dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// More distinct values than the configured maximum
    TooManyEntries,
    /// The plain encoded dictionary grew past the dictionary page size
    DictionaryTooLarge,
    /// The finished page was no smaller than plain encoding would be
    Unprofitable,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyEntries => write!(f, "too many dictionary entries"),
            Self::DictionaryTooLarge => write!(f, "dictionary page too large"),
            Self::Unprofitable => write!(f, "dictionary encoding did not pay off"),
        }
    }
}

/// How large a dictionary may grow before it is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryLimits {
    max_entries: usize,
    max_bytes: usize,
}

impl DictionaryLimits {
    /// `max_entries` is clamped to [`MAX_DICTIONARY_ENTRIES`].
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        DictionaryLimits {
            max_entries: max_entries.min(MAX_DICTIONARY_ENTRIES),
            max_bytes,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check a dictionary of `entries` distinct values which takes `bytes`
    /// bytes plain encoded. The entry count is checked before the size, when
    /// both are exceeded the reason is [`FallbackReason::TooManyEntries`].
    pub fn check(&self, entries: usize, bytes: usize) -> Option<FallbackReason> {
        if entries > self.max_entries {
            Some(FallbackReason::TooManyEntries)
        } else if bytes > self.max_bytes {
            Some(FallbackReason::DictionaryTooLarge)
        } else {
            None
        }
    }
}

/// Whether a dictionary encoded page beats writing the same values plain.
pub fn is_dictionary_profitable(encoded_bytes: usize, dictionary_bytes: usize, plain_bytes: usize) -> bool {
    encoded_bytes.saturating_add(dictionary_bytes) < plain_bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnProperties, WriterProperties};

    #[test]
    fn entries_are_checked_before_bytes() {
        let limits = DictionaryLimits::new(3, 100);
        assert_eq!(limits.check(3, 100), None);
        assert_eq!(limits.check(4, 100), Some(FallbackReason::TooManyEntries));
        assert_eq!(limits.check(3, 101), Some(FallbackReason::DictionaryTooLarge));
        assert_eq!(limits.check(4, 101), Some(FallbackReason::TooManyEntries));
    }

    #[test]
    fn entry_limit_is_clamped() {
        let limits = DictionaryLimits::new(usize::MAX, 1);
        assert_eq!(limits.max_entries(), MAX_DICTIONARY_ENTRIES);
    }

    #[test]
    fn features_follow_column_overrides() {
        let props = WriterProperties::default().with_column(
            "x",
            ColumnProperties::default()
                .with_byte_stream_split_enabled(true)
                .with_dictionary_enabled(false),
        );
        let x = props.column_config(&"x".into());
        assert!(is_byte_stream_split_enabled(&x));
        assert!(!is_dictionary_enabled(&x));

        let y = props.column_config(&"y".into());
        assert!(!is_byte_stream_split_enabled(&y));
        assert!(is_dictionary_enabled(&y));
    }

    #[test]
    fn profitability() {
        assert!(is_dictionary_profitable(10, 20, 31));
        assert!(!is_dictionary_profitable(10, 20, 30));
    }
}
