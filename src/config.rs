use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::buffer::{initial_slab_size, BufferAllocator, HeapAllocator, SlabBuffer};
use crate::error::ConfigError;
use crate::policy::{DictionaryLimits, MAX_DICTIONARY_ENTRIES};
use crate::types::ColumnPath;

pub const DEFAULT_PAGE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_DICTIONARY_PAGE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_MAX_DICTIONARY_ENTRIES: usize = MAX_DICTIONARY_ENTRIES;
pub const DEFAULT_DICTIONARY_ENABLED: bool = true;
pub const DEFAULT_BYTE_STREAM_SPLIT_ENABLED: bool = false;
pub const DEFAULT_CHECK_DICTIONARY_COMPRESSION: bool = false;

// initial slabs reach the page size after about ten doublings
const INITIAL_SLAB_DOUBLINGS: u32 = 10;

fn require_positive(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidProperty {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn default_allocator() -> Arc<dyn BufferAllocator> {
    Arc::new(HeapAllocator)
}

/// Settings for every column writer built from them.
///
/// Global defaults can be overridden per column, keyed by the column's dotted
/// path. The allocator is not serialized, deserialized properties always use
/// [`HeapAllocator`].
///
/// ```
/// use colenc::{ColumnProperties, WriterProperties};
///
/// let props = WriterProperties::default()
///     .with_max_dictionary_entries(1000)
///     .with_column("metrics.temperature", ColumnProperties::default().with_byte_stream_split_enabled(true));
/// assert!(props.column_config(&"metrics.temperature".into()).byte_stream_split_enabled());
/// assert!(!props.column_config(&"metrics.count".into()).byte_stream_split_enabled());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriterProperties {
    page_size: usize,
    dictionary_page_size: usize,
    max_dictionary_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_slab_size: Option<usize>,
    dictionary_enabled: bool,
    byte_stream_split_enabled: bool,
    check_dictionary_compression: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    columns: BTreeMap<String, ColumnProperties>,
    #[serde(skip, default = "default_allocator")]
    allocator: Arc<dyn BufferAllocator>,
}

impl Default for WriterProperties {
    fn default() -> Self {
        WriterProperties {
            page_size: DEFAULT_PAGE_SIZE,
            dictionary_page_size: DEFAULT_DICTIONARY_PAGE_SIZE,
            max_dictionary_entries: DEFAULT_MAX_DICTIONARY_ENTRIES,
            initial_slab_size: None,
            dictionary_enabled: DEFAULT_DICTIONARY_ENABLED,
            byte_stream_split_enabled: DEFAULT_BYTE_STREAM_SPLIT_ENABLED,
            check_dictionary_compression: DEFAULT_CHECK_DICTIONARY_COMPRESSION,
            columns: BTreeMap::new(),
            allocator: default_allocator(),
        }
    }
}

impl WriterProperties {
    /// The size a page is expected to grow to, used to size encoder buffers.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// The size a page is expected to grow to, used to size encoder buffers.
    pub fn set_page_size(&mut self, page_size: usize) -> &mut Self {
        self.page_size = page_size;
        self
    }

    /// Fall back once the plain encoded dictionary grows past this many bytes.
    pub fn with_dictionary_page_size(mut self, size: usize) -> Self {
        self.dictionary_page_size = size;
        self
    }

    /// Fall back once the plain encoded dictionary grows past this many bytes.
    pub fn set_dictionary_page_size(&mut self, size: usize) -> &mut Self {
        self.dictionary_page_size = size;
        self
    }

    /// Fall back once a dictionary holds more than this many distinct values.
    pub fn with_max_dictionary_entries(mut self, entries: usize) -> Self {
        self.max_dictionary_entries = entries;
        self
    }

    /// Fall back once a dictionary holds more than this many distinct values.
    pub fn set_max_dictionary_entries(&mut self, entries: usize) -> &mut Self {
        self.max_dictionary_entries = entries;
        self
    }

    /// The size of the first slab of every encoder buffer.
    pub fn with_initial_slab_size(mut self, size: usize) -> Self {
        self.initial_slab_size = Some(size);
        self
    }

    /// The size of the first slab of every encoder buffer.
    pub fn set_initial_slab_size(&mut self, size: usize) -> &mut Self {
        self.initial_slab_size = Some(size);
        self
    }

    pub fn with_dictionary_enabled(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    pub fn set_dictionary_enabled(&mut self, enabled: bool) -> &mut Self {
        self.dictionary_enabled = enabled;
        self
    }

    pub fn with_byte_stream_split_enabled(mut self, enabled: bool) -> Self {
        self.byte_stream_split_enabled = enabled;
        self
    }

    pub fn set_byte_stream_split_enabled(&mut self, enabled: bool) -> &mut Self {
        self.byte_stream_split_enabled = enabled;
        self
    }

    /// Abandon a dictionary when a page is finalized if it did not make the
    /// page smaller than plain encoding would have.
    pub fn with_check_dictionary_compression(mut self, check: bool) -> Self {
        self.check_dictionary_compression = check;
        self
    }

    /// Abandon a dictionary when a page is finalized if it did not make the
    /// page smaller than plain encoding would have.
    pub fn set_check_dictionary_compression(&mut self, check: bool) -> &mut Self {
        self.check_dictionary_compression = check;
        self
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn BufferAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn set_allocator(&mut self, allocator: Arc<dyn BufferAllocator>) -> &mut Self {
        self.allocator = allocator;
        self
    }

    /// Override settings for the column at `path`.
    pub fn with_column<P: Into<ColumnPath>>(mut self, path: P, props: ColumnProperties) -> Self {
        self.set_column(path, props);
        self
    }

    /// Override settings for the column at `path`.
    pub fn set_column<P: Into<ColumnPath>>(&mut self, path: P, props: ColumnProperties) -> &mut Self {
        self.columns.insert(path.into().to_string(), props);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn dictionary_page_size(&self) -> usize {
        self.dictionary_page_size
    }

    pub fn max_dictionary_entries(&self) -> usize {
        self.max_dictionary_entries
    }

    pub fn initial_slab_size(&self) -> usize {
        self.initial_slab_size
            .unwrap_or_else(|| initial_slab_size(self.page_size, INITIAL_SLAB_DOUBLINGS))
    }

    pub fn column(&self, path: &ColumnPath) -> Option<&ColumnProperties> {
        self.columns.get(&path.to_string())
    }

    /// Check that these properties describe writers which can be built.
    ///
    /// [`new_values_writer`](crate::new_values_writer) checks the resolved
    /// [`ColumnConfig`] again.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("pageSize", self.page_size)?;
        require_positive("dictionaryPageSize", self.dictionary_page_size)?;
        require_positive("initialSlabSize", self.initial_slab_size())?;
        if self.max_dictionary_entries > MAX_DICTIONARY_ENTRIES {
            return Err(ConfigError::InvalidProperty {
                name: "maxDictionaryEntries",
                reason: format!("must be at most {}", MAX_DICTIONARY_ENTRIES),
            });
        }
        Ok(())
    }

    /// Resolve the settings for the column at `path`.
    pub fn column_config(&self, path: &ColumnPath) -> ColumnConfig {
        let overrides = self.column(path);
        ColumnConfig {
            path: path.clone(),
            page_size: self.page_size,
            initial_slab_size: self.initial_slab_size(),
            limits: DictionaryLimits::new(self.max_dictionary_entries, self.dictionary_page_size),
            dictionary_enabled: overrides
                .and_then(|c| c.dictionary_enabled)
                .unwrap_or(self.dictionary_enabled),
            byte_stream_split_enabled: overrides
                .and_then(|c| c.byte_stream_split_enabled)
                .unwrap_or(self.byte_stream_split_enabled),
            check_dictionary_compression: self.check_dictionary_compression,
            allocator: self.allocator.clone(),
        }
    }
}

/// Settings of a single column which override the [`WriterProperties`]
/// defaults. Unset fields fall through to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_stream_split_enabled: Option<bool>,
}

impl ColumnProperties {
    pub fn with_dictionary_enabled(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = Some(enabled);
        self
    }

    pub fn with_byte_stream_split_enabled(mut self, enabled: bool) -> Self {
        self.byte_stream_split_enabled = Some(enabled);
        self
    }
}

/// The settings of one column, fixed for the lifetime of its writer.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub(crate) path: ColumnPath,
    pub(crate) page_size: usize,
    pub(crate) initial_slab_size: usize,
    pub(crate) limits: DictionaryLimits,
    pub(crate) dictionary_enabled: bool,
    pub(crate) byte_stream_split_enabled: bool,
    pub(crate) check_dictionary_compression: bool,
    pub(crate) allocator: Arc<dyn BufferAllocator>,
}

impl ColumnConfig {
    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn initial_slab_size(&self) -> usize {
        self.initial_slab_size
    }

    pub fn dictionary_limits(&self) -> DictionaryLimits {
        self.limits
    }

    pub fn dictionary_enabled(&self) -> bool {
        self.dictionary_enabled
    }

    pub fn byte_stream_split_enabled(&self) -> bool {
        self.byte_stream_split_enabled
    }

    pub fn check_dictionary_compression(&self) -> bool {
        self.check_dictionary_compression
    }

    pub fn allocator(&self) -> &Arc<dyn BufferAllocator> {
        &self.allocator
    }

    /// Check that a writer can be built from these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("pageSize", self.page_size)?;
        require_positive("dictionaryPageSize", self.limits.max_bytes())?;
        require_positive("initialSlabSize", self.initial_slab_size)
    }

    /// A fresh, empty buffer for an encoder of this column
    pub fn new_buffer(&self) -> SlabBuffer {
        SlabBuffer::new(self.initial_slab_size, self.page_size, self.allocator.clone())
    }
}
