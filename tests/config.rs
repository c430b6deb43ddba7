use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use colenc::{
    new_values_writer, AllocError, BufferAllocator, ColumnDescriptor, ColumnProperties,
    ConfigError, Encoding, PhysicalType, ValuesWriter, Value, WriteError, WriterProperties,
};

// set up logging for all the tests
use test_log::test;

use pretty_assertions::assert_eq;

#[test]
fn load_properties_from_json() {
    let json = r#"{
        "pageSize": 65536,
        "maxDictionaryEntries": 100,
        "byteStreamSplitEnabled": true,
        "columns": {
            "a.b": { "dictionaryEnabled": false }
        }
    }"#;
    let props: WriterProperties = serde_json::from_str(json).unwrap();
    props.validate().unwrap();
    assert_eq!(props.page_size(), 65536);
    assert_eq!(props.max_dictionary_entries(), 100);
    // unset fields keep their defaults
    assert_eq!(props.dictionary_page_size(), colenc::DEFAULT_DICTIONARY_PAGE_SIZE);
    assert_eq!(props.initial_slab_size(), 64);
    assert_eq!(
        props.column(&"a.b".into()),
        Some(&ColumnProperties::default().with_dictionary_enabled(false))
    );

    let config = props.column_config(&"a.b".into());
    assert!(!config.dictionary_enabled());
    assert!(config.byte_stream_split_enabled());
    assert_eq!(config.dictionary_limits().max_entries(), 100);
}

#[test]
fn properties_survive_serialization() {
    let props = WriterProperties::default()
        .with_page_size(4096)
        .with_initial_slab_size(128)
        .with_column("x", ColumnProperties::default().with_byte_stream_split_enabled(true));
    let json = serde_json::to_value(&props).unwrap();
    assert_eq!(json["pageSize"], 4096);
    assert_eq!(json["initialSlabSize"], 128);
    assert_eq!(json["columns"]["x"]["byteStreamSplitEnabled"], true);

    let back: WriterProperties = serde_json::from_value(json).unwrap();
    assert_eq!(back.page_size(), 4096);
    assert_eq!(back.initial_slab_size(), 128);
    assert!(back.column_config(&"x".into()).byte_stream_split_enabled());
}

#[test]
fn invalid_json_properties_fail_validation() {
    let props: WriterProperties = serde_json::from_str(r#"{"dictionaryPageSize": 0}"#).unwrap();
    assert!(matches!(
        props.validate(),
        Err(ConfigError::InvalidProperty {
            name: "dictionaryPageSize",
            ..
        })
    ));
}

#[test]
fn writers_are_not_built_from_invalid_properties() {
    let column = ColumnDescriptor::new("c", PhysicalType::Int32);
    let cases = [
        (WriterProperties::default().with_page_size(0), "pageSize"),
        (WriterProperties::default().with_dictionary_page_size(0), "dictionaryPageSize"),
        (WriterProperties::default().with_initial_slab_size(0), "initialSlabSize"),
    ];
    for (props, expected) in cases {
        let result = new_values_writer(&column, &props.column_config(column.path()));
        assert!(
            matches!(result, Err(ConfigError::InvalidProperty { name, .. }) if name == expected),
            "{}",
            expected
        );
    }
}

/// Hands out at most `budget` bytes in total
#[derive(Debug)]
struct Budget {
    remaining: AtomicUsize,
    released: AtomicUsize,
}

impl Budget {
    fn new(budget: usize) -> Arc<Self> {
        Arc::new(Budget {
            remaining: AtomicUsize::new(budget),
            released: AtomicUsize::new(0),
        })
    }
}

impl BufferAllocator for Budget {
    fn allocate(&self, capacity: usize) -> Result<Vec<u8>, AllocError> {
        let left = self.remaining.load(Ordering::SeqCst);
        if capacity > left {
            return Err(AllocError::new(capacity));
        }
        self.remaining.store(left - capacity, Ordering::SeqCst);
        Ok(Vec::with_capacity(capacity))
    }

    fn release(&self, buffer: Vec<u8>) {
        self.released.fetch_add(buffer.capacity(), Ordering::SeqCst);
    }
}

#[test]
fn allocation_failures_are_returned() {
    let budget = Budget::new(256);
    let props = WriterProperties::default()
        .with_initial_slab_size(64)
        .with_dictionary_enabled(false)
        .with_allocator(budget.clone());
    let column = ColumnDescriptor::new("c", PhysicalType::Double);
    let mut w = new_values_writer(&column, &props.column_config(column.path())).unwrap();
    assert_eq!(w.encoding(), Encoding::Plain);

    let mut result = Ok(());
    let mut written = 0;
    while result.is_ok() && written < 1000 {
        result = w.write_value(written as f64);
        written += 1;
    }
    assert!(matches!(result, Err(WriteError::Alloc(_))));
    assert!(written < 1000);

    w.reset();
    assert!(budget.released.load(Ordering::SeqCst) > 0);
}

#[test]
fn the_allocator_is_shared_by_every_encoder_of_a_column() {
    let budget = Budget::new(1 << 20);
    let props = WriterProperties::default()
        .with_max_dictionary_entries(0)
        .with_allocator(budget.clone());
    let column = ColumnDescriptor::new("c", PhysicalType::ByteArray);
    let mut w = new_values_writer(&column, &props.column_config(column.path())).unwrap();
    for v in ["a", "b", "c"] {
        w.write(Value::from(v)).unwrap();
    }
    w.flush_page().unwrap();
    assert!(budget.remaining.load(Ordering::SeqCst) < 1 << 20);
}
