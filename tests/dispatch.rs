use colenc::{
    new_values_writer, select_encoding, ColumnDescriptor, ColumnProperties, ConfigError, Encoding,
    EncodingPlan, PhysicalType, ValuesWriter, Value, WriterProperties,
};

// set up logging for all the tests
use test_log::test;

use pretty_assertions::assert_eq;

const ALL_TYPES: [PhysicalType; 8] = [
    PhysicalType::Boolean,
    PhysicalType::FixedLenByteArray(16),
    PhysicalType::ByteArray,
    PhysicalType::Int32,
    PhysicalType::Int64,
    PhysicalType::Int96,
    PhysicalType::Double,
    PhysicalType::Float,
];

fn expected_fallback(physical_type: PhysicalType, split: bool) -> Encoding {
    match (physical_type, split) {
        (PhysicalType::Boolean, _) => Encoding::Rle,
        (PhysicalType::FixedLenByteArray(_), false) => Encoding::DeltaByteArray,
        (PhysicalType::FixedLenByteArray(_), true) => Encoding::ByteStreamSplit,
        (PhysicalType::ByteArray, _) => Encoding::DeltaByteArray,
        (PhysicalType::Int32, false) => Encoding::DeltaBinaryPacked,
        (PhysicalType::Int32, true) => Encoding::ByteStreamSplit,
        (PhysicalType::Int64, false) => Encoding::DeltaBinaryPacked,
        (PhysicalType::Int64, true) => Encoding::ByteStreamSplit,
        (PhysicalType::Int96, _) => Encoding::Plain,
        (PhysicalType::Double, false) => Encoding::Plain,
        (PhysicalType::Double, true) => Encoding::ByteStreamSplit,
        (PhysicalType::Float, false) => Encoding::Plain,
        (PhysicalType::Float, true) => Encoding::ByteStreamSplit,
    }
}

fn sample(physical_type: PhysicalType) -> Value<'static> {
    match physical_type {
        PhysicalType::Boolean => Value::Boolean(true),
        PhysicalType::Int32 => Value::Int32(1),
        PhysicalType::Int64 => Value::Int64(1),
        PhysicalType::Int96 => Value::Int96([1; 12]),
        PhysicalType::Float => Value::Float(1.0),
        PhysicalType::Double => Value::Double(1.0),
        PhysicalType::ByteArray => Value::from("one").into_owned(),
        PhysicalType::FixedLenByteArray(width) => Value::from(vec![1; width]),
    }
}

#[test]
fn selection_table_is_exhaustive() {
    for split in [false, true] {
        let config = WriterProperties::default()
            .with_byte_stream_split_enabled(split)
            .column_config(&"c".into());
        for physical_type in ALL_TYPES {
            let fallback = expected_fallback(physical_type, split);
            let primary = match physical_type {
                PhysicalType::Boolean | PhysicalType::Int96 => fallback,
                _ => Encoding::RleDictionary,
            };
            assert_eq!(
                select_encoding(physical_type, &config),
                EncodingPlan { primary, fallback },
                "{} with byte stream split {}",
                physical_type,
                split
            );
        }
    }
}

#[test]
fn boolean_and_int96_never_use_a_dictionary() {
    let configs = [
        WriterProperties::default(),
        WriterProperties::default().with_byte_stream_split_enabled(true),
        WriterProperties::default().with_max_dictionary_entries(0),
        WriterProperties::default().with_check_dictionary_compression(true),
    ];
    for props in configs {
        for physical_type in [PhysicalType::Boolean, PhysicalType::Int96] {
            let column = ColumnDescriptor::new("c", physical_type);
            let mut writer = new_values_writer(&column, &props.column_config(column.path())).unwrap();
            assert!(!writer.plan().uses_dictionary());
            for _ in 0..10 {
                writer.write(sample(physical_type)).unwrap();
                assert!(!writer.encoding().is_dictionary());
            }
            let page = writer.flush_page().unwrap();
            assert!(!page.encoding.is_dictionary());
            assert_eq!(page.dictionary, None);
            assert_eq!(page.decode(&column).unwrap(), vec![sample(physical_type); 10]);
        }
    }
}

#[test]
fn every_type_writes_and_decodes_under_every_plan() {
    for split in [false, true] {
        for dictionary in [false, true] {
            let props = WriterProperties::default()
                .with_byte_stream_split_enabled(split)
                .with_dictionary_enabled(dictionary);
            for physical_type in ALL_TYPES {
                let column = ColumnDescriptor::new("c", physical_type);
                let mut writer =
                    new_values_writer(&column, &props.column_config(column.path())).unwrap();
                writer.write(sample(physical_type)).unwrap();
                writer.write(sample(physical_type)).unwrap();
                let page = writer.flush_page().unwrap();
                assert_eq!(
                    page.decode(&column).unwrap(),
                    vec![sample(physical_type); 2],
                    "{} as {}",
                    physical_type,
                    page.encoding
                );
            }
        }
    }
}

#[test]
fn per_column_byte_stream_split() {
    let props = WriterProperties::default().with_column(
        "floats.split",
        ColumnProperties::default().with_byte_stream_split_enabled(true),
    );
    let split = select_encoding(PhysicalType::Double, &props.column_config(&"floats.split".into()));
    let plain = select_encoding(PhysicalType::Double, &props.column_config(&"floats.plain".into()));
    assert_eq!(split.fallback, Encoding::ByteStreamSplit);
    assert_eq!(plain.fallback, Encoding::Plain);
}

#[test]
fn unknown_physical_types_fail_construction() {
    assert_eq!(
        ColumnDescriptor::from_raw("c", 42, None),
        Err(ConfigError::UnknownPhysicalType(42))
    );
    assert_eq!(
        ColumnDescriptor::from_raw("c", 7, None),
        Err(ConfigError::MissingTypeLength)
    );
    let column = ColumnDescriptor::from_raw("c", 7, Some(4)).unwrap();
    assert_eq!(column.physical_type(), PhysicalType::FixedLenByteArray(4));
}
