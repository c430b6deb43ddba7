//! Dictionary encoding with a one way fallback to a plain value encoder.
//!
//! A [`DictionaryFallbackWriter`] starts out deduplicating values into a
//! [`Dictionary`] and recording, for every value written, its index. Once the
//! dictionary grows past its [`DictionaryLimits`] the writer hands every value
//! it has seen so far, in the order they were written, to its fallback encoder
//! and from then on writes straight through to that encoder. The fallback
//! encoder is built along with the writer so that falling back never has to
//! construct anything.

use std::mem;

use rustc_hash::FxHashMap;

use crate::config::ColumnConfig;
use crate::encoding::{bitpack, plain_size, write_plain, RleState, ValuesWriter};
use crate::error::{AllocError, WriteError};
use crate::policy::{is_dictionary_profitable, DictionaryLimits, FallbackReason};
use crate::types::{ColumnPath, Encoding, PhysicalType};
use crate::value::Value;

/// The distinct values of a page, in the order they were first seen.
#[derive(Debug, Clone)]
pub struct Dictionary {
    physical_type: PhysicalType,
    values: Vec<Value<'static>>,
    // keyed by the value's raw bytes so floats are compared bitwise
    lookup: FxHashMap<Vec<u8>, u32>,
    plain_size: usize,
}

impl Dictionary {
    pub fn new(physical_type: PhysicalType) -> Self {
        Dictionary {
            physical_type,
            values: Vec::new(),
            lookup: FxHashMap::default(),
            plain_size: 0,
        }
    }

    /// The index of `value`, adding it to the dictionary if it is new.
    pub fn insert(&mut self, value: &Value<'_>) -> Result<u32, WriteError> {
        let bytes = value.bytes_for(self.physical_type)?;
        if let Some(index) = self.lookup.get(&*bytes) {
            return Ok(*index);
        }
        let index = u32::try_from(self.values.len())
            .map_err(|_| WriteError::ValueTooLarge(self.values.len()))?;
        self.values
            .try_reserve(1)
            .map_err(|_| AllocError::new(mem::size_of::<Value<'static>>()))?;
        self.lookup
            .try_reserve(1)
            .map_err(|_| AllocError::new(bytes.len()))?;
        self.plain_size += plain_size(self.physical_type, bytes.len());
        self.lookup.insert(bytes.to_vec(), index);
        self.values.push(value.clone().into_owned());
        Ok(index)
    }

    /// The plain size `value` would add to the dictionary, `None` if it is
    /// already in it.
    pub fn added_size(&self, value: &Value<'_>) -> Result<Option<usize>, WriteError> {
        let bytes = value.bytes_for(self.physical_type)?;
        if self.lookup.contains_key(&*bytes) {
            Ok(None)
        } else {
            Ok(Some(plain_size(self.physical_type, bytes.len())))
        }
    }

    pub fn get(&self, index: u32) -> Option<&Value<'static>> {
        self.values.get(index as usize)
    }

    /// The distinct values, indexed by their dictionary index
    pub fn values(&self) -> &[Value<'static>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The size of the dictionary once written as a plain dictionary page
    pub fn plain_size(&self) -> usize {
        self.plain_size
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// The bit width of the indices into this dictionary
    pub fn index_bit_width(&self) -> u8 {
        bitpack::bit_width(self.values.len().saturating_sub(1) as u64)
    }

    /// Write the dictionary out as a page of plain encoded values.
    pub fn to_page(&self) -> Result<DictionaryPage, WriteError> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.plain_size)
            .map_err(|_| AllocError::new(self.plain_size))?;
        for value in &self.values {
            write_plain(self.physical_type, value, &mut data)?;
        }
        Ok(DictionaryPage {
            data,
            num_values: self.values.len(),
            encoding: Encoding::Plain,
        })
    }

    fn heap_size(&self) -> usize {
        self.values.capacity() * mem::size_of::<Value<'static>>()
            + self.lookup.capacity() * (mem::size_of::<Vec<u8>>() + mem::size_of::<u32>())
            + self.plain_size * 2
    }
}

/// The values of a dictionary, emitted ahead of the pages which refer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPage {
    pub data: Vec<u8>,
    pub num_values: usize,
    pub encoding: Encoding,
}

/// A dictionary together with the indices of the values written so far.
#[derive(Debug, Clone)]
struct ActiveDictionary {
    dictionary: Dictionary,
    indices: Vec<u32>,
}

impl ActiveDictionary {
    fn new(physical_type: PhysicalType) -> Self {
        ActiveDictionary {
            dictionary: Dictionary::new(physical_type),
            indices: Vec::new(),
        }
    }

    fn push(&mut self, value: &Value<'_>) -> Result<(), WriteError> {
        self.indices
            .try_reserve(1)
            .map_err(|_| AllocError::new(mem::size_of::<u32>()))?;
        let index = self.dictionary.insert(value)?;
        self.indices.push(index);
        Ok(())
    }

    /// A bit width byte followed by the indices as a hybrid run length / bit
    /// packed stream.
    fn encode_indices(&self) -> Result<Vec<u8>, AllocError> {
        let bit_width = self.dictionary.index_bit_width();
        let mut out = vec![bit_width];
        let mut state = RleState::new(bit_width);
        for index in &self.indices {
            state.append(&mut out, u64::from(*index))?;
        }
        state.finish(&mut out)?;
        Ok(out)
    }

    fn estimated_size(&self) -> usize {
        let bits = self.indices.len() * usize::from(self.dictionary.index_bit_width());
        1 + bits.div_ceil(8)
    }

    /// The size of the values written so far if they had been written plain
    fn plain_size(&self) -> Result<usize, WriteError> {
        let physical_type = self.dictionary.physical_type;
        self.indices
            .iter()
            .filter_map(|i| self.dictionary.get(*i))
            .map(|v| Ok(plain_size(physical_type, v.bytes_for(physical_type)?.len())))
            .sum()
    }
}

#[derive(Debug)]
enum DictionaryState {
    Active(ActiveDictionary),
    FallenBack,
}

/// Writes values dictionary encoded until the dictionary grows too large, then
/// switches to a fallback encoder for good.
///
/// Once fallen back the writer stays fallen back until [`reset`] is called.
///
/// [`reset`]: ValuesWriter::reset
#[derive(Debug)]
pub struct DictionaryFallbackWriter<F> {
    path: ColumnPath,
    physical_type: PhysicalType,
    limits: DictionaryLimits,
    check_compression: bool,
    state: DictionaryState,
    fallback: F,
    finalized: bool,
}

impl<F: ValuesWriter> DictionaryFallbackWriter<F> {
    /// Wrap `fallback`, which must encode values of `physical_type` and be
    /// empty.
    pub fn new(physical_type: PhysicalType, config: &ColumnConfig, fallback: F) -> Self {
        DictionaryFallbackWriter {
            path: config.path.clone(),
            physical_type,
            limits: config.limits,
            check_compression: config.check_dictionary_compression,
            state: DictionaryState::Active(ActiveDictionary::new(physical_type)),
            fallback,
            finalized: false,
        }
    }

    pub fn is_fallen_back(&self) -> bool {
        matches!(self.state, DictionaryState::FallenBack)
    }

    /// The dictionary built so far, if the writer has not fallen back
    pub fn dictionary(&self) -> Option<&Dictionary> {
        match &self.state {
            DictionaryState::Active(active) => Some(&active.dictionary),
            DictionaryState::FallenBack => None,
        }
    }

    /// The dictionary page the current data page refers to.
    ///
    /// This is an error once the writer has fallen back, there is no
    /// dictionary any more.
    pub fn dictionary_page(&self) -> Result<DictionaryPage, WriteError> {
        match &self.state {
            DictionaryState::Active(active) => active.dictionary.to_page(),
            DictionaryState::FallenBack => Err(WriteError::NoDictionary(self.fallback.encoding())),
        }
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Replay every value written so far, followed by `pending` if there is
    /// one, into the fallback encoder and switch over to it.
    ///
    /// If the replay fails the fallback encoder is emptied again and the
    /// writer is left exactly as it was, without `pending`.
    fn fall_back(
        &mut self,
        reason: FallbackReason,
        pending: Option<&Value<'_>>,
    ) -> Result<(), WriteError> {
        let DictionaryState::Active(active) = mem::replace(&mut self.state, DictionaryState::FallenBack)
        else {
            return Ok(());
        };
        let replayed = active
            .indices
            .iter()
            .filter_map(|index| active.dictionary.get(*index))
            .map(Value::reborrow)
            .chain(pending.map(Value::reborrow))
            .try_for_each(|value| self.fallback.write(value));
        if let Err(e) = replayed {
            self.fallback.reset();
            self.state = DictionaryState::Active(active);
            return Err(e);
        }
        tracing::debug!(
            column = %self.path,
            %reason,
            entries = active.dictionary.len(),
            dictionary_bytes = active.dictionary.plain_size(),
            values = active.indices.len() + usize::from(pending.is_some()),
            fallback = %self.fallback.encoding(),
            "abandoning dictionary"
        );
        Ok(())
    }
}

impl<F: ValuesWriter> ValuesWriter for DictionaryFallbackWriter<F> {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        if self.finalized {
            return Err(WriteError::PageFinalized);
        }
        let limits = self.limits;
        let reason = match &mut self.state {
            DictionaryState::Active(active) => {
                // check the dictionary as it would be with the value in it
                let reason = active.dictionary.added_size(&value)?.and_then(|size| {
                    limits.check(
                        active.dictionary.len() + 1,
                        active.dictionary.plain_size().saturating_add(size),
                    )
                });
                match reason {
                    Some(reason) => reason,
                    None => return active.push(&value),
                }
            }
            DictionaryState::FallenBack => return self.fallback.write(value),
        };
        self.fall_back(reason, Some(&value))
    }

    fn buffered_size(&self) -> usize {
        match &self.state {
            DictionaryState::Active(active) => active.estimated_size(),
            DictionaryState::FallenBack => self.fallback.buffered_size(),
        }
    }

    fn allocated_size(&self) -> usize {
        let fallback = self.fallback.allocated_size();
        match &self.state {
            DictionaryState::Active(active) => {
                fallback
                    + active.dictionary.heap_size()
                    + active.indices.capacity() * mem::size_of::<u32>()
            }
            DictionaryState::FallenBack => fallback,
        }
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        let unprofitable = match &self.state {
            DictionaryState::Active(active) if self.check_compression => {
                !active.indices.is_empty()
                    && !is_dictionary_profitable(
                        active.estimated_size(),
                        active.dictionary.plain_size(),
                        active.plain_size()?,
                    )
            }
            _ => false,
        };
        if unprofitable {
            self.fall_back(FallbackReason::Unprofitable, None)?;
        }
        let bytes = match &self.state {
            DictionaryState::Active(active) => active.encode_indices()?,
            DictionaryState::FallenBack => self.fallback.bytes()?,
        };
        self.finalized = true;
        Ok(bytes)
    }

    fn encoding(&self) -> Encoding {
        match &self.state {
            DictionaryState::Active(_) => Encoding::RleDictionary,
            DictionaryState::FallenBack => self.fallback.encoding(),
        }
    }

    fn reset(&mut self) {
        self.state = DictionaryState::Active(ActiveDictionary::new(self.physical_type));
        self.fallback.reset();
        self.finalized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriterProperties;
    use crate::encoding::{Encoder, RleBitPackedDecoder};

    fn writer(physical_type: PhysicalType, props: WriterProperties) -> DictionaryFallbackWriter<Encoder> {
        let config = props.column_config(&"col".into());
        let fallback = Encoder::new(
            crate::dispatch::select_encoding(physical_type, &config).fallback,
            physical_type,
            &config,
        )
        .unwrap();
        DictionaryFallbackWriter::new(physical_type, &config, fallback)
    }

    fn decode_indices(bytes: &[u8], count: usize) -> Vec<u64> {
        RleBitPackedDecoder::new(&bytes[1..], bytes[0])
            .unwrap()
            .take(count)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn repeated_values_share_an_index() {
        let mut w = writer(PhysicalType::Int32, WriterProperties::default());
        for v in [5, 7, 5, 9, 12, 7] {
            w.write(Value::Int32(v)).unwrap();
        }
        assert_eq!(w.encoding(), Encoding::RleDictionary);
        let dictionary = w.dictionary().unwrap();
        assert_eq!(
            dictionary.values(),
            &[Value::Int32(5), Value::Int32(7), Value::Int32(9), Value::Int32(12)]
        );
        let bytes = w.bytes().unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(decode_indices(&bytes, 6), vec![0, 1, 0, 2, 3, 1]);
    }

    #[test]
    fn falls_back_on_the_first_value_past_the_entry_limit() {
        let mut w = writer(
            PhysicalType::Int32,
            WriterProperties::default().with_max_dictionary_entries(3),
        );
        for v in [5, 7, 5, 9] {
            w.write(Value::Int32(v)).unwrap();
        }
        assert!(!w.is_fallen_back());
        w.write(Value::Int32(12)).unwrap();
        assert!(w.is_fallen_back());
        assert_eq!(w.encoding(), Encoding::DeltaBinaryPacked);
        assert_eq!(
            w.dictionary_page(),
            Err(WriteError::NoDictionary(Encoding::DeltaBinaryPacked))
        );
    }

    #[test]
    fn falls_back_on_dictionary_size() {
        let mut w = writer(
            PhysicalType::ByteArray,
            WriterProperties::default().with_dictionary_page_size(10),
        );
        // "abc" takes 7 bytes plain
        w.write(Value::from("abc")).unwrap();
        w.write(Value::from("abc")).unwrap();
        assert!(!w.is_fallen_back());
        w.write(Value::from("de")).unwrap();
        assert!(w.is_fallen_back());
        assert_eq!(w.encoding(), Encoding::DeltaByteArray);
    }

    #[test]
    fn dictionary_page_is_plain() {
        let mut w = writer(PhysicalType::ByteArray, WriterProperties::default());
        w.write(Value::from("a")).unwrap();
        w.write(Value::from("bc")).unwrap();
        w.write(Value::from("a")).unwrap();
        let page = w.dictionary_page().unwrap();
        assert_eq!(page.encoding, Encoding::Plain);
        assert_eq!(page.num_values, 2);
        assert_eq!(page.data, vec![1, 0, 0, 0, b'a', 2, 0, 0, 0, b'b', b'c']);
    }

    #[test]
    fn floats_are_deduplicated_bitwise() {
        let mut w = writer(PhysicalType::Double, WriterProperties::default());
        for v in [0.0, -0.0, f64::NAN, f64::NAN] {
            w.write(Value::Double(v)).unwrap();
        }
        assert_eq!(w.dictionary().unwrap().len(), 3);
    }

    #[test]
    fn writes_after_bytes_are_rejected_until_reset() {
        let mut w = writer(PhysicalType::Int64, WriterProperties::default());
        w.write(Value::Int64(1)).unwrap();
        w.bytes().unwrap();
        assert_eq!(w.write(Value::Int64(2)), Err(WriteError::PageFinalized));
        w.reset();
        w.write(Value::Int64(2)).unwrap();
        assert_eq!(w.dictionary().unwrap().values(), &[Value::Int64(2)]);
    }

    #[test]
    fn reset_returns_to_an_empty_dictionary() {
        let mut w = writer(
            PhysicalType::Int32,
            WriterProperties::default().with_max_dictionary_entries(1),
        );
        w.write(Value::Int32(1)).unwrap();
        w.write(Value::Int32(2)).unwrap();
        assert!(w.is_fallen_back());
        w.reset();
        assert!(!w.is_fallen_back());
        assert!(w.dictionary().unwrap().is_empty());
        assert_eq!(w.fallback().buffered_size(), 32);
        w.write(Value::Int32(3)).unwrap();
        assert_eq!(w.encoding(), Encoding::RleDictionary);
    }

    #[test]
    fn mismatched_values_leave_the_writer_untouched() {
        let mut w = writer(PhysicalType::Int32, WriterProperties::default());
        w.write(Value::Int32(1)).unwrap();
        assert!(matches!(
            w.write(Value::Int64(1)),
            Err(WriteError::TypeMismatch { .. })
        ));
        let bytes = w.bytes().unwrap();
        assert_eq!(decode_indices(&bytes, 1), vec![0]);
    }

    #[test]
    fn unprofitable_dictionaries_are_abandoned_when_checked() {
        let props = WriterProperties::default().with_check_dictionary_compression(true);
        let mut w = writer(PhysicalType::Int64, props);
        for v in 0..100 {
            w.write(Value::Int64(v)).unwrap();
        }
        assert!(!w.is_fallen_back());
        w.bytes().unwrap();
        assert!(w.is_fallen_back());
        assert_eq!(w.encoding(), Encoding::DeltaBinaryPacked);
    }

    #[test]
    fn profitable_dictionaries_survive_the_check() {
        let props = WriterProperties::default().with_check_dictionary_compression(true);
        let mut w = writer(PhysicalType::Int64, props);
        for v in 0..100 {
            w.write(Value::Int64(v % 2)).unwrap();
        }
        w.bytes().unwrap();
        assert_eq!(w.encoding(), Encoding::RleDictionary);
    }

    /// Accepts a fixed number of values and then fails to allocate
    #[derive(Debug, Default)]
    struct Flaky {
        accepted: Vec<Value<'static>>,
        capacity: usize,
    }

    impl ValuesWriter for Flaky {
        fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
            if self.accepted.len() == self.capacity {
                return Err(AllocError::new(1).into());
            }
            self.accepted.push(value.into_owned());
            Ok(())
        }

        fn buffered_size(&self) -> usize {
            self.accepted.len()
        }

        fn allocated_size(&self) -> usize {
            self.accepted.capacity()
        }

        fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
            Ok(Vec::new())
        }

        fn encoding(&self) -> Encoding {
            Encoding::Plain
        }

        fn reset(&mut self) {
            self.accepted.clear()
        }
    }

    #[test]
    fn failed_replay_keeps_the_dictionary() {
        let config = WriterProperties::default()
            .with_max_dictionary_entries(2)
            .column_config(&"col".into());
        let fallback = Flaky {
            accepted: Vec::new(),
            capacity: 3,
        };
        let mut w = DictionaryFallbackWriter::new(PhysicalType::Int32, &config, fallback);
        for v in [1, 2, 1] {
            w.write(Value::Int32(v)).unwrap();
        }
        assert_eq!(
            w.write(Value::Int32(3)),
            Err(WriteError::Alloc(AllocError::new(1)))
        );
        // the writer is as it was before the failed write
        assert!(!w.is_fallen_back());
        assert!(w.fallback().accepted.is_empty());
        assert_eq!(
            w.dictionary().unwrap().values(),
            &[Value::Int32(1), Value::Int32(2)]
        );
        let DictionaryState::Active(active) = &w.state else {
            panic!("writer fell back");
        };
        assert_eq!(active.indices, vec![0, 1, 0]);

        w.fallback.capacity = 10;
        w.write(Value::Int32(4)).unwrap();
        assert!(w.is_fallen_back());
        let expected: Vec<Value<'static>> = [1, 2, 1, 4].into_iter().map(Value::Int32).collect();
        assert_eq!(w.fallback().accepted, expected);
    }

    #[test]
    fn the_limit_is_checked_before_a_value_is_added() {
        let config = WriterProperties::default()
            .with_max_dictionary_entries(2)
            .column_config(&"col".into());
        let fallback = Flaky::default();
        let mut w = DictionaryFallbackWriter::new(PhysicalType::Int32, &config, fallback);
        for v in [1, 2, 2, 1] {
            w.write(Value::Int32(v)).unwrap();
        }
        assert!(w.write(Value::Int32(3)).is_err());
        assert!(w.write(Value::Int32(3)).is_err());
        // repeats of known values need no new entry
        w.write(Value::Int32(2)).unwrap();
        assert_eq!(w.dictionary().unwrap().len(), 2);
        let bytes = w.bytes().unwrap();
        assert_eq!(decode_indices(&bytes, 5), vec![0, 1, 1, 0, 1]);
    }
}
