use crate::decode::decode_page;
use crate::dictionary::{DictionaryFallbackWriter, DictionaryPage};
use crate::dispatch::EncodingPlan;
use crate::encoding::{Encoder, ValuesWriter};
use crate::error::{DecodeError, WriteError};
use crate::types::{ColumnDescriptor, Encoding};
use crate::value::Value;

/// A finished page of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPage {
    /// The encoding in force when the page was finalized
    pub encoding: Encoding,
    pub num_values: usize,
    pub data: Vec<u8>,
    /// The dictionary the page's indices refer to, if it is dictionary encoded
    pub dictionary: Option<DictionaryPage>,
}

impl EncodedPage {
    /// Decode the values of this page, which holds values of `column`.
    pub fn decode(&self, column: &ColumnDescriptor) -> Result<Vec<Value<'_>>, DecodeError> {
        decode_page(
            column.physical_type(),
            self.encoding,
            &self.data,
            self.num_values,
            self.dictionary.as_ref(),
        )
    }
}

#[derive(Debug)]
enum Inner {
    Direct(Encoder),
    Dictionary(DictionaryFallbackWriter<Encoder>),
}

/// The values writer of a single column, as built by
/// [`new_values_writer`](crate::new_values_writer).
///
/// ```
/// use colenc::{new_values_writer, ColumnDescriptor, Encoding, PhysicalType, Value, WriterProperties};
///
/// let column = ColumnDescriptor::new("id", PhysicalType::Int32);
/// let props = WriterProperties::default();
/// let mut writer = new_values_writer(&column, &props.column_config(column.path())).unwrap();
/// for id in [3, 1, 3] {
///     writer.write_value(Value::Int32(id)).unwrap();
/// }
/// let page = writer.flush_page().unwrap();
/// assert_eq!(page.encoding, Encoding::RleDictionary);
/// assert_eq!(page.decode(&column).unwrap(), vec![Value::Int32(3), Value::Int32(1), Value::Int32(3)]);
/// ```
#[derive(Debug)]
pub struct ColumnValuesWriter {
    descriptor: ColumnDescriptor,
    plan: EncodingPlan,
    inner: Inner,
    num_values: usize,
    finalized: bool,
}

impl ColumnValuesWriter {
    pub(crate) fn direct(descriptor: ColumnDescriptor, plan: EncodingPlan, encoder: Encoder) -> Self {
        Self::new(descriptor, plan, Inner::Direct(encoder))
    }

    pub(crate) fn dictionary(
        descriptor: ColumnDescriptor,
        plan: EncodingPlan,
        writer: DictionaryFallbackWriter<Encoder>,
    ) -> Self {
        Self::new(descriptor, plan, Inner::Dictionary(writer))
    }

    fn new(descriptor: ColumnDescriptor, plan: EncodingPlan, inner: Inner) -> Self {
        ColumnValuesWriter {
            descriptor,
            plan,
            inner,
            num_values: 0,
            finalized: false,
        }
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    pub fn plan(&self) -> EncodingPlan {
        self.plan
    }

    /// The number of values written to the current page
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    pub fn is_fallen_back(&self) -> bool {
        match &self.inner {
            Inner::Direct(_) => false,
            Inner::Dictionary(w) => w.is_fallen_back(),
        }
    }

    /// Write a value, see [`ValuesWriter::write`]
    pub fn write_value<'v, V: Into<Value<'v>>>(&mut self, value: V) -> Result<(), WriteError> {
        self.write(value.into())
    }

    /// The dictionary page the current page refers to.
    ///
    /// Fails with [`WriteError::NoDictionary`] if the column is not dictionary
    /// encoded or its writer has fallen back.
    pub fn dictionary_page(&self) -> Result<DictionaryPage, WriteError> {
        match &self.inner {
            Inner::Direct(e) => Err(WriteError::NoDictionary(e.encoding())),
            Inner::Dictionary(w) => w.dictionary_page(),
        }
    }

    /// Finish the current page and get ready for the next one.
    pub fn flush_page(&mut self) -> Result<EncodedPage, WriteError> {
        let data = self.bytes()?;
        let dictionary = match &self.inner {
            Inner::Dictionary(w) if !w.is_fallen_back() => Some(w.dictionary_page()?),
            _ => None,
        };
        let page = EncodedPage {
            encoding: self.encoding(),
            num_values: self.num_values,
            data,
            dictionary,
        };
        tracing::trace!(
            column = %self.descriptor.path(),
            encoding = %page.encoding,
            num_values = page.num_values,
            bytes = page.data.len(),
            "flushed page"
        );
        self.reset();
        Ok(page)
    }
}

impl ValuesWriter for ColumnValuesWriter {
    fn write(&mut self, value: Value<'_>) -> Result<(), WriteError> {
        if self.finalized {
            return Err(WriteError::PageFinalized);
        }
        match &mut self.inner {
            Inner::Direct(e) => e.write(value)?,
            Inner::Dictionary(w) => w.write(value)?,
        }
        self.num_values += 1;
        Ok(())
    }

    fn buffered_size(&self) -> usize {
        match &self.inner {
            Inner::Direct(e) => e.buffered_size(),
            Inner::Dictionary(w) => w.buffered_size(),
        }
    }

    fn allocated_size(&self) -> usize {
        match &self.inner {
            Inner::Direct(e) => e.allocated_size(),
            Inner::Dictionary(w) => w.allocated_size(),
        }
    }

    fn bytes(&mut self) -> Result<Vec<u8>, WriteError> {
        let bytes = match &mut self.inner {
            Inner::Direct(e) => e.bytes()?,
            Inner::Dictionary(w) => w.bytes()?,
        };
        self.finalized = true;
        Ok(bytes)
    }

    fn encoding(&self) -> Encoding {
        match &self.inner {
            Inner::Direct(e) => e.encoding(),
            Inner::Dictionary(w) => w.encoding(),
        }
    }

    fn reset(&mut self) {
        match &mut self.inner {
            Inner::Direct(e) => e.reset(),
            Inner::Dictionary(w) => w.reset(),
        }
        self.num_values = 0;
        self.finalized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriterProperties;
    use crate::dispatch::new_values_writer;
    use crate::types::PhysicalType;

    fn writer(physical_type: PhysicalType, props: &WriterProperties) -> (ColumnDescriptor, ColumnValuesWriter) {
        let column = ColumnDescriptor::new("c", physical_type);
        let writer = new_values_writer(&column, &props.column_config(column.path())).unwrap();
        (column, writer)
    }

    #[test]
    fn flush_resets_for_the_next_page() {
        let props = WriterProperties::default().with_max_dictionary_entries(2);
        let (column, mut w) = writer(PhysicalType::Int64, &props);
        for v in [1_i64, 2, 3] {
            w.write_value(v).unwrap();
        }
        let first = w.flush_page().unwrap();
        assert_eq!(first.encoding, Encoding::DeltaBinaryPacked);
        assert_eq!(first.dictionary, None);
        assert_eq!(w.num_values(), 0);

        w.write_value(7_i64).unwrap();
        let second = w.flush_page().unwrap();
        assert_eq!(second.encoding, Encoding::RleDictionary);
        assert_eq!(second.num_values, 1);
        assert_eq!(second.decode(&column).unwrap(), vec![Value::Int64(7)]);
    }

    #[test]
    fn booleans_are_never_dictionary_encoded() {
        let (column, mut w) = writer(PhysicalType::Boolean, &WriterProperties::default());
        for b in [true, true, false] {
            w.write_value(b).unwrap();
        }
        assert_eq!(
            w.dictionary_page(),
            Err(WriteError::NoDictionary(Encoding::Rle))
        );
        let page = w.flush_page().unwrap();
        assert_eq!(page.encoding, Encoding::Rle);
        assert_eq!(
            page.decode(&column).unwrap(),
            vec![Value::Boolean(true), Value::Boolean(true), Value::Boolean(false)]
        );
    }

    #[test]
    fn finalized_pages_reject_writes() {
        let (_, mut w) = writer(PhysicalType::Int96, &WriterProperties::default());
        w.write_value([0_u8; 12]).unwrap();
        w.bytes().unwrap();
        assert_eq!(w.write_value([1_u8; 12]), Err(WriteError::PageFinalized));
        assert_eq!(w.num_values(), 1);
        w.reset();
        w.write_value([1_u8; 12]).unwrap();
    }

    #[test]
    fn failed_writes_are_not_counted() {
        let (_, mut w) = writer(PhysicalType::Float, &WriterProperties::default());
        assert!(w.write_value(1.0_f64).is_err());
        assert_eq!(w.num_values(), 0);
    }
}
