use crate::error::DecodeError;

use super::leb128::unzigzag;

/// A cursor over an encoded buffer
#[derive(Clone, Debug)]
pub(crate) struct RawDecoder<'a> {
    offset: usize,
    data: &'a [u8],
}

impl<'a> RawDecoder<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        RawDecoder { offset: 0, data }
    }

    pub(crate) fn read_unsigned(&mut self) -> Result<u64, DecodeError> {
        let mut buf = &self.data[self.offset..];
        let init_len = buf.len();
        let val = leb128::read::unsigned(&mut buf)?;
        self.offset += init_len - buf.len();
        Ok(val)
    }

    pub(crate) fn read_zigzag(&mut self) -> Result<i64, DecodeError> {
        self.read_unsigned().map(unzigzag)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(DecodeError::TryingToReadPastEnd)?;
        if end > self.data.len() {
            Err(DecodeError::TryingToReadPastEnd)
        } else {
            let head = &self.data[self.offset..end];
            self.offset = end;
            Ok(head)
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn done(&self) -> bool {
        self.offset >= self.data.len()
    }
}

impl<'a> From<&'a [u8]> for RawDecoder<'a> {
    fn from(d: &'a [u8]) -> Self {
        RawDecoder::new(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_past_the_end_fails() {
        let mut decoder = RawDecoder::new(&[1, 2, 3]);
        assert_eq!(decoder.read_bytes(2).unwrap(), &[1, 2]);
        assert!(matches!(
            decoder.read_bytes(2),
            Err(DecodeError::TryingToReadPastEnd)
        ));
        assert_eq!(decoder.read_u8().unwrap(), 3);
        assert!(decoder.done());
    }

    #[test]
    fn truncated_leb_is_an_error() {
        let mut decoder = RawDecoder::new(&[0x80]);
        assert!(matches!(
            decoder.read_unsigned(),
            Err(DecodeError::BadLeb(_))
        ));
    }
}
