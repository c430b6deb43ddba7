use super::Sink;
use crate::error::AllocError;

/// The most bytes a uLEB128 encoded `u64` takes
pub(crate) const MAX_LEN: usize = 10;

/// Encode `val` as a uLEB128 integer at the front of `buf`, returning the
/// number of bytes used
pub(crate) fn encode_unsigned(buf: &mut [u8], val: u64) -> Result<usize, AllocError> {
    let mut cursor = buf;
    leb128::write::unsigned(&mut cursor, val).map_err(|_| AllocError::new(MAX_LEN))
}

/// Write `val` as a uLEB128 integer, returning the number of bytes written
pub(crate) fn write_unsigned<S: Sink>(out: &mut S, val: u64) -> Result<usize, AllocError> {
    let mut buf = [0_u8; MAX_LEN];
    let len = encode_unsigned(&mut buf, val)?;
    out.append(&buf[..len])?;
    Ok(len)
}

pub(crate) fn zigzag(val: i64) -> u64 {
    ((val << 1) ^ (val >> 63)) as u64
}

pub(crate) fn unzigzag(val: u64) -> i64 {
    ((val >> 1) as i64) ^ -((val & 1) as i64)
}

/// Write `val` zigzag encoded as a uLEB128 integer
pub(crate) fn write_zigzag<S: Sink>(out: &mut S, val: i64) -> Result<usize, AllocError> {
    write_unsigned(out, zigzag(val))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn write_unsigned_reads_back(val in any::<u64>()) {
            let mut out = Vec::new();
            let written = write_unsigned(&mut out, val).unwrap();
            assert_eq!(written, out.len());
            assert!(written <= MAX_LEN);
            assert_eq!(leb128::read::unsigned(&mut &out[..]).unwrap(), val);
        }

        #[test]
        fn zigzag_round_trips(val in any::<i64>()) {
            assert_eq!(unzigzag(zigzag(val)), val);
        }
    }

    #[test]
    fn zigzag_examples() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(-2), 3);
        assert_eq!(zigzag(i64::MIN), u64::MAX);
    }

    #[test]
    fn short_buffers_are_an_error() {
        let mut buf = [0_u8; 1];
        assert_eq!(encode_unsigned(&mut buf, 127).unwrap(), 1);
        assert!(encode_unsigned(&mut buf, 128).is_err());
    }
}
