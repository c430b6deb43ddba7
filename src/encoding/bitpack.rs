use crate::error::DecodeError;

/// The number of bits needed to represent `max`
pub(crate) fn bit_width(max: u64) -> u8 {
    (64 - max.leading_zeros()) as u8
}

/// The number of bytes `count` values of `bit_width` bits pack into
pub(crate) fn packed_len(count: usize, bit_width: u8) -> usize {
    count.saturating_mul(bit_width as usize).div_ceil(8)
}

/// Pack `values` least significant bit first, `bit_width` bits each.
pub(crate) fn pack(values: &[u64], bit_width: u8, out: &mut Vec<u8>) {
    if bit_width == 0 {
        return;
    }
    let mask: u128 = (1_u128 << bit_width) - 1;
    let mut acc: u128 = 0;
    let mut nbits: u32 = 0;
    for v in values {
        acc |= (*v as u128 & mask) << nbits;
        nbits += bit_width as u32;
        while nbits >= 8 {
            out.push((acc & 0xff) as u8);
            acc >>= 8;
            nbits -= 8;
        }
    }
    if nbits > 0 {
        out.push((acc & 0xff) as u8);
    }
}

/// Unpack `count` values of `bit_width` bits from the front of `data`
pub(crate) fn unpack(
    data: &[u8],
    bit_width: u8,
    count: usize,
    out: &mut Vec<u64>,
) -> Result<(), DecodeError> {
    if bit_width > 64 {
        return Err(DecodeError::InvalidBitWidth(bit_width));
    }
    if bit_width == 0 {
        out.extend(std::iter::repeat(0).take(count));
        return Ok(());
    }
    if data.len() < packed_len(count, bit_width) {
        return Err(DecodeError::TryingToReadPastEnd);
    }
    let mask: u128 = (1_u128 << bit_width) - 1;
    let mut acc: u128 = 0;
    let mut nbits: u32 = 0;
    let mut bytes = data.iter();
    for _ in 0..count {
        while nbits < bit_width as u32 {
            let byte = bytes.next().ok_or(DecodeError::TryingToReadPastEnd)?;
            acc |= (*byte as u128) << nbits;
            nbits += 8;
        }
        out.push((acc & mask) as u64);
        acc >>= bit_width;
        nbits -= bit_width as u32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bit_widths() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(255), 8);
        assert_eq!(bit_width(256), 9);
        assert_eq!(bit_width(u64::MAX), 64);
    }

    #[test]
    fn packs_lsb_first() {
        let mut out = Vec::new();
        pack(&[1, 0, 1, 1, 0, 0, 0, 1], 1, &mut out);
        assert_eq!(out, vec![0b1000_1101]);

        let mut out = Vec::new();
        pack(&[0, 1, 2, 3, 4, 5, 6, 7], 3, &mut out);
        assert_eq!(out, vec![0b1000_1000, 0b1100_0110, 0b1111_1010]);
    }

    proptest! {
        #[test]
        fn pack_unpack(width in 0_u8..=64, raw in proptest::collection::vec(any::<u64>(), 0..40)) {
            let mask = if width == 64 { u64::MAX } else { (1_u64 << width) - 1 };
            let values: Vec<u64> = raw.into_iter().map(|v| v & mask).collect();
            let mut packed = Vec::new();
            pack(&values, width, &mut packed);
            assert_eq!(packed.len(), packed_len(values.len(), width));
            let mut unpacked = Vec::new();
            unpack(&packed, width, values.len(), &mut unpacked).unwrap();
            assert_eq!(unpacked, values);
        }
    }
}
