//! Varints are how SQLite packs lengths, rowids and serial type codes.
//! A varint is big-endian base-128: each byte contributes its low 7 bits and
//! the high bit signals continuation.
//!
//! This decoder stops after 8 bytes. The format's 9th-byte rule (all 8 bits
//! significant) is not applied, so values wider than 56 bits decode wrong.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Varint extends past the end of the buffer.")]
    Truncated,
}

/// Longest encoding this codec reads or writes.
pub const MAX_ENCODED_LEN: usize = 8;

/// Reads a varint from the start of `data`, returning `(value, bytes consumed)`.
///
/// Stops when a byte has its high bit clear, or after `MAX_ENCODED_LEN`
/// bytes. Errors when `data` runs out mid-varint.
pub fn read_varint(data: &[u8]) -> Result<(i64, usize), Error> {
    let mut value: i64 = 0;
    for (i, byte) in data.iter().take(MAX_ENCODED_LEN).enumerate() {
        value = (value << 7) | (byte & 0x7f) as i64;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if data.len() >= MAX_ENCODED_LEN {
        Ok((value, MAX_ENCODED_LEN))
    } else {
        Err(Error::Truncated)
    }
}

/// Encodes `value` as a minimal-length varint.
///
/// Only values in `0..2^56` round-trip through `read_varint`; SQLite writes
/// minimal encodings, so decode-then-encode reproduces the stored bytes.
pub fn write_varint(value: i64) -> Vec<u8> {
    debug_assert!((0..1 << (7 * MAX_ENCODED_LEN as i64)).contains(&value));
    let mut groups = vec![(value & 0x7f) as u8];
    let mut rest = (value as u64) >> 7;
    while rest != 0 {
        groups.push((rest & 0x7f) as u8 | 0x80);
        rest >>= 7;
    }
    groups.reverse();
    groups
}

#[test]
fn test_read_varint() {
    let cases: Vec<(&[u8], i64, usize)> = vec![
        (&[0x00], 0, 1),
        (&[0x01], 1, 1),
        (&[0x7f], 127, 1),
        (&[0x81, 0x00], 128, 2),
        (&[0x82, 0x2c], 300, 2),
        (&[0xff, 0x7f], 0x3fff, 2),
        // Trailing bytes past the terminator are not consumed.
        (&[0x07, 0xff, 0xff], 7, 1),
        // 8 continuation bytes: the loop stops without a terminator.
        (&[0xff; 8], (1 << 56) - 1, 8),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: {:?}", i, case.0);
        assert_eq!(read_varint(case.0), Ok((case.1, case.2)));
    }
}

#[test]
fn test_read_varint_truncated() {
    let cases: Vec<&[u8]> = vec![&[], &[0x81], &[0xff, 0xff, 0xff]];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: {:?}, should error", i, case);
        assert_eq!(read_varint(case), Err(Error::Truncated));
    }
}

#[test]
fn test_write_varint() {
    let cases: Vec<(i64, &[u8])> = vec![
        (0, &[0x00]),
        (127, &[0x7f]),
        (128, &[0x81, 0x00]),
        (300, &[0x82, 0x2c]),
        ((1 << 56) - 1, &[0xff; 8]),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: encode {}", i, case.0);
        assert_eq!(write_varint(case.0), case.1);
    }
}

#[cfg(test)]
mod round_trip {
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_round_trip(v in 0i64..(1 << 56)) {
            let bytes = super::write_varint(v);
            let (decoded, consumed) = super::read_varint(&bytes).unwrap();
            prop_assert_eq!(decoded, v);
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(super::write_varint(decoded), bytes);
        }
    }
}
