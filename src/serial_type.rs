//! Serial types are how SQLite stores values in record bodies.
//! Each field carries a serial type code in the record header; the code
//! determines both the value's kind and its byte width in the body.
use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use std::io::Read;

use crate::sql_value::SqlValue;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error reading value bytes: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial type {0} is valid format but not supported by this engine.")]
    Unimplemented(i64),
    #[error("Invalid serial type code: {0}.")]
    InvalidSerialTypeCode(i64),
    #[error("Bytes were not a valid string encoding.")]
    InvalidStringEncoding(#[from] std::string::FromUtf8Error),
}

/// Returns the length in bytes implied by a SQLite serial type code.
pub fn serialized_size(serial_type: i64) -> Result<usize, Error> {
    match serial_type {
        // Serial Type	Content Size	Meaning
        // 0	        0	            Value is a NULL.
        0 => Ok(0),
        // 1	        1	            Value is an 8-bit twos-complement integer.
        // 2	        2	            Value is a big-endian 16-bit twos-complement integer.
        // 3	        3	            Value is a big-endian 24-bit twos-complement integer.
        // 4	        4	            Value is a big-endian 32-bit twos-complement integer.
        x @ 1..=4 => Ok(x as usize),
        // 5	        6	            Value is a big-endian 48-bit twos-complement integer.
        5 => Ok(6),
        // 6	        8	            Value is a big-endian 64-bit twos-complement integer.
        // 7	        8	            Value is a big-endian IEEE 754-2008 64-bit floating point number.
        6 | 7 => Ok(8),
        // 8	        0	            Value is the integer 0. (Schema format 4 and higher.)
        // 9	        0	            Value is the integer 1. (Schema format 4 and higher.)
        8 | 9 => Ok(0),
        // 10,11	    variable	    Reserved for internal use; never appear in a well-formed database file.
        // N≥12 & even	(N-12)/2	    Value is a BLOB that is (N-12)/2 bytes in length.
        // N≥13 & odd	(N-13)/2	    Value is a string in the text encoding, (N-13)/2 bytes in length.
        x if x >= 12 => Ok((x as usize - 12 - (x % 2) as usize) / 2),
        x => Err(Error::InvalidSerialTypeCode(x)),
    }
}

/// Deserializes bytes in SQLite serial type format into a `SqlValue`.
///
/// Only the storage classes this engine supports decode: NULL, integers of
/// 1 to 4 bytes, the literal 0 and 1 codes, and UTF-8 text. The 48- and
/// 64-bit integer widths, floats and blobs are rejected as unimplemented.
pub fn to_sql_value(serial_type: i64, data: &[u8]) -> Result<SqlValue, Error> {
    use SqlValue::*;

    let mut c = std::io::Cursor::new(data);
    match serial_type {
        // 0	        0	            Value is a NULL.
        0 => Ok(Null()),
        // 1	        1	            Value is an 8-bit twos-complement integer.
        1 => Ok(Int(c.read_i8()? as i64)),
        // 2	        2	            Value is a big-endian 16-bit twos-complement integer.
        2 => Ok(Int(c.read_i16::<BigEndian>()? as i64)),
        // 3	        3	            Value is a big-endian 24-bit twos-complement integer.
        3 => {
            let mut bytes = [0_u8; 4];
            c.read_exact(&mut bytes[1..])?;
            bytes[0] = match (bytes[1] & 0b1000_0000) > 0 {
                false => 0,
                true => 0xff,
            };
            Ok(Int(i32::from_be_bytes(bytes) as i64))
        }
        // 4	        4	            Value is a big-endian 32-bit twos-complement integer.
        4 => Ok(Int(c.read_i32::<BigEndian>()? as i64)),
        // 5	        6	            48-bit integer: mapped but not decoded.
        // 6	        8	            64-bit integer: mapped but not decoded.
        // 7	        8	            64-bit float: deliberately unsupported.
        x @ 5..=7 => Err(Error::Unimplemented(x)),
        // 8	        0	            Value is the integer 0.
        8 => Ok(Int(0_i64)),
        // 9	        0	            Value is the integer 1.
        9 => Ok(Int(1_i64)),
        // 10,11	    variable	    Reserved for internal use.
        10 | 11 => Err(Error::InvalidSerialTypeCode(serial_type)),
        // N≥13 & odd	(N-13)/2	    Value is a string in the text encoding.
        x if x >= 13 && x % 2 == 1 => {
            let mut buf = vec![0_u8; (x as usize - 13) / 2];
            c.read_exact(&mut buf[..])?;
            Ok(Text(String::from_utf8(buf)?))
        }
        // N≥12 & even	(N-12)/2	    BLOB: deliberately unsupported.
        x if x >= 12 => Err(Error::Unimplemented(x)),
        x => Err(Error::InvalidSerialTypeCode(x)),
    }
}

#[test]
fn test_serialized_size() {
    let cases: Vec<(i64, usize)> = vec![
        (0, 0),
        (1, 1),
        (2, 2),
        (3, 3),
        (4, 4),
        (5, 6),
        (6, 8),
        (7, 8),
        (8, 0),
        (9, 0),
        (12, 0),
        (13, 0),
        (18, 3),
        (19, 3),
        (25, 6),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: size of typecode {}", i, case.0);
        assert_eq!(serialized_size(case.0).unwrap(), case.1);
    }
    assert!(serialized_size(10).is_err());
    assert!(serialized_size(11).is_err());
    assert!(serialized_size(-1).is_err());
}

#[test]
fn test_to_sql_value() {
    use SqlValue::*;

    let cases: Vec<(i64, &[u8], SqlValue)> = vec![
        (0, b"", Null()),
        // one byte ints
        (1, &[0x7f], Int(127)),
        (1, &[0xff], Int(-1)),
        (1, &[0x01], Int(1)),
        // two byte ints
        (2, &[0x00, 0x7f], Int(127)),
        (2, &[0xff, 0xff], Int(-1)),
        (2, &[0x01, 0x00], Int(256)),
        // three byte ints
        (3, &[0x00, 0x00, 0x7f], Int(127)),
        (3, &[0xff, 0xff, 0xff], Int(-1)),
        (3, &[0x00, 0x01, 0x00], Int(256)),
        (3, &[0x01, 0x00, 0x00], Int(65536)),
        // four byte ints
        (4, &[0x00, 0x00, 0x00, 0x2a], Int(42)),
        (4, &[0xff, 0xff, 0xff, 0xff], Int(-1)),
        (4, &[0x7f, 0xff, 0xff, 0xff], Int(i32::MAX as i64)),
        // Literal 0 and 1
        (8, b"", Int(0)),
        (9, b"", Int(1)),
        // Text of various lengths
        (13, b"", Text("".to_string())),
        (19, b"Foo", Text("Foo".to_string())),
        (25, b"FooBar", Text("FooBar".to_string())),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: deserialize typecode {}", i, case.0);
        assert_eq!(to_sql_value(case.0, case.1).unwrap(), case.2);
    }
}

#[test]
fn test_to_sql_value_errors() {
    let cases: Vec<(i64, &[u8])> = vec![
        // 48- and 64-bit integers are acknowledged limitations.
        (5, &[0x00, 0x00, 0x00, 0x00, 0x00, 0x01]),
        (6, &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]),
        // Floats and blobs are out of scope.
        (7, &[0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f]),
        (12, b""),
        (18, &[0x00, 0x01, 0xff]),
        // Reserved and invalid codes.
        (10, &[0x00, 0x7f]),
        (11, &[0x01, 0x00, 0x00]),
        (-1, &[0x00, 0x00]),
        (-12345, &[0x00, 0x00]),
    ];

    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: typecode {} should error", i, case.0);
        assert!(to_sql_value(case.0, case.1).is_err());
    }
}

#[test]
fn test_to_sql_value_invalid_utf8() {
    assert!(matches!(
        to_sql_value(17, &[0xc3, 0x28]),
        Err(Error::InvalidStringEncoding(_))
    ));
}
