//! Btree cells hold records, which contain SQL rows.
//! A record is a header (its own length, then a stream of serial type
//! varints) followed by the packed value bytes. The header is walked
//! eagerly; individual field decoding is deferred until a field is asked
//! for.

use crate::serial_type;
use crate::sql_value::SqlValue;
use crate::varint;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Record varint: {0}")]
    Varint(#[from] varint::Error),
    #[error("Record header length does not fit the payload.")]
    HeaderOverrun,
    #[error("Record body length does not match the total of its serial type sizes.")]
    BodyLengthMismatch,
    #[error("Record value: {0}")]
    SerialType(#[from] serial_type::Error),
    #[error("Record has no field {0}.")]
    FieldOutOfRange(usize),
}

/// One parsed record: the serial type codes from the header and a borrowed
/// view of the body.
#[derive(Debug)]
pub struct Record<'a> {
    serial_types: Vec<i64>,
    value_offsets: Vec<usize>,
    body: &'a [u8],
}

impl<'a> Record<'a> {
    /// Parses a record from `payload`, which must span exactly the record:
    /// the first byte is the start of the header length varint and the last
    /// byte is the last byte of the body.
    pub fn parse(payload: &'a [u8]) -> Result<Record<'a>, Error> {
        let (hdr_len, hdr_len_len) = varint::read_varint(payload)?;
        let hdr_len = hdr_len as usize;
        if hdr_len < hdr_len_len || hdr_len > payload.len() {
            return Err(Error::HeaderOverrun);
        }
        let mut serial_types = Vec::new();
        let mut value_offsets = Vec::new();
        let mut off = hdr_len_len;
        let mut value_off = 0_usize;
        while off < hdr_len {
            let (serial_type, bytes_read) = varint::read_varint(&payload[off..hdr_len])?;
            off += bytes_read;
            serial_types.push(serial_type);
            value_offsets.push(value_off);
            value_off += serial_type::serialized_size(serial_type)?;
        }
        if hdr_len + value_off != payload.len() {
            return Err(Error::BodyLengthMismatch);
        }
        Ok(Record {
            serial_types,
            value_offsets,
            body: &payload[hdr_len..],
        })
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.serial_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serial_types.is_empty()
    }

    /// Decodes field `i`.
    pub fn value(&self, i: usize) -> Result<SqlValue, Error> {
        let serial_type = *self
            .serial_types
            .get(i)
            .ok_or(Error::FieldOutOfRange(i))?;
        let start = self.value_offsets[i];
        let end = start + serial_type::serialized_size(serial_type)?;
        Ok(serial_type::to_sql_value(serial_type, &self.body[start..end])?)
    }
}

#[test]
fn test_record_one_literal() {
    // 2 byte record header, field type is literal 1 (09), body has zero bytes.
    let test_record: &[u8] = &[0x02, 0x09];
    let r = Record::parse(test_record).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r.value(0).unwrap(), SqlValue::Int(1));
    assert!(r.value(1).is_err());
}

#[test]
fn test_record_five_one_byte_ints() {
    let test_record: &[u8] = &[
        0x06, 0x01, 0x01, 0x01, 0x01, 0x01, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    ];
    let r = Record::parse(test_record).unwrap();
    assert_eq!(r.len(), 5);
    for (i, expected) in (10..15).enumerate() {
        assert_eq!(r.value(i).unwrap(), SqlValue::Int(expected));
    }
}

#[test]
fn test_record_various_types() {
    // NULL | literal 0 | "Ten" | one byte int 16
    let test_record: &[u8] = &[0x05, 0x00, 0x08, 0x13, 0x01, 0x54, 0x65, 0x6e, 0x10];
    let r = Record::parse(test_record).unwrap();
    assert_eq!(r.len(), 4);
    assert_eq!(r.value(0).unwrap(), SqlValue::Null());
    assert_eq!(r.value(1).unwrap(), SqlValue::Int(0));
    assert_eq!(r.value(2).unwrap(), SqlValue::Text("Ten".to_string()));
    assert_eq!(r.value(3).unwrap(), SqlValue::Int(16));
}

#[test]
fn test_record_lazy_decoding_of_unsupported_fields() {
    // A float field (serial type 7) parses structurally and only errors when
    // the field itself is decoded.
    let test_record: &[u8] = &[
        0x03, 0x07, 0x09, 0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f,
    ];
    let r = Record::parse(test_record).unwrap();
    assert_eq!(r.len(), 2);
    assert!(r.value(0).is_err());
    assert_eq!(r.value(1).unwrap(), SqlValue::Int(1));
}

#[test]
fn test_record_body_length_mismatch() {
    // Header promises a one-byte int but the body holds two bytes.
    let test_record: &[u8] = &[0x02, 0x01, 0x0a, 0x0b];
    assert!(matches!(
        Record::parse(test_record),
        Err(Error::BodyLengthMismatch)
    ));
    // And the reverse: body shorter than promised.
    let test_record: &[u8] = &[0x02, 0x04, 0x0a];
    assert!(matches!(
        Record::parse(test_record),
        Err(Error::BodyLengthMismatch)
    ));
}

#[test]
fn test_record_header_overrun() {
    let test_record: &[u8] = &[0x09, 0x01, 0x0a];
    assert!(matches!(
        Record::parse(test_record),
        Err(Error::HeaderOverrun)
    ));
    let empty: &[u8] = &[];
    assert!(Record::parse(empty).is_err());
}
