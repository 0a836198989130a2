//! The four btree cell variants, as pure decoders over a page and a cell
//! offset. Cells form a closed set with no shared behavior, so each variant
//! is its own struct with its own reader.
//
// Cell formats from https://www.sqlite.org/fileformat.html#b_tree_pages
//
// Table B-Tree Leaf Cell (page type 0x0d):
// A varint which is the total number of bytes of payload, including any overflow.
// A varint which is the integer key, a.k.a. "rowid".
// The payload (overflowing payloads are not supported here).
//
// Table B-Tree Interior Cell (page type 0x05):
// A 4-byte big-endian page number which is the left child pointer.
// A varint which is the integer key.
//
// Index B-Tree Leaf Cell (page type 0x0a):
// A varint which is the total number of bytes of key payload.
// The payload; its trailing column is the rowid pointer.
//
// Index B-Tree Interior Cell (page type 0x02):
// A 4-byte big-endian page number which is the left child pointer.
// A varint which is the total number of bytes of key payload.
// The payload; its trailing column is the rowid pointer.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use super::RowId;
use crate::pager::PageNum;
use crate::record::{self, Record};
use crate::varint;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cell varint: {0}")]
    Varint(#[from] varint::Error),
    #[error("Cell record: {0}")]
    Record(#[from] record::Error),
    #[error("Cell extends past the end of its page.")]
    Truncated,
}

#[derive(Debug)]
pub struct TableLeafCell<'p> {
    pub rowid: RowId,
    pub record: Record<'p>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInteriorCell {
    pub left_child: PageNum,
    /// The maximum rowid in the subtree under `left_child`.
    pub key: RowId,
}

#[derive(Debug)]
pub struct IndexLeafCell<'p> {
    pub record: Record<'p>,
}

#[derive(Debug)]
pub struct IndexInteriorCell<'p> {
    pub left_child: PageNum,
    pub record: Record<'p>,
}

fn slice_from(page: &[u8], offset: usize) -> Result<&[u8], Error> {
    page.get(offset..).ok_or(Error::Truncated)
}

fn payload_at(page: &[u8], offset: usize) -> Result<&[u8], Error> {
    let rest = slice_from(page, offset)?;
    let (payload_len, n) = varint::read_varint(rest)?;
    rest.get(n..n + payload_len as usize).ok_or(Error::Truncated)
}

/// Reads a table leaf cell whose first byte is at `offset` within `page`.
pub fn read_table_leaf(page: &[u8], offset: usize) -> Result<TableLeafCell<'_>, Error> {
    let rest = slice_from(page, offset)?;
    let (payload_len, n) = varint::read_varint(rest)?;
    let (rowid, m) = varint::read_varint(slice_from(rest, n)?)?;
    let payload = rest
        .get(n + m..n + m + payload_len as usize)
        .ok_or(Error::Truncated)?;
    Ok(TableLeafCell {
        rowid,
        record: Record::parse(payload)?,
    })
}

/// Reads only the rowid of a table leaf cell. Used by the point-lookup
/// bisection, which probes many cells it never fully decodes.
pub fn table_leaf_rowid(page: &[u8], offset: usize) -> Result<RowId, Error> {
    let rest = slice_from(page, offset)?;
    let (_payload_len, n) = varint::read_varint(rest)?;
    let (rowid, _) = varint::read_varint(slice_from(rest, n)?)?;
    Ok(rowid)
}

/// Reads a table interior cell whose first byte is at `offset` within `page`.
pub fn read_table_interior(page: &[u8], offset: usize) -> Result<TableInteriorCell, Error> {
    let rest = slice_from(page, offset)?;
    if rest.len() < 4 {
        return Err(Error::Truncated);
    }
    let mut c = Cursor::new(rest);
    let left_child = c.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?;
    let (key, _) = varint::read_varint(&rest[4..])?;
    Ok(TableInteriorCell {
        left_child: left_child as PageNum,
        key,
    })
}

/// Reads an index leaf cell whose first byte is at `offset` within `page`.
pub fn read_index_leaf(page: &[u8], offset: usize) -> Result<IndexLeafCell<'_>, Error> {
    let payload = payload_at(page, offset)?;
    Ok(IndexLeafCell {
        record: Record::parse(payload)?,
    })
}

/// Reads an index interior cell whose first byte is at `offset` within `page`.
pub fn read_index_interior(page: &[u8], offset: usize) -> Result<IndexInteriorCell<'_>, Error> {
    let rest = slice_from(page, offset)?;
    if rest.len() < 4 {
        return Err(Error::Truncated);
    }
    let mut c = Cursor::new(rest);
    let left_child = c.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?;
    let payload = payload_at(rest, 4)?;
    Ok(IndexInteriorCell {
        left_child: left_child as PageNum,
        record: Record::parse(payload)?,
    })
}

#[cfg(test)]
use crate::sql_value::SqlValue;

#[test]
fn test_read_table_leaf() {
    // Cell at offset 2: payload length 3, rowid 5, record (one byte int 42).
    let page: &[u8] = &[0xee, 0xee, 0x03, 0x05, 0x02, 0x01, 0x2a];
    let cell = read_table_leaf(page, 2).unwrap();
    assert_eq!(cell.rowid, 5);
    assert_eq!(cell.record.len(), 1);
    assert_eq!(cell.record.value(0).unwrap(), SqlValue::Int(42));
    assert_eq!(table_leaf_rowid(page, 2).unwrap(), 5);
}

#[test]
fn test_read_table_leaf_truncated() {
    // Payload length promises more bytes than the page holds.
    let page: &[u8] = &[0x09, 0x05, 0x02, 0x01, 0x2a];
    assert!(matches!(read_table_leaf(page, 0), Err(Error::Truncated)));
    assert!(matches!(read_table_leaf(page, 99), Err(Error::Truncated)));
}

#[test]
fn test_read_table_interior() {
    // Left child page 2, key 10.
    let page: &[u8] = &[0x00, 0x00, 0x00, 0x02, 0x0a];
    let cell = read_table_interior(page, 0).unwrap();
    assert_eq!(cell.left_child, 2);
    assert_eq!(cell.key, 10);
}

#[test]
fn test_read_table_interior_truncated() {
    let page: &[u8] = &[0x00, 0x00, 0x00];
    assert!(read_table_interior(page, 0).is_err());
}

#[test]
fn test_read_index_leaf() {
    // Payload length 5, record ("Red", rowid 2).
    let page: &[u8] = &[0x07, 0x03, 0x13, 0x01, 0x52, 0x65, 0x64, 0x02];
    let cell = read_index_leaf(page, 0).unwrap();
    assert_eq!(cell.record.len(), 2);
    assert_eq!(cell.record.value(0).unwrap(), SqlValue::Text("Red".to_string()));
    assert_eq!(cell.record.value(1).unwrap(), SqlValue::Int(2));
}

#[test]
fn test_read_index_interior() {
    // Left child page 3, payload length 7, record ("Red", rowid 2).
    let page: &[u8] = &[
        0x00, 0x00, 0x00, 0x03, 0x07, 0x03, 0x13, 0x01, 0x52, 0x65, 0x64, 0x02,
    ];
    let cell = read_index_interior(page, 0).unwrap();
    assert_eq!(cell.left_child, 3);
    assert_eq!(cell.record.len(), 2);
    assert_eq!(cell.record.value(0).unwrap(), SqlValue::Text("Red".to_string()));
    assert_eq!(cell.record.value(1).unwrap(), SqlValue::Int(2));
}
