//! dbheader reads the 100-byte header at the start of a database file.
//! The format is defined at <https://www.sqlite.org/fileformat.html>.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("The magic bytes for this file are wrong.")]
    WrongMagic,
    #[error("Error reading file header.")]
    ReadFailed,
}

/// Bytes occupied by the database header on page 1.
pub const DB_HEADER_BYTES: usize = 100;

const SQLITE3_MAGIC_STRING: &[u8] = b"SQLite format 3\0";

#[derive(Debug, Clone)]
pub struct DbfileHeader {
    /// The literal value of the page-size field at offset 16. The format's
    /// "1 means 65536" convention is not decoded; a 64 KiB database reads
    /// as pagesize 1 and fails downstream.
    pub pagesize: u32,
}

/// Reads and validates the header from the start of `f`.
///
/// Beyond the magic string the file is trusted: the change counter,
/// freelist fields and version numbers are not checked.
pub fn get_header<R: Read>(f: &mut R) -> Result<DbfileHeader, Error> {
    // Offset	Size	Description
    // 0        16	    The header string: "SQLite format 3\000"
    let mut magic = [0_u8; 16];
    f.read_exact(&mut magic).map_err(|_| Error::ReadFailed)?;
    if magic != SQLITE3_MAGIC_STRING {
        return Err(Error::WrongMagic);
    }
    // Offset	Size	Description
    // 16	    2	    The database page size in bytes.
    let pagesize = f.read_u16::<BigEndian>().map_err(|_| Error::ReadFailed)? as u32;
    Ok(DbfileHeader { pagesize })
}

#[test]
fn test_get_header() {
    let mut bytes = Vec::from(SQLITE3_MAGIC_STRING);
    bytes.extend_from_slice(&[0x10, 0x00]); // pagesize 4096
    let h = get_header(&mut std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(h.pagesize, 4096);
}

#[test]
fn test_get_header_pagesize_one_is_literal() {
    let mut bytes = Vec::from(SQLITE3_MAGIC_STRING);
    bytes.extend_from_slice(&[0x00, 0x01]);
    let h = get_header(&mut std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(h.pagesize, 1);
}

#[test]
fn test_get_header_wrong_magic() {
    let bytes = b"SQLite format 4\0\x10\x00".to_vec();
    assert!(matches!(
        get_header(&mut std::io::Cursor::new(bytes)),
        Err(Error::WrongMagic)
    ));
}

#[test]
fn test_get_header_short_file() {
    let bytes = b"SQLite".to_vec();
    assert!(matches!(
        get_header(&mut std::io::Cursor::new(bytes)),
        Err(Error::ReadFailed)
    ));
}
