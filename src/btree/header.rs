//! Decodes the btree page header that starts every page (on page 1, after
//! the 100-byte database header).

use super::PageType;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Seek, SeekFrom};

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("Invalid btree page type: {0}.")]
    InvalidPageType(u8),
    #[error("Page too short to hold a btree page header.")]
    Truncated,
}

#[derive(Debug, Clone)]
pub struct PageHeader {
    pub page_type: PageType,
    pub freeblock_start: u32,
    pub num_cells: u32,
    pub cell_content_start: u32,
    pub fragmented_free_bytes: u8,
    pub rightmost_pointer: Option<u32>,
}

impl PageHeader {
    /// Bytes the header occupies: 12 on interior pages, 8 on leaves. The
    /// cell pointer array follows immediately.
    pub fn size(&self) -> usize {
        match self.page_type {
            PageType::IndexInterior | PageType::TableInterior => 12,
            PageType::IndexLeaf | PageType::TableLeaf => 8,
        }
    }
}

/// Parses the page header found at `base` bytes into `page`.
pub fn parse(page: &[u8], base: usize) -> Result<PageHeader, Error> {
    let mut c = Cursor::new(page);
    c.seek(SeekFrom::Start(base as u64))
        .map_err(|_| Error::Truncated)?;

    // Offset	Size	Description
    // 0	1	The one-byte flag at offset 0 indicating the b-tree page type.
    let page_type = match c.read_u8().map_err(|_| Error::Truncated)? {
        0x02 => PageType::IndexInterior,
        0x05 => PageType::TableInterior,
        0x0a => PageType::IndexLeaf,
        0x0d => PageType::TableLeaf,
        b => return Err(Error::InvalidPageType(b)),
    };
    // 1	2	Start of the first freeblock on the page, or zero if none.
    let freeblock_start = c.read_u16::<BigEndian>().map_err(|_| Error::Truncated)? as u32;
    // 3	2	The number of cells on the page.
    let num_cells = c.read_u16::<BigEndian>().map_err(|_| Error::Truncated)? as u32;
    // 5	2	Start of the cell content area. Zero is interpreted as 65536.
    let cell_content_start = match c.read_u16::<BigEndian>().map_err(|_| Error::Truncated)? {
        0 => 65536,
        x => x as u32,
    };
    // 7	1	The number of fragmented free bytes within the cell content area.
    let fragmented_free_bytes = c.read_u8().map_err(|_| Error::Truncated)?;
    // 8	4	The right-most pointer. Interior b-tree pages only.
    let rightmost_pointer = match page_type {
        PageType::IndexInterior | PageType::TableInterior => {
            Some(c.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?)
        }
        PageType::IndexLeaf | PageType::TableLeaf => None,
    };

    Ok(PageHeader {
        page_type,
        freeblock_start,
        num_cells,
        cell_content_start,
        fragmented_free_bytes,
        rightmost_pointer,
    })
}

#[test]
fn test_parse_leaf_header() {
    // Table leaf, no freeblocks, 2 cells, content starts at 0x0ff0.
    let bytes: &[u8] = &[0x0d, 0x00, 0x00, 0x00, 0x02, 0x0f, 0xf0, 0x00];
    let h = parse(bytes, 0).unwrap();
    assert_eq!(h.page_type, PageType::TableLeaf);
    assert_eq!(h.freeblock_start, 0);
    assert_eq!(h.num_cells, 2);
    assert_eq!(h.cell_content_start, 0x0ff0);
    assert_eq!(h.rightmost_pointer, None);
    assert_eq!(h.size(), 8);
}

#[test]
fn test_parse_interior_header() {
    let bytes: &[u8] = &[
        0x05, 0x00, 0x00, 0x00, 0x03, 0x01, 0x80, 0x00, 0x00, 0x00, 0x00, 0x06,
    ];
    let h = parse(bytes, 0).unwrap();
    assert_eq!(h.page_type, PageType::TableInterior);
    assert_eq!(h.num_cells, 3);
    assert_eq!(h.rightmost_pointer, Some(6));
    assert_eq!(h.size(), 12);
}

#[test]
fn test_parse_header_at_offset() {
    // Page 1 style: header begins past a prefix.
    let mut bytes = vec![0xee_u8; 100];
    bytes.extend_from_slice(&[0x0a, 0x00, 0x00, 0x00, 0x01, 0x0f, 0x00, 0x00]);
    let h = parse(&bytes, 100).unwrap();
    assert_eq!(h.page_type, PageType::IndexLeaf);
    assert_eq!(h.num_cells, 1);
}

#[test]
fn test_parse_zero_content_start_means_65536() {
    let bytes: &[u8] = &[0x0d, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    let h = parse(bytes, 0).unwrap();
    assert_eq!(h.cell_content_start, 65536);
}

#[test]
fn test_parse_invalid_page_type() {
    let bytes: &[u8] = &[0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    assert!(matches!(parse(bytes, 0), Err(Error::InvalidPageType(0x07))));
}

#[test]
fn test_parse_truncated_page() {
    let bytes: &[u8] = &[0x0d, 0x00, 0x00];
    assert!(matches!(parse(bytes, 0), Err(Error::Truncated)));
    // Interior header cut off before the rightmost pointer.
    let bytes: &[u8] = &[0x05, 0x00, 0x00, 0x00, 0x01, 0x0f, 0x00, 0x00, 0x00];
    assert!(matches!(parse(bytes, 0), Err(Error::Truncated)));
}
