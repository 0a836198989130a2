//! Manages pages from a sqlite3 file as defined at
//! <https://www.sqlite.org/fileformat.html>. Supports a read-only subset of
//! the format.
//!
//! The pager owns the file handle and the data of each page, and hands out
//! `Page` views for reading. Page contents are loaded when the database is
//! opened and served from memory afterwards, so a page is read from disk at
//! most once per session.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::debug;

use crate::btree::header::{self, PageHeader};
use crate::btree::PageType;
use crate::dbheader;

// Page numbers are 1-based, to match how sqlite numbers pages. PageNum
// ensures people pass something that is meant to be a page number to a
// function that expects a page number.
pub type PageNum = usize;

// Caps memory use for unexpectedly large files. 10_000 * 4k page ~= 40MB.
const MAX_PAGE_NUM: PageNum = 10_000;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Pager: error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pager: error in database file header: {0}")]
    DbHdr(#[from] dbheader::Error),
    #[error("The page number is higher than the file contains or the code supports.")]
    PageNumberBeyondLimits,
    #[error("Pager: error in btree page header: {0}")]
    PageHeader(#[from] header::Error),
    #[error("Cell pointer out of bounds on page {0}.")]
    CellPointerOutOfBounds(PageNum),
    #[error("Page is too small to hold its cell pointer array.")]
    Truncated,
}

/// A `Pager` manages read access to one open database file.
pub struct Pager {
    pages: Vec<Vec<u8>>,
    page_size: u32,
    tables_count: u32,
}

impl Pager {
    /// Opens a database file read-only, verifies the header, and loads its
    /// pages.
    pub fn open(path: &str) -> Result<Pager, Error> {
        let mut f = std::fs::OpenOptions::new()
            .read(true)
            .write(false)
            .create(false)
            .open(path)?;
        let h = dbheader::get_header(&mut f)?;
        let file_len = f.metadata()?.len();
        let numpages = (file_len / h.pagesize as u64) as usize;
        if numpages > MAX_PAGE_NUM {
            return Err(Error::PageNumberBeyondLimits);
        }
        let mut pages: Vec<Vec<u8>> = Vec::with_capacity(numpages);
        f.seek(SeekFrom::Start(0))?;
        for _ in 0..numpages {
            let mut v = vec![0_u8; h.pagesize as usize];
            f.read_exact(&mut v[..])?;
            pages.push(v);
        }

        // Page 1's btree header starts after the database header. Its cell
        // count is published as the schema entry count; note that it counts
        // index entries too, and misses schema tables spanning extra pages.
        let page_one = pages.first().ok_or(Error::PageNumberBeyondLimits)?;
        let hdr = header::parse(page_one, dbheader::DB_HEADER_BYTES)?;

        debug!(path, page_size = h.pagesize, numpages, "opened database");
        Ok(Pager {
            pages,
            page_size: h.pagesize,
            tables_count: hdr.num_cells,
        })
    }

    /// The page size recorded in the database header.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Cell count of the schema page (page 1).
    pub fn tables_count(&self) -> u32 {
        self.tables_count
    }

    /// Reads page `pn` (1-based), decoding its btree header and cell
    /// pointer array.
    pub fn read_page(&self, pn: PageNum) -> Result<Page<'_>, Error> {
        if pn < 1 || pn > self.pages.len() {
            return Err(Error::PageNumberBeyondLimits);
        }
        Page::new(&self.pages[pn - 1], pn, self.page_size)
    }
}

/// One btree page: its raw bytes, decoded header, and cell pointer array.
pub struct Page<'p> {
    data: &'p [u8],
    number: PageNum,
    pub header: PageHeader,
    cell_offsets: Vec<usize>,
}

impl<'p> Page<'p> {
    fn new(data: &'p [u8], number: PageNum, page_size: u32) -> Result<Page<'p>, Error> {
        // The first page's btree header is preceded by the database header,
        // but cell offsets are still relative to byte 0 of the page.
        let base = match number {
            1 => dbheader::DB_HEADER_BYTES,
            _ => 0,
        };
        let header = header::parse(data, base)?;

        // The cell pointer array immediately follows the page header: 2-byte
        // big-endian offsets, in key order.
        let ptr_start = base + header.size();
        let num_cells = header.num_cells as usize;
        let ptr_end = ptr_start + 2 * num_cells;
        let mut c = Cursor::new(data.get(ptr_start..ptr_end).ok_or(Error::Truncated)?);
        let mut cell_offsets = Vec::with_capacity(num_cells);
        for _ in 0..num_cells {
            let off = c.read_u16::<BigEndian>().map_err(|_| Error::Truncated)? as usize;
            if (off as u32) < header.cell_content_start || off >= page_size as usize {
                return Err(Error::CellPointerOutOfBounds(number));
            }
            cell_offsets.push(off);
        }

        Ok(Page {
            data,
            number,
            header,
            cell_offsets,
        })
    }

    pub fn data(&self) -> &'p [u8] {
        self.data
    }

    pub fn number(&self) -> PageNum {
        self.number
    }

    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    pub fn num_cells(&self) -> usize {
        self.cell_offsets.len()
    }

    /// Byte offset of cell `i` within the page, in cell pointer order.
    pub fn cell_offset(&self, i: usize) -> usize {
        self.cell_offsets[i]
    }
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_open_db() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    assert_eq!(pager.page_size(), 4096);
    assert_eq!(pager.tables_count(), 1);
}

#[test]
fn test_open_missing_file() {
    assert!(matches!(
        Pager::open("/nonexistent/nope.db"),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_read_page_one_uses_offset_header() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let p1 = pager.read_page(1).expect("Should have read page 1.");
    assert_eq!(p1.page_type(), PageType::TableLeaf);
    assert_eq!(p1.num_cells(), 1);
    assert!(p1.cell_offset(0) >= p1.header.cell_content_start as usize);
}

#[test]
fn test_read_page_beyond_limits() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    assert!(matches!(
        pager.read_page(0),
        Err(Error::PageNumberBeyondLimits)
    ));
    assert!(matches!(
        pager.read_page(9999),
        Err(Error::PageNumberBeyondLimits)
    ));
}

#[test]
fn test_read_pages_of_multipage_db() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    assert_eq!(pager.page_size(), 512);
    // Page 2 is the fruits table root, which is interior in this fixture.
    let p2 = pager.read_page(2).expect("Should have read page 2.");
    assert_eq!(p2.page_type(), PageType::TableInterior);
    assert!(p2.header.rightmost_pointer.is_some());
}
