//! table provides the two traversals over table-type btrees: the full scan
//! and the rowid point lookup. Both hide the fact that a btree spans
//! several pages.

use std::collections::{HashMap, VecDeque};

use super::{cell, PageType, RowId};
use crate::pager::{Page, PageNum, Pager};
use crate::record::Record;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Pager: {0}")]
    Pager(#[from] crate::pager::Error),
    #[error("Cell: {0}")]
    Cell(#[from] cell::Error),
    #[error("Page type {0:?} does not belong in a table btree.")]
    UnexpectedPageType(PageType),
}

/// Iterator over every `(rowid, record)` of a table btree, in rowid order.
///
/// The page graph is walked breadth-first from the root: an interior page
/// enqueues its left children in cell pointer order followed by its
/// rightmost pointer. Leaves all sit at the same depth, so they surface in
/// key order. The tree is trusted to be acyclic (an invariant of the
/// format).
pub struct ScanIterator<'p> {
    pager: &'p Pager,
    queue: VecDeque<PageNum>,
    leaf: Option<(Page<'p>, usize)>,
    failed: bool,
}

impl<'p> ScanIterator<'p> {
    pub fn new(pager: &'p Pager, root: PageNum) -> ScanIterator<'p> {
        ScanIterator {
            pager,
            queue: VecDeque::from([root]),
            leaf: None,
            failed: false,
        }
    }

    /// Dequeues pages until the next leaf, expanding interior pages into
    /// the queue as they are met.
    fn next_leaf(&mut self) -> Result<Option<Page<'p>>, Error> {
        while let Some(pn) = self.queue.pop_front() {
            let page = self.pager.read_page(pn)?;
            match page.page_type() {
                PageType::TableLeaf => return Ok(Some(page)),
                PageType::TableInterior => {
                    for i in 0..page.num_cells() {
                        let c = cell::read_table_interior(page.data(), page.cell_offset(i))?;
                        self.queue.push_back(c.left_child);
                    }
                    if let Some(rmp) = page.header.rightmost_pointer {
                        self.queue.push_back(rmp as PageNum);
                    }
                }
                t => return Err(Error::UnexpectedPageType(t)),
            }
        }
        Ok(None)
    }
}

impl<'p> Iterator for ScanIterator<'p> {
    type Item = Result<(RowId, Record<'p>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some((page, idx)) = self.leaf.take() {
                if idx < page.num_cells() {
                    let result = cell::read_table_leaf(page.data(), page.cell_offset(idx));
                    self.leaf = Some((page, idx + 1));
                    match result {
                        Ok(c) => return Some(Ok((c.rowid, c.record))),
                        Err(e) => {
                            self.failed = true;
                            return Some(Err(e.into()));
                        }
                    }
                }
            }
            match self.next_leaf() {
                Ok(Some(page)) => self.leaf = Some((page, 0)),
                Ok(None) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Point lookup of single rows by rowid, descending from the root page.
///
/// Each level is bisected: interior pages by the lower bound of the rowid in
/// their key sequence (following the rightmost pointer when every key is
/// smaller), the leaf by exact match. Keys decoded while bisecting are
/// memoized per page, so a batch of lookups through the same pages does not
/// re-decode cells.
pub struct Lookup<'p> {
    pager: &'p Pager,
    root: PageNum,
    interior_memo: HashMap<(PageNum, usize), cell::TableInteriorCell>,
    leaf_memo: HashMap<(PageNum, usize), RowId>,
}

impl<'p> Lookup<'p> {
    pub fn new(pager: &'p Pager, root: PageNum) -> Lookup<'p> {
        Lookup {
            pager,
            root,
            interior_memo: HashMap::new(),
            leaf_memo: HashMap::new(),
        }
    }

    fn interior_cell(
        &mut self,
        page: &Page<'p>,
        idx: usize,
    ) -> Result<cell::TableInteriorCell, Error> {
        if let Some(c) = self.interior_memo.get(&(page.number(), idx)) {
            return Ok(*c);
        }
        let c = cell::read_table_interior(page.data(), page.cell_offset(idx))?;
        self.interior_memo.insert((page.number(), idx), c);
        Ok(c)
    }

    fn leaf_rowid(&mut self, page: &Page<'p>, idx: usize) -> Result<RowId, Error> {
        if let Some(r) = self.leaf_memo.get(&(page.number(), idx)) {
            return Ok(*r);
        }
        let r = cell::table_leaf_rowid(page.data(), page.cell_offset(idx))?;
        self.leaf_memo.insert((page.number(), idx), r);
        Ok(r)
    }

    /// Returns the row with the given rowid, or None if the tree holds no
    /// such row.
    pub fn get(&mut self, rowid: RowId) -> Result<Option<(RowId, Record<'p>)>, Error> {
        let mut pn = self.root;
        loop {
            let page = self.pager.read_page(pn)?;
            match page.page_type() {
                PageType::TableInterior => {
                    // Lower bound of rowid in the monotonically increasing
                    // key sequence.
                    let (mut lo, mut hi) = (0, page.num_cells());
                    while lo < hi {
                        let mid = (lo + hi) / 2;
                        if self.interior_cell(&page, mid)?.key < rowid {
                            lo = mid + 1;
                        } else {
                            hi = mid;
                        }
                    }
                    pn = if lo == page.num_cells() {
                        // All keys are smaller: the row, if present, is in
                        // the rightmost subtree.
                        match page.header.rightmost_pointer {
                            Some(rmp) => rmp as PageNum,
                            None => return Ok(None),
                        }
                    } else {
                        self.interior_cell(&page, lo)?.left_child
                    };
                }
                PageType::TableLeaf => {
                    let (mut lo, mut hi) = (0, page.num_cells());
                    while lo < hi {
                        let mid = (lo + hi) / 2;
                        if self.leaf_rowid(&page, mid)? < rowid {
                            lo = mid + 1;
                        } else {
                            hi = mid;
                        }
                    }
                    if lo < page.num_cells() && self.leaf_rowid(&page, lo)? == rowid {
                        let c = cell::read_table_leaf(page.data(), page.cell_offset(lo))?;
                        return Ok(Some((c.rowid, c.record)));
                    }
                    return Ok(None);
                }
                t => return Err(Error::UnexpectedPageType(t)),
            }
        }
    }
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[cfg(test)]
use crate::sql_value::SqlValue;

#[test]
fn test_scan_iterator_on_minimal_db() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    // Table "a" has root page 2 and a single row (1).
    let mut it = ScanIterator::new(&pager, 2);
    let (rowid, record) = it.next().expect("Should have a row.").unwrap();
    assert_eq!(rowid, 1);
    assert_eq!(record.value(0).unwrap(), SqlValue::Int(1));
    assert!(it.next().is_none());
}

#[test]
fn test_scan_iterator_visits_multipage_tree_in_rowid_order() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let rowids: Vec<RowId> = ScanIterator::new(&pager, 2)
        .map(|item| item.expect("Should have scanned row.").0)
        .collect();
    assert_eq!(rowids.len(), 600);
    assert_eq!(rowids[0], 1);
    assert_eq!(rowids[599], 600);
    // Strictly increasing along the traversal.
    assert!(rowids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_scan_completeness_matches_point_lookup() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let rowids: Vec<RowId> = ScanIterator::new(&pager, 2)
        .map(|item| item.unwrap().0)
        .collect();
    let mut lookup = Lookup::new(&pager, 2);
    for rowid in &rowids {
        assert!(lookup.get(*rowid).unwrap().is_some());
    }
    assert!(lookup.get(0).unwrap().is_none());
    assert!(lookup.get(601).unwrap().is_none());
}

#[test]
fn test_lookup_on_multipage_db() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let mut lookup = Lookup::new(&pager, 2);

    let (rowid, record) = lookup.get(284).unwrap().expect("Should have found row.");
    assert_eq!(rowid, 284);
    // Columns are (id, name, color); id is stored as NULL under the rowid.
    assert_eq!(record.value(0).unwrap(), SqlValue::Null());
    assert_eq!(record.value(1).unwrap(), SqlValue::Text("Envy Pink".to_string()));
    assert_eq!(
        record.value(2).unwrap(),
        SqlValue::Text("Blush Red".to_string())
    );

    // First and last rows exercise the leftmost and rightmost descents.
    assert!(lookup.get(1).unwrap().is_some());
    assert!(lookup.get(600).unwrap().is_some());
}

#[test]
fn test_interior_keys_bound_their_subtrees() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    // Page 2 is the interior root of the fruits table. Every interior cell
    // key is the maximum rowid of its left subtree, and the next subtree
    // starts above it.
    let root = pager.read_page(2).expect("Should have read root page.");
    assert_eq!(root.page_type(), PageType::TableInterior);
    let mut lower_bound = 0;
    for i in 0..root.num_cells() {
        let c = cell::read_table_interior(root.data(), root.cell_offset(i)).unwrap();
        let subtree: Vec<RowId> = ScanIterator::new(&pager, c.left_child)
            .map(|item| item.unwrap().0)
            .collect();
        assert!(!subtree.is_empty());
        assert!(*subtree.first().unwrap() > lower_bound);
        assert!(*subtree.last().unwrap() <= c.key);
        lower_bound = c.key;
    }
    let rightmost = root.header.rightmost_pointer.expect("interior page") as PageNum;
    let subtree: Vec<RowId> = ScanIterator::new(&pager, rightmost)
        .map(|item| item.unwrap().0)
        .collect();
    assert!(*subtree.first().unwrap() > lower_bound);
}

#[test]
fn test_lookup_on_single_leaf_db() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let mut lookup = Lookup::new(&pager, 2);
    assert!(lookup.get(1).unwrap().is_some());
    assert!(lookup.get(2).unwrap().is_none());
}
