//! index provides the key-prefix traversal over index-type btrees: given
//! the leading columns of an index key, collect the rowids of every entry
//! whose prefix compares equal.

use std::cmp::Ordering;
use std::collections::VecDeque;

use super::{cell, PageType, RowId};
use crate::pager::{PageNum, Pager};
use crate::record::{self, Record};
use crate::sql_value::{cmp_key_prefix, SqlValue};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Pager: {0}")]
    Pager(#[from] crate::pager::Error),
    #[error("Cell: {0}")]
    Cell(#[from] cell::Error),
    #[error("Record: {0}")]
    Record(#[from] record::Error),
    #[error("Page type {0:?} does not belong in an index btree.")]
    UnexpectedPageType(PageType),
    #[error("Index record is missing its trailing rowid pointer.")]
    MissingRowid,
}

/// Collects the rowids of every index entry whose leading columns equal
/// `key_prefix` under the engine's value ordering.
///
/// The walk is breadth-first but pruned. On a leaf, cells before the prefix
/// are skipped and the scan stops at the first greater cell. On an interior
/// page, the left child of every cell comparing >= the prefix may contain
/// matches and is enqueued (stopping after the first greater cell); equal
/// interior cells contribute their own rowid, since equal keys can live in
/// interior cells. The rightmost pointer is followed only when no cell
/// compared greater.
pub fn find_rowids(
    pager: &Pager,
    root: PageNum,
    key_prefix: &[SqlValue],
) -> Result<Vec<RowId>, Error> {
    let mut rowids = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pn) = queue.pop_front() {
        let page = pager.read_page(pn)?;
        match page.page_type() {
            PageType::IndexLeaf => {
                for i in 0..page.num_cells() {
                    let c = cell::read_index_leaf(page.data(), page.cell_offset(i))?;
                    match compare_entry(&c.record, key_prefix)? {
                        Ordering::Less => continue,
                        Ordering::Equal => rowids.push(entry_rowid(&c.record)?),
                        // Cells are in key order; the rest are greater too.
                        Ordering::Greater => break,
                    }
                }
            }
            PageType::IndexInterior => {
                let mut saw_greater = false;
                for i in 0..page.num_cells() {
                    let c = cell::read_index_interior(page.data(), page.cell_offset(i))?;
                    match compare_entry(&c.record, key_prefix)? {
                        Ordering::Less => continue,
                        Ordering::Equal => {
                            queue.push_back(c.left_child);
                            rowids.push(entry_rowid(&c.record)?);
                        }
                        Ordering::Greater => {
                            queue.push_back(c.left_child);
                            saw_greater = true;
                            break;
                        }
                    }
                }
                if !saw_greater {
                    if let Some(rmp) = page.header.rightmost_pointer {
                        queue.push_back(rmp as PageNum);
                    }
                }
            }
            t => return Err(Error::UnexpectedPageType(t)),
        }
    }
    Ok(rowids)
}

/// Compares an index entry against the probe over the probe's width only;
/// the entry's trailing rowid never participates.
fn compare_entry(record: &Record, key_prefix: &[SqlValue]) -> Result<Ordering, Error> {
    let width = key_prefix.len().min(record.len());
    let mut columns = Vec::with_capacity(width);
    for i in 0..width {
        columns.push(record.value(i)?);
    }
    Ok(cmp_key_prefix(&columns, key_prefix))
}

/// The trailing column of an index record is the rowid of the table row it
/// points at.
fn entry_rowid(record: &Record) -> Result<RowId, Error> {
    if record.is_empty() {
        return Err(Error::MissingRowid);
    }
    match record.value(record.len() - 1)? {
        SqlValue::Int(rowid) => Ok(rowid),
        _ => Err(Error::MissingRowid),
    }
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_find_rowids_on_single_leaf_index() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    // idx_apples_color has root page 3.
    let cases: Vec<(&str, Vec<RowId>)> = vec![
        ("Red", vec![2]),
        ("Light Green", vec![1]),
        ("Blush Red", vec![3]),
        ("Purple", vec![]),
        // Probes below and above every stored key prune to nothing.
        ("Aaa", vec![]),
        ("zzz", vec![]),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: probe {:?}", i, case.0);
        let key = vec![SqlValue::Text(case.0.to_string())];
        assert_eq!(find_rowids(&pager, 3, &key).unwrap(), case.1);
    }
}

#[test]
fn test_find_rowids_on_multilevel_index() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    // idx_fruits_color has root page 39 and is two levels deep. Color of
    // row i is COLORS[i % 10], so "Crimson" (slot 6) matches 6, 16, ... 596.
    let key = vec![SqlValue::Text("Crimson".to_string())];
    let mut rowids = find_rowids(&pager, 39, &key).unwrap();
    rowids.sort_unstable();
    let expected: Vec<RowId> = (0..60).map(|k| 6 + 10 * k).collect();
    assert_eq!(rowids, expected);

    let key = vec![SqlValue::Text("Chartreuse".to_string())];
    assert_eq!(find_rowids(&pager, 39, &key).unwrap(), Vec::<RowId>::new());
}

#[test]
fn test_find_rowids_rejects_table_pages() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let key = vec![SqlValue::Text("Crimson".to_string())];
    assert!(matches!(
        find_rowids(&pager, 2, &key),
        Err(Error::UnexpectedPageType(PageType::TableInterior))
    ));
}
