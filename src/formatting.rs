//! formatting renders query results, one pipe-delimited row per line.

use anyhow::Result;
use itertools::Itertools;
use std::io::Write;

use crate::executor::QueryOutputTable;

pub fn write_rows<W: Write>(out: &mut W, qot: &QueryOutputTable) -> Result<()> {
    for row in qot.rows.iter() {
        writeln!(out, "{}", row.items.iter().map(|v| v.to_string()).join("|"))?;
    }
    Ok(())
}

#[cfg(test)]
use crate::executor::{AccessPath, Row};
#[cfg(test)]
use crate::sql_value::SqlValue;

#[test]
fn test_write_rows() {
    let qot = QueryOutputTable {
        column_names: vec!["id".to_string(), "name".to_string()],
        rows: vec![
            Row {
                row_id: 2,
                items: vec![SqlValue::Int(2), SqlValue::Text("Fuji".to_string())],
            },
            Row {
                row_id: 3,
                items: vec![SqlValue::Int(3), SqlValue::Null()],
            },
        ],
        access_path: AccessPath::FullScan,
    };
    let mut out = Vec::new();
    write_rows(&mut out, &qot).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "2|Fuji\n3|NULL\n");
}

#[test]
fn test_write_rows_empty_result_prints_nothing() {
    let qot = QueryOutputTable {
        column_names: vec!["name".to_string()],
        rows: vec![],
        access_path: AccessPath::FullScan,
    };
    let mut out = Vec::new();
    write_rows(&mut out, &qot).unwrap();
    assert!(out.is_empty());
}
