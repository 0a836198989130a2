//! executor runs validated SELECT statements against a database file:
//! resolve the table, re-parse its stored creation SQL, pick the access
//! path, and project the matching rows.

use anyhow::{anyhow, bail, Context, Result};
use std::cmp::Ordering;
use std::str::FromStr;
use streaming_iterator::StreamingIterator;
use tracing::debug;

use crate::ast::{self, SelItem};
use crate::btree::{index, table, RowId};
use crate::pager::Pager;
use crate::parser;
use crate::record::Record;
use crate::schema::{Schema, SchemaIndex};
use crate::sql_type::SqlType;
use crate::sql_value::{cmp_values, from_ast_constant, SqlValue};

/// How the executor reached the rows of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    FullScan,
    IndexLookup(String),
}

/// One result row. `row_id` is the btree key of the row it was built from
/// (0 for synthesized rows such as the `count(*)` aggregate).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub row_id: RowId,
    pub items: Vec<SqlValue>,
}

/// Materialized result of one statement.
#[derive(Debug, Clone)]
pub struct QueryOutputTable {
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
    pub access_path: AccessPath,
}

/// Parses and runs one SQL statement. Only SELECT is executable.
pub fn run_query(pager: &Pager, query: &str) -> Result<QueryOutputTable> {
    let stmt = parser::parse_statement(query)?;
    let select = match stmt {
        ast::Statement::Select(s) => s,
        ast::Statement::CreateTable(_) | ast::Statement::CreateIndex(_) => {
            bail!("only SELECT statements can be executed")
        }
    };
    let schema = Schema::load(pager)?;
    execute_select(pager, &schema, &select)
}

fn execute_select(
    pager: &Pager,
    schema: &Schema,
    select: &ast::SelectStatement,
) -> Result<QueryOutputTable> {
    let schema_table = schema
        .table(&select.tablename)
        .ok_or_else(|| anyhow!("no such table: {}", select.tablename))?;
    let create = parser::parse_create_table(&schema_table.sql)
        .with_context(|| format!("re-parsing creation sql of table {}", schema_table.name))?;
    let column_names: Vec<String> = create
        .coldefs
        .iter()
        .map(|c| c.colname.name.clone())
        .collect();
    // An INTEGER PRIMARY KEY column holds the row's btree key, not a stored
    // field; its value is substituted from the cell's rowid. Primary keys of
    // other types are ordinary stored columns.
    let pk_index = create
        .coldefs
        .iter()
        .position(|c| c.is_primary_key && SqlType::from_str(&c.coltype) == Ok(SqlType::Int));

    // count(*) must be the entire projection if present.
    let count_star = select.items.iter().any(|i| i.is_count_star());
    if count_star && select.items.len() > 1 {
        bail!("count(*) cannot be combined with other columns");
    }

    // Resolve every projected column (and the WHERE column) against the
    // schema before touching any btree.
    let mut projected: Vec<usize> = Vec::new();
    for item in &select.items {
        match item {
            SelItem::ColName(c) => projected.push(resolve_column(&column_names, &c.name)?),
            SelItem::Star => projected.extend(0..column_names.len()),
            SelItem::CountStar => {}
        }
    }
    let filter = match &select.where_clause {
        Some(w) => Some((
            resolve_column(&column_names, &w.column)?,
            from_ast_constant(&w.value),
        )),
        None => None,
    };

    // With an equality filter, an index whose first indexed column is the
    // WHERE column serves the rowids; otherwise scan and filter in memory.
    let chosen_index = match &select.where_clause {
        Some(w) => choose_index(schema, &schema_table.name, &w.column)?,
        None => None,
    };

    let (rows, access_path) = match (chosen_index, &filter) {
        (Some(index_meta), Some((_, value))) => {
            debug!(index = %index_meta.name, "using index lookup");
            let rows = index_path(
                pager,
                index_meta,
                schema_table.root_page,
                value,
                column_names.len(),
                pk_index,
            )?;
            (rows, AccessPath::IndexLookup(index_meta.name.clone()))
        }
        _ => {
            debug!(table = %schema_table.name, "using full scan");
            let rows = scan_path(
                pager,
                schema_table.root_page,
                column_names.len(),
                pk_index,
                filter.as_ref(),
            )?;
            (rows, AccessPath::FullScan)
        }
    };

    if count_star {
        return Ok(QueryOutputTable {
            column_names: vec!["count(*)".to_string()],
            rows: vec![Row {
                row_id: 0,
                items: vec![SqlValue::Int(rows.len() as i64)],
            }],
            access_path,
        });
    }
    Ok(QueryOutputTable {
        column_names: projected
            .iter()
            .map(|i| column_names[*i].clone())
            .collect(),
        rows: rows
            .into_iter()
            .map(|r| Row {
                row_id: r.row_id,
                items: projected.iter().map(|i| r.items[*i].clone()).collect(),
            })
            .collect(),
        access_path,
    })
}

fn resolve_column(column_names: &[String], name: &str) -> Result<usize> {
    column_names
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("no such column: {}", name))
}

/// Picks the first index on `table_name` whose leading indexed column is the
/// WHERE column, re-parsing each stored CREATE INDEX statement.
fn choose_index<'s>(
    schema: &'s Schema,
    table_name: &'s str,
    where_column: &str,
) -> Result<Option<&'s SchemaIndex>> {
    for index_meta in schema.indexes_on(table_name) {
        let create = parser::parse_create_index(&index_meta.sql)
            .with_context(|| format!("re-parsing creation sql of index {}", index_meta.name))?;
        if create
            .columns
            .first()
            .is_some_and(|c| c.name.eq_ignore_ascii_case(where_column))
        {
            return Ok(Some(index_meta));
        }
    }
    Ok(None)
}

fn index_path(
    pager: &Pager,
    index_meta: &SchemaIndex,
    table_root: crate::pager::PageNum,
    value: &SqlValue,
    column_count: usize,
    pk_index: Option<usize>,
) -> Result<Vec<Row>> {
    let key_prefix = vec![value.clone()];
    let rowids = index::find_rowids(pager, index_meta.root_page, &key_prefix)?;
    let mut lookup = table::Lookup::new(pager, table_root);
    let mut rows = Vec::with_capacity(rowids.len());
    for rowid in rowids {
        let (rowid, record) = lookup
            .get(rowid)?
            .ok_or_else(|| anyhow!("row id {} from index {} not found", rowid, index_meta.name))?;
        rows.push(build_row(column_count, pk_index, rowid, &record)?);
    }
    Ok(rows)
}

fn scan_path(
    pager: &Pager,
    table_root: crate::pager::PageNum,
    column_count: usize,
    pk_index: Option<usize>,
    filter: Option<&(usize, SqlValue)>,
) -> Result<Vec<Row>> {
    let mut stream = ScanRows {
        it: table::ScanIterator::new(pager, table_root),
        column_count,
        pk_index,
        item: None,
        error: None,
    };
    let mut rows = Vec::new();
    while let Some(row) = stream.next() {
        if let Some((column, value)) = filter {
            if cmp_values(&row.items[*column], value) != Ordering::Equal {
                continue;
            }
        }
        rows.push(row.clone());
    }
    if let Some(e) = stream.error {
        return Err(e);
    }
    Ok(rows)
}

/// Streams typed rows out of a table scan, building each row once and
/// lending it by reference. A failure parks the error and ends the stream.
struct ScanRows<'p> {
    it: table::ScanIterator<'p>,
    column_count: usize,
    pk_index: Option<usize>,
    item: Option<Row>,
    error: Option<anyhow::Error>,
}

impl StreamingIterator for ScanRows<'_> {
    type Item = Row;

    fn advance(&mut self) {
        if self.error.is_some() {
            self.item = None;
            return;
        }
        self.item = match self.it.next() {
            Some(Ok((rowid, record))) => {
                match build_row(self.column_count, self.pk_index, rowid, &record) {
                    Ok(row) => Some(row),
                    Err(e) => {
                        self.error = Some(e);
                        None
                    }
                }
            }
            Some(Err(e)) => {
                self.error = Some(e.into());
                None
            }
            None => None,
        };
    }

    fn get(&self) -> Option<&Row> {
        self.item.as_ref()
    }
}

/// Builds a typed row from a table-leaf record: one value per schema
/// column, with the rowid substituted under the integer primary key column.
/// Columns the record does not reach (added after the row was written) read
/// as NULL.
fn build_row(
    column_count: usize,
    pk_index: Option<usize>,
    rowid: RowId,
    record: &Record,
) -> Result<Row> {
    if record.len() > column_count {
        bail!(
            "record has {} values but the table has {} columns",
            record.len(),
            column_count
        );
    }
    let mut items = Vec::with_capacity(column_count);
    for i in 0..column_count {
        if pk_index == Some(i) {
            items.push(SqlValue::Int(rowid));
        } else if i < record.len() {
            items.push(record.value(i)?);
        } else {
            items.push(SqlValue::Null());
        }
    }
    Ok(Row {
        row_id: rowid,
        items,
    })
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_run_query_projects_named_columns() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT name FROM apples").unwrap();
    assert_eq!(qot.column_names, vec!["name".to_string()]);
    assert_eq!(qot.access_path, AccessPath::FullScan);
    let names: Vec<SqlValue> = qot.rows.iter().map(|r| r.items[0].clone()).collect();
    assert_eq!(
        names,
        vec![
            SqlValue::Text("Granny Smith".to_string()),
            SqlValue::Text("Fuji".to_string()),
            SqlValue::Text("Honeycrisp".to_string()),
        ]
    );
}

#[test]
fn test_run_query_substitutes_rowid_for_primary_key() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT id, name FROM apples").unwrap();
    assert_eq!(qot.rows[0].items[0], SqlValue::Int(1));
    assert_eq!(qot.rows[1].items[0], SqlValue::Int(2));
    assert_eq!(qot.rows[2].items[0], SqlValue::Int(3));
}

#[test]
fn test_run_query_star_expands_all_columns() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT * FROM apples").unwrap();
    assert_eq!(
        qot.column_names,
        vec!["id".to_string(), "name".to_string(), "color".to_string()]
    );
    assert_eq!(
        qot.rows[1].items,
        vec![
            SqlValue::Int(2),
            SqlValue::Text("Fuji".to_string()),
            SqlValue::Text("Red".to_string()),
        ]
    );
}

#[test]
fn test_run_query_count_star() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT count(*) FROM apples").unwrap();
    assert_eq!(qot.column_names, vec!["count(*)".to_string()]);
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(qot.rows[0].items, vec![SqlValue::Int(3)]);
}

#[test]
fn test_run_query_where_uses_index() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT id, name FROM apples WHERE color = 'Red'").unwrap();
    assert_eq!(
        qot.access_path,
        AccessPath::IndexLookup("idx_apples_color".to_string())
    );
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(
        qot.rows[0].items,
        vec![SqlValue::Int(2), SqlValue::Text("Fuji".to_string())]
    );
}

#[test]
fn test_run_query_where_without_index_scans() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT color FROM apples WHERE name = 'Fuji'").unwrap();
    assert_eq!(qot.access_path, AccessPath::FullScan);
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(qot.rows[0].items, vec![SqlValue::Text("Red".to_string())]);
}

#[test]
fn test_run_query_where_no_matches_is_empty() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let qot = run_query(&pager, "SELECT name FROM apples WHERE color = 'Purple'").unwrap();
    assert!(qot.rows.is_empty());
}

#[test]
fn test_run_query_semantic_errors() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let cases = vec![
        "SELECT name FROM oranges",
        "SELECT flavor FROM apples",
        "SELECT name FROM apples WHERE flavor = 'Sweet'",
        "SELECT count(*), name FROM apples",
        "CREATE TABLE pears (id integer)",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(run_query(&pager, case).is_err());
    }
}

#[test]
fn test_count_star_agrees_with_projection_length() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let count = run_query(&pager, "SELECT count(*) FROM fruits").unwrap();
    let all = run_query(&pager, "SELECT name FROM fruits").unwrap();
    assert_eq!(
        count.rows[0].items[0],
        SqlValue::Int(all.rows.len() as i64)
    );
    assert_eq!(all.rows.len(), 600);
}

#[test]
fn test_index_path_agrees_with_scan_on_multipage_db() {
    let path = path_to_testdata("multipage.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let indexed = run_query(&pager, "SELECT id, color FROM fruits WHERE color = 'Crimson'").unwrap();
    assert_eq!(
        indexed.access_path,
        AccessPath::IndexLookup("idx_fruits_color".to_string())
    );
    // Every indexed hit carries the queried color.
    assert!(indexed
        .rows
        .iter()
        .all(|r| r.items[1] == SqlValue::Text("Crimson".to_string())));
    // And the id set matches an in-memory filter over a full scan.
    let mut indexed_ids: Vec<i64> = indexed
        .rows
        .iter()
        .map(|r| match r.items[0] {
            SqlValue::Int(i) => i,
            _ => panic!("id should be an integer"),
        })
        .collect();
    indexed_ids.sort_unstable();
    let all = run_query(&pager, "SELECT id, color FROM fruits").unwrap();
    let scanned_ids: Vec<i64> = all
        .rows
        .iter()
        .filter(|r| r.items[1] == SqlValue::Text("Crimson".to_string()))
        .map(|r| match r.items[0] {
            SqlValue::Int(i) => i,
            _ => panic!("id should be an integer"),
        })
        .collect();
    assert_eq!(indexed_ids, scanned_ids);
    assert_eq!(indexed_ids.len(), 60);
}
