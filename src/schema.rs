//! schema materializes the `sqlite_schema` table that every database stores
//! at root page 1, and partitions its rows into tables and indexes.

use tracing::debug;

use crate::btree::table::ScanIterator;
use crate::pager::{PageNum, Pager};
use crate::record::Record;
use crate::sql_value::SqlValue;

// Page 1 (the first page) is always a btree page, and it is the root page of
// the schema table. It has references to the root pages of other btrees.
pub const SCHEMA_TABLE_NAME: &str = "sqlite_schema";
pub const SCHEMA_BTREE_ROOT_PAGENUM: PageNum = 1;
pub const SCHEMA_SCHEMA: &str =
    "CREATE TABLE sqlite_schema (type text, name text, tbl_name text, rootpage integer, sql text)";
const SCHEMA_TABLE_TYPE_COLIDX: usize = 0;
const SCHEMA_TABLE_NAME_COLIDX: usize = 1;
const SCHEMA_TABLE_TBL_NAME_COLIDX: usize = 2;
const SCHEMA_TABLE_ROOTPAGE_COLIDX: usize = 3;
const SCHEMA_TABLE_SQL_COLIDX: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Btree: {0}")]
    Btree(#[from] crate::btree::table::Error),
    #[error("Record: {0}")]
    Record(#[from] crate::record::Error),
    #[error("Schema row column {0} has the wrong value kind.")]
    WrongValueKind(usize),
}

/// One `type = "table"` schema row.
#[derive(Debug, Clone)]
pub struct SchemaTable {
    pub name: String,
    pub root_page: PageNum,
    pub sql: String,
}

/// One `type = "index"` schema row.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    pub name: String,
    pub table_name: String,
    pub root_page: PageNum,
    pub sql: String,
}

/// All tables and indexes of one database, in schema row order.
#[derive(Debug, Clone)]
pub struct Schema {
    pub tables: Vec<SchemaTable>,
    pub indexes: Vec<SchemaIndex>,
}

impl Schema {
    /// Scans the schema btree from page 1. Schema rows are trusted, but a
    /// row whose name/sql fields are not text or whose rootpage is not an
    /// integer is a fatal format error.
    pub fn load(pager: &Pager) -> Result<Schema, Error> {
        let mut tables = Vec::new();
        let mut indexes = Vec::new();
        for item in ScanIterator::new(pager, SCHEMA_BTREE_ROOT_PAGENUM) {
            let (_rowid, record) = item?;
            let entry_type = text_column(&record, SCHEMA_TABLE_TYPE_COLIDX)?;
            let name = text_column(&record, SCHEMA_TABLE_NAME_COLIDX)?;
            match entry_type.as_str() {
                "table" => tables.push(SchemaTable {
                    name,
                    root_page: int_column(&record, SCHEMA_TABLE_ROOTPAGE_COLIDX)? as PageNum,
                    sql: text_column(&record, SCHEMA_TABLE_SQL_COLIDX)?,
                }),
                "index" => indexes.push(SchemaIndex {
                    name,
                    table_name: text_column(&record, SCHEMA_TABLE_TBL_NAME_COLIDX)?,
                    root_page: int_column(&record, SCHEMA_TABLE_ROOTPAGE_COLIDX)? as PageNum,
                    sql: text_column(&record, SCHEMA_TABLE_SQL_COLIDX)?,
                }),
                // Views and triggers are not materialized.
                _ => {}
            }
        }
        debug!(
            tables = tables.len(),
            indexes = indexes.len(),
            "loaded schema"
        );
        Ok(Schema { tables, indexes })
    }

    /// Looks a table up by name. SQL identifiers compare case-insensitively.
    /// The schema table itself resolves to its well-known root page and
    /// hardcoded creation SQL, so it can be queried like any other table.
    pub fn table(&self, name: &str) -> Option<SchemaTable> {
        if name.eq_ignore_ascii_case(SCHEMA_TABLE_NAME) {
            return Some(SchemaTable {
                name: SCHEMA_TABLE_NAME.to_string(),
                root_page: SCHEMA_BTREE_ROOT_PAGENUM,
                sql: SCHEMA_SCHEMA.to_string(),
            });
        }
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// The indexes declared on `table_name`, in schema row order.
    pub fn indexes_on<'s>(&'s self, table_name: &'s str) -> impl Iterator<Item = &'s SchemaIndex> {
        self.indexes
            .iter()
            .filter(move |i| i.table_name.eq_ignore_ascii_case(table_name))
    }
}

fn text_column(record: &Record, idx: usize) -> Result<String, Error> {
    match record.value(idx)? {
        SqlValue::Text(s) => Ok(s),
        _ => Err(Error::WrongValueKind(idx)),
    }
}

fn int_column(record: &Record, idx: usize) -> Result<i64, Error> {
    match record.value(idx)? {
        SqlValue::Int(i) => Ok(i),
        _ => Err(Error::WrongValueKind(idx)),
    }
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_load_schema_minimal_db() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let schema = Schema::load(&pager).expect("Should have loaded schema.");
    assert_eq!(schema.tables.len(), 1);
    assert!(schema.indexes.is_empty());
    let t = schema.table("a").expect("Should have found table.");
    assert_eq!(t.root_page, 2);
    assert_eq!(
        t.sql.to_lowercase().replace('\n', " "),
        "create table a ( b int )"
    );
}

#[test]
fn test_load_schema_with_index() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let schema = Schema::load(&pager).expect("Should have loaded schema.");
    assert_eq!(schema.tables.len(), 1);
    assert_eq!(schema.indexes.len(), 1);

    let t = schema.table("apples").expect("Should have found table.");
    assert_eq!(t.root_page, 2);

    let indexes: Vec<_> = schema.indexes_on("apples").collect();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "idx_apples_color");
    assert_eq!(indexes[0].root_page, 3);
    assert!(schema.indexes_on("oranges").next().is_none());
}

#[test]
fn test_schema_table_resolves_to_itself() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let schema = Schema::load(&pager).expect("Should have loaded schema.");
    let t = schema
        .table("sqlite_schema")
        .expect("Should have resolved the schema table.");
    assert_eq!(t.root_page, SCHEMA_BTREE_ROOT_PAGENUM);
    assert_eq!(t.sql, SCHEMA_SCHEMA);
}

#[test]
fn test_table_lookup_is_case_insensitive() {
    let path = path_to_testdata("apples.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let schema = Schema::load(&pager).expect("Should have loaded schema.");
    assert!(schema.table("APPLES").is_some());
    assert!(schema.table("pears").is_none());
}
