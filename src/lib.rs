//! rolite is a read-only query engine over the SQLite version-3 file
//! format, defined at <https://www.sqlite.org/fileformat.html>.
//!
//! It decodes the on-disk btree structures directly and executes a small
//! SQL subset: `SELECT col, ... FROM t [WHERE col = literal]` and
//! `SELECT count(*) FROM t`. An equality filter on the leading column of an
//! index is served by walking the index btree for rowids and point-looking
//! each row up in the table btree; everything else is a full scan with an
//! in-memory filter.
//!
//! The engine trusts the file: beyond the magic string no checksums,
//! change counters or version fields are validated. Write paths,
//! transactions, the WAL, overflow pages, floats and blobs are out of
//! scope.

pub mod ast;
pub mod btree;
pub mod dbheader;
pub mod executor;
pub mod formatting;
pub mod pager;
pub mod parser;
pub mod record;
pub mod schema;
pub mod serial_type;
pub mod sql_type;
pub mod sql_value;
pub mod tokenizer;
pub mod varint;

pub use executor::{run_query, AccessPath, QueryOutputTable, Row};
pub use pager::Pager;
pub use schema::Schema;
