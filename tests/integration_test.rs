use rolite::sql_value::SqlValue;
use rolite::{run_query, AccessPath, Pager, Schema};

fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

fn open_testdb(filename: &str) -> Pager {
    let path = path_to_testdata(filename);
    Pager::open(path.as_str()).expect("Should have opened db with pager.")
}

#[test]
fn test_dbinfo_fields_on_apples_db() {
    let pager = open_testdb("apples.db");
    assert_eq!(pager.page_size(), 4096);
    // The schema page holds two cells: the table and its index. The count
    // deliberately includes index entries.
    assert_eq!(pager.tables_count(), 2);
}

#[test]
fn test_schema_lists_tables_and_indexes() {
    let pager = open_testdb("apples.db");
    let schema = Schema::load(&pager).expect("Should have loaded schema.");
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["apples"]);
    let index_names: Vec<&str> = schema.indexes.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(index_names, vec!["idx_apples_color"]);
}

#[test]
fn test_select_single_column() {
    let pager = open_testdb("apples.db");
    let qot = run_query(&pager, "SELECT name FROM apples").unwrap();
    let names: Vec<String> = qot.rows.iter().map(|r| r.items[0].to_string()).collect();
    assert_eq!(names, vec!["Granny Smith", "Fuji", "Honeycrisp"]);
}

#[test]
fn test_select_count_star() {
    let pager = open_testdb("apples.db");
    let qot = run_query(&pager, "SELECT count(*) FROM apples").unwrap();
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(qot.rows[0].items, vec![SqlValue::Int(3)]);
}

#[test]
fn test_select_with_indexed_where() {
    let pager = open_testdb("apples.db");
    let qot = run_query(&pager, "SELECT id, name FROM apples WHERE color = 'Red'").unwrap();
    assert_eq!(
        qot.access_path,
        AccessPath::IndexLookup("idx_apples_color".to_string()),
        "an equality filter on an indexed column must use the index path"
    );
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(
        qot.rows[0].items,
        vec![SqlValue::Int(2), SqlValue::Text("Fuji".to_string())]
    );
}

#[test]
fn test_select_with_where_matching_nothing() {
    let pager = open_testdb("apples.db");
    let qot = run_query(&pager, "SELECT name FROM apples WHERE color = 'Purple'").unwrap();
    assert!(qot.rows.is_empty());
}

#[test]
fn test_select_on_minimal_db() {
    let pager = open_testdb("minimal.db");
    let qot = run_query(&pager, "select b from a").unwrap();
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(qot.rows[0].items, vec![SqlValue::Int(1)]);
}

#[test]
fn test_select_star_on_multipage_db() {
    let pager = open_testdb("multipage.db");
    let qot = run_query(&pager, "select * from fruits").unwrap();
    assert_eq!(qot.column_names, vec!["id", "name", "color"]);
    assert_eq!(qot.rows.len(), 600);

    assert_eq!(
        qot.rows[0].items,
        vec![
            SqlValue::Int(1),
            SqlValue::Text("Gala Russet".to_string()),
            SqlValue::Text("Green".to_string()),
        ]
    );
    assert_eq!(
        qot.rows[283].items,
        vec![
            SqlValue::Int(284),
            SqlValue::Text("Envy Pink".to_string()),
            SqlValue::Text("Blush Red".to_string()),
        ]
    );
    assert_eq!(
        qot.rows[599].items,
        vec![
            SqlValue::Int(600),
            SqlValue::Text("Fuji Red".to_string()),
            SqlValue::Text("Red".to_string()),
        ]
    );
}

#[test]
fn test_indexed_where_on_multipage_db() {
    let pager = open_testdb("multipage.db");
    let qot = run_query(&pager, "SELECT id FROM fruits WHERE color = 'Golden'").unwrap();
    assert_eq!(
        qot.access_path,
        AccessPath::IndexLookup("idx_fruits_color".to_string())
    );
    // Color of row i is drawn from a 10-slot palette; "Golden" is slot 5.
    let mut ids: Vec<i64> = qot
        .rows
        .iter()
        .map(|r| match r.items[0] {
            SqlValue::Int(i) => i,
            _ => panic!("id should be an integer"),
        })
        .collect();
    ids.sort_unstable();
    let expected: Vec<i64> = (0..60).map(|k| 5 + 10 * k).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_unindexed_where_scans_on_multipage_db() {
    let pager = open_testdb("multipage.db");
    let qot = run_query(&pager, "SELECT id FROM fruits WHERE name = 'Gala Russet'").unwrap();
    assert_eq!(qot.access_path, AccessPath::FullScan);
    assert!(!qot.rows.is_empty());
}

#[test]
fn test_where_on_rowid_alias_column() {
    // "id" is the integer primary key: its values only exist as rowids, so
    // the in-memory filter must compare against the substituted value.
    let pager = open_testdb("multipage.db");
    let qot = run_query(&pager, "SELECT name FROM fruits WHERE id = 284").unwrap();
    assert_eq!(qot.rows.len(), 1);
    assert_eq!(
        qot.rows[0].items,
        vec![SqlValue::Text("Envy Pink".to_string())]
    );
}

#[test]
fn test_select_from_the_schema_table() {
    let pager = open_testdb("apples.db");
    let qot = run_query(&pager, "SELECT name FROM sqlite_schema").unwrap();
    let names: Vec<String> = qot.rows.iter().map(|r| r.items[0].to_string()).collect();
    assert_eq!(names, vec!["apples", "idx_apples_color"]);
}

#[test]
fn test_errors_bubble_to_caller() {
    let pager = open_testdb("apples.db");
    assert!(run_query(&pager, "SELECT name FROM pears").is_err());
    assert!(run_query(&pager, "SELECT taste FROM apples").is_err());
    assert!(run_query(&pager, "DROP TABLE apples").is_err());
}
