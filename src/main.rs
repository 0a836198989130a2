use std::io::Write;

use anyhow::Result;
use itertools::Itertools;

use rolite::{formatting, run_query, Pager, Schema};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: rolite <database path> <command>");
        eprintln!("commands: .dbinfo | .tables | a SQL SELECT statement");
        std::process::exit(2);
    }
    let exit_code = run(&args[1], &args[2], &mut std::io::stdout(), &mut std::io::stderr());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Dispatches one command and returns the process exit code. The dot
/// commands fail loudly; a failed SQL statement reports to stderr but still
/// exits 0.
fn run<W: Write, E: Write>(path: &str, command: &str, out: &mut W, err: &mut E) -> i32 {
    match command {
        ".dbinfo" | ".tables" => match dot_command(path, command, out) {
            Ok(()) => 0,
            Err(e) => {
                let _ = writeln!(err, "{e:#}");
                1
            }
        },
        sql => match sql_command(path, sql, out) {
            Ok(()) => 0,
            Err(e) => {
                let _ = writeln!(err, "{e:#}");
                0
            }
        },
    }
}

fn dot_command<W: Write>(path: &str, command: &str, out: &mut W) -> Result<()> {
    let pager = Pager::open(path)?;
    match command {
        ".dbinfo" => {
            writeln!(out, "database page size: {}", pager.page_size())?;
            writeln!(out, "number of tables: {}", pager.tables_count())?;
        }
        ".tables" => {
            let schema = Schema::load(&pager)?;
            writeln!(out, "{}", schema.tables.iter().map(|t| t.name.as_str()).join(" "))?;
        }
        _ => unreachable!("dispatch only routes .dbinfo and .tables here"),
    }
    Ok(())
}

fn sql_command<W: Write>(path: &str, sql: &str, out: &mut W) -> Result<()> {
    let pager = Pager::open(path)?;
    let qot = run_query(&pager, sql)?;
    formatting::write_rows(out, &qot)
}

#[cfg(test)]
fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_run_dbinfo() {
    let path = path_to_testdata("apples.db");
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let code = run(&path, ".dbinfo", &mut out, &mut err);
    assert_eq!(code, 0);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "database page size: 4096\nnumber of tables: 2\n"
    );
}

#[test]
fn test_run_tables() {
    let path = path_to_testdata("apples.db");
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let code = run(&path, ".tables", &mut out, &mut err);
    assert_eq!(code, 0);
    assert_eq!(String::from_utf8(out).unwrap(), "apples\n");
}

#[test]
fn test_run_sql() {
    let path = path_to_testdata("apples.db");
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let code = run(&path, "SELECT name FROM apples", &mut out, &mut err);
    assert_eq!(code, 0);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Granny Smith\nFuji\nHoneycrisp\n"
    );
}

#[test]
fn test_run_bad_sql_reports_but_exits_zero() {
    let path = path_to_testdata("apples.db");
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let code = run(&path, "SELECT nope FROM apples", &mut out, &mut err);
    assert_eq!(code, 0);
    assert!(out.is_empty());
    assert!(!err.is_empty());
}

#[test]
fn test_run_dot_command_failure_is_nonzero() {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let code = run("/nonexistent/nope.db", ".dbinfo", &mut out, &mut err);
    assert_eq!(code, 1);
    assert!(!err.is_empty());
}
