//! Defines an enum of the column types this engine accepts in CREATE TABLE
//! text, and conversion from the type names SQLite stores.
use std::str::FromStr;
use thiserror::Error;

/// The schema-level types of storable values. SQLite accepts aliases like
/// `string` for `text` in create statements; values always carry the
/// canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    Text,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Int => "integer".fmt(f),
            SqlType::Text => "text".fmt(f),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unable to parse SqlType from creation SQL: {0}.")]
    ParseSqlTypeError(String),
}

impl FromStr for SqlType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Ok(SqlType::Int),
            "text" | "string" | "varchar" => Ok(SqlType::Text),
            x => Err(Error::ParseSqlTypeError(String::from(x))),
        }
    }
}

#[test]
fn test_from_str() {
    let cases = vec![
        ("int", SqlType::Int),
        ("INTEGER", SqlType::Int),
        ("text", SqlType::Text),
        ("String", SqlType::Text),
        ("varchar", SqlType::Text),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: parse {:?}", i, case.0);
        assert_eq!(SqlType::from_str(case.0), Ok(case.1));
    }
    assert!(SqlType::from_str("real").is_err());
    assert!(SqlType::from_str("blob").is_err());
}
