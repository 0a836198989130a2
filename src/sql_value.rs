//! Defines an enum of all the values this engine materializes out of stored
//! records, and the total order used to compare index keys.

use std::cmp::Ordering;

/// Can hold any value the supported storage classes decode to: signed
/// integers, UTF-8 text, or NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Null(),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Int(x) => x.fmt(f),
            SqlValue::Text(x) => x.fmt(f),
            SqlValue::Null() => "NULL".fmt(f),
        }
    }
}

use crate::ast;
pub fn from_ast_constant(c: &ast::Constant) -> SqlValue {
    match c {
        ast::Constant::Int(i) => SqlValue::Int(*i),
        ast::Constant::String(s) => SqlValue::Text(s.clone()),
    }
}

/// Total order for index key comparison.
///
/// NULL sorts below every non-NULL value (and equal to NULL); values of the
/// same kind compare naturally, text byte-wise over its UTF-8 encoding; an
/// integer sorts below any text.
pub fn cmp_values(a: &SqlValue, b: &SqlValue) -> Ordering {
    use SqlValue::*;
    match (a, b) {
        (Null(), Null()) => Ordering::Equal,
        (Null(), _) => Ordering::Less,
        (_, Null()) => Ordering::Greater,
        (Int(x), Int(y)) => x.cmp(y),
        (Text(x), Text(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Int(_), Text(_)) => Ordering::Less,
        (Text(_), Int(_)) => Ordering::Greater,
    }
}

/// Lexicographic comparison of `key` against `prefix`, over the first
/// `prefix.len()` components only. Extra trailing components of `key` (an
/// index entry's rowid pointer) do not participate.
pub fn cmp_key_prefix(key: &[SqlValue], prefix: &[SqlValue]) -> Ordering {
    for (k, p) in key.iter().zip(prefix.iter()) {
        match cmp_values(k, p) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    if key.len() < prefix.len() {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

#[test]
fn test_cmp_values() {
    use SqlValue::*;
    let cases = vec![
        (Null(), Null(), Ordering::Equal),
        (Null(), Int(-5), Ordering::Less),
        (Int(0), Null(), Ordering::Greater),
        (Int(1), Int(2), Ordering::Less),
        (Int(-1), Int(-2), Ordering::Greater),
        (Int(7), Int(7), Ordering::Equal),
        (Text("a".to_string()), Text("b".to_string()), Ordering::Less),
        (Text("ab".to_string()), Text("a".to_string()), Ordering::Greater),
        (Text("Red".to_string()), Text("Red".to_string()), Ordering::Equal),
        (Int(i64::MAX), Text("".to_string()), Ordering::Less),
        (Text("".to_string()), Int(i64::MIN), Ordering::Greater),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: {} vs {}", i, case.0, case.1);
        assert_eq!(cmp_values(&case.0, &case.1), case.2);
    }
}

#[test]
fn test_cmp_key_prefix_ignores_trailing_components() {
    use SqlValue::*;
    // An index entry carries (color, rowid); a one-column probe never sees
    // the rowid.
    let entry = vec![Text("Red".to_string()), Int(99)];
    assert_eq!(
        cmp_key_prefix(&entry, &[Text("Red".to_string())]),
        Ordering::Equal
    );
    assert_eq!(
        cmp_key_prefix(&entry, &[Text("Blue".to_string())]),
        Ordering::Greater
    );
    assert_eq!(
        cmp_key_prefix(&entry, &[Text("Yellow".to_string())]),
        Ordering::Less
    );
}

#[test]
fn test_cmp_key_prefix_composite() {
    use SqlValue::*;
    let entry = vec![Text("Red".to_string()), Int(4), Int(17)];
    let probe = vec![Text("Red".to_string()), Int(5)];
    assert_eq!(cmp_key_prefix(&entry, &probe), Ordering::Less);
    // A key shorter than the probe compares less on the missing component.
    assert_eq!(cmp_key_prefix(&entry[..1], &probe), Ordering::Less);
}
