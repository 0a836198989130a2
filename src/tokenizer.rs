//! tokenizer turns a SQL string into the token stream the parser consumes.
//! One pass, no lookahead. Keywords match case-insensitively; identifiers
//! are letters and underscores only; strings take single or double quotes
//! and have no escapes.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unexpected character {0:?} in SQL input.")]
    UnexpectedChar(char),
    #[error("Unterminated string literal.")]
    UnterminatedString,
    #[error("Numeric literal out of range.")]
    NumberOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Create,
    Table,
    Index,
    Select,
    From,
    Where,
    Primary,
    Key,
    On,
    Ident(String),
    Str(String),
    Num(i64),
    LParen,
    RParen,
    Comma,
    Equals,
    Star,
    Eof,
}

/// Lexes `input` into tokens, ending with `Token::Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        match ch {
            c if c.is_whitespace() => pos += 1,
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            '=' => {
                tokens.push(Token::Equals);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '\'' | '"' => {
                let quote = ch;
                let start = pos + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(Error::UnterminatedString);
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                pos = end + 1;
            }
            '0'..='9' => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let n = text.parse::<i64>().map_err(|_| Error::NumberOutOfRange)?;
                tokens.push(Token::Num(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_alphabetic() || chars[pos] == '_') {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                tokens.push(keyword_or_ident(word));
            }
            c => return Err(Error::UnexpectedChar(c)),
        }
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

fn keyword_or_ident(word: String) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "create" => Token::Create,
        "table" => Token::Table,
        "index" => Token::Index,
        "select" => Token::Select,
        "from" => Token::From,
        "where" => Token::Where,
        "primary" => Token::Primary,
        "key" => Token::Key,
        "on" => Token::On,
        _ => Token::Ident(word),
    }
}

#[test]
fn test_tokenize_select() {
    use Token::*;
    let tokens = tokenize("SELECT name, color FROM apples WHERE color = 'Red'").unwrap();
    assert_eq!(
        tokens,
        vec![
            Select,
            Ident("name".to_string()),
            Comma,
            Ident("color".to_string()),
            From,
            Ident("apples".to_string()),
            Where,
            Ident("color".to_string()),
            Equals,
            Str("Red".to_string()),
            Eof,
        ]
    );
}

#[test]
fn test_tokenize_keywords_case_insensitive() {
    use Token::*;
    let cases = vec![
        ("select", Select),
        ("SELECT", Select),
        ("SeLeCt", Select),
        ("cReAtE", Create),
        ("pRiMaRy", Primary),
        ("KEY", Key),
        ("on", On),
    ];
    for (i, case) in cases.iter().enumerate() {
        println!("Testing case {}: lex {:?}", i, case.0);
        assert_eq!(tokenize(case.0).unwrap(), vec![case.1.clone(), Eof]);
    }
}

#[test]
fn test_tokenize_identifiers_keep_their_case() {
    use Token::*;
    let tokens = tokenize("Apples _private idx_apples_color").unwrap();
    assert_eq!(
        tokens,
        vec![
            Ident("Apples".to_string()),
            Ident("_private".to_string()),
            Ident("idx_apples_color".to_string()),
            Eof,
        ]
    );
}

#[test]
fn test_tokenize_count_star() {
    use Token::*;
    let tokens = tokenize("select count(*) from t").unwrap();
    assert_eq!(
        tokens,
        vec![
            Select,
            Ident("count".to_string()),
            LParen,
            Star,
            RParen,
            From,
            Ident("t".to_string()),
            Eof,
        ]
    );
}

#[test]
fn test_tokenize_strings_and_numbers() {
    use Token::*;
    let tokens = tokenize("where a = 42").unwrap();
    assert_eq!(
        tokens,
        vec![Where, Ident("a".to_string()), Equals, Num(42), Eof]
    );
    // Both quote styles, spaces preserved inside.
    let tokens = tokenize("'Light Green' \"Blush Red\"").unwrap();
    assert_eq!(
        tokens,
        vec![
            Str("Light Green".to_string()),
            Str("Blush Red".to_string()),
            Eof,
        ]
    );
}

#[test]
fn test_tokenize_errors() {
    assert_eq!(tokenize("a = 'oops"), Err(Error::UnterminatedString));
    assert_eq!(tokenize("a ; b"), Err(Error::UnexpectedChar(';')));
    assert_eq!(
        tokenize("99999999999999999999"),
        Err(Error::NumberOutOfRange)
    );
}

// Re-lexing the lexemes of an accepted stream produces the same stream
// (keywords normalize to the same token regardless of case).
#[test]
fn test_lexer_idempotence() {
    let input = "SELECT name FROM apples WHERE color = 'Red'";
    let tokens = tokenize(input).unwrap();
    let lexemes: Vec<String> = tokens
        .iter()
        .map(|t| match t {
            Token::Ident(s) => s.clone(),
            Token::Str(s) => format!("'{}'", s),
            Token::Num(n) => n.to_string(),
            Token::Create => "create".to_string(),
            Token::Table => "table".to_string(),
            Token::Index => "index".to_string(),
            Token::Select => "select".to_string(),
            Token::From => "from".to_string(),
            Token::Where => "where".to_string(),
            Token::Primary => "primary".to_string(),
            Token::Key => "key".to_string(),
            Token::On => "on".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Equals => "=".to_string(),
            Token::Star => "*".to_string(),
            Token::Eof => "".to_string(),
        })
        .collect();
    assert_eq!(tokenize(&lexemes.join(" ")).unwrap(), tokens);
}
