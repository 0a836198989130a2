//! parser builds syntax trees from token streams by recursive descent.
//! A single token of lookahead suffices everywhere except the two-token
//! `PRIMARY KEY` check inside column definitions.

use crate::ast;
use crate::tokenizer::{self, Token};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Tokenizer: {0}")]
    Tokenize(#[from] tokenizer::Error),
    #[error("Unexpected token {0:?}, expected {1}.")]
    UnexpectedToken(Token, &'static str),
}

/// Parses one statement: a SELECT, a CREATE TABLE or a CREATE INDEX.
pub fn parse_statement(sql: &str) -> Result<ast::Statement, Error> {
    let mut p = Parser::new(tokenizer::tokenize(sql)?);
    match p.peek() {
        Token::Select => Ok(ast::Statement::Select(p.select_statement()?)),
        Token::Create => p.create_statement(),
        t => Err(Error::UnexpectedToken(t.clone(), "SELECT or CREATE")),
    }
}

/// Parses the stored creation SQL of a table.
pub fn parse_create_table(sql: &str) -> Result<ast::CreateTableStatement, Error> {
    match parse_statement(sql)? {
        ast::Statement::CreateTable(c) => Ok(c),
        ast::Statement::CreateIndex(_) | ast::Statement::Select(_) => {
            Err(Error::UnexpectedToken(Token::Create, "CREATE TABLE"))
        }
    }
}

/// Parses the stored creation SQL of an index.
pub fn parse_create_index(sql: &str) -> Result<ast::CreateIndexStatement, Error> {
    match parse_statement(sql)? {
        ast::Statement::CreateIndex(c) => Ok(c),
        ast::Statement::CreateTable(_) | ast::Statement::Select(_) => {
            Err(Error::UnexpectedToken(Token::Create, "CREATE INDEX"))
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_next(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, token: Token, what: &'static str) -> Result<(), Error> {
        let t = self.advance();
        if t == token {
            Ok(())
        } else {
            Err(Error::UnexpectedToken(t, what))
        }
    }

    fn ident(&mut self, what: &'static str) -> Result<String, Error> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            t => Err(Error::UnexpectedToken(t, what)),
        }
    }

    // select := SELECT col (',' col)* FROM IDENT (WHERE where)?
    fn select_statement(&mut self) -> Result<ast::SelectStatement, Error> {
        self.expect(Token::Select, "SELECT")?;
        let mut items = vec![self.select_item()?];
        while *self.peek() == Token::Comma {
            self.advance();
            items.push(self.select_item()?);
        }
        self.expect(Token::From, "FROM")?;
        let tablename = self.ident("a table name")?;
        let where_clause = match self.peek() {
            Token::Where => {
                self.advance();
                Some(self.where_clause()?)
            }
            _ => None,
        };
        self.expect(Token::Eof, "end of statement")?;
        Ok(ast::SelectStatement {
            items,
            tablename,
            where_clause,
        })
    }

    // col := IDENT | STRING | '*' | IDENT '(' '*' ')'
    // Only count(*) is recognized in the call form; it is not a general
    // function call.
    fn select_item(&mut self) -> Result<ast::SelItem, Error> {
        match self.advance() {
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    if !name.eq_ignore_ascii_case("count") {
                        return Err(Error::UnexpectedToken(Token::LParen, "count(*)"));
                    }
                    self.expect(Token::LParen, "'('")?;
                    self.expect(Token::Star, "'*'")?;
                    self.expect(Token::RParen, "')'")?;
                    Ok(ast::SelItem::CountStar)
                } else {
                    Ok(ast::SelItem::ColName(ast::ColName { name }))
                }
            }
            Token::Str(name) => Ok(ast::SelItem::ColName(ast::ColName { name })),
            Token::Star => Ok(ast::SelItem::Star),
            t => Err(Error::UnexpectedToken(t, "a column")),
        }
    }

    // where := IDENT '=' (NUMBER | STRING)
    fn where_clause(&mut self) -> Result<ast::WhereClause, Error> {
        let column = self.ident("a column name")?;
        self.expect(Token::Equals, "'='")?;
        let value = match self.advance() {
            Token::Num(n) => ast::Constant::Int(n),
            Token::Str(s) => ast::Constant::String(s),
            t => return Err(Error::UnexpectedToken(t, "a number or string literal")),
        };
        Ok(ast::WhereClause { column, value })
    }

    // create := CREATE (TABLE table_def | INDEX index_def)
    fn create_statement(&mut self) -> Result<ast::Statement, Error> {
        self.expect(Token::Create, "CREATE")?;
        match self.advance() {
            Token::Table => Ok(ast::Statement::CreateTable(self.table_def()?)),
            Token::Index => Ok(ast::Statement::CreateIndex(self.index_def()?)),
            t => Err(Error::UnexpectedToken(t, "TABLE or INDEX")),
        }
    }

    // table_def := IDENT '(' col_def (',' col_def)* ')'
    // Tokens past the closing paren (table options etc.) are ignored.
    fn table_def(&mut self) -> Result<ast::CreateTableStatement, Error> {
        let tablename = self.ident("a table name")?;
        self.expect(Token::LParen, "'('")?;
        let mut coldefs = vec![self.col_def()?];
        loop {
            match self.advance() {
                Token::Comma => coldefs.push(self.col_def()?),
                Token::RParen => break,
                t => return Err(Error::UnexpectedToken(t, "',' or ')'")),
            }
        }
        Ok(ast::CreateTableStatement { tablename, coldefs })
    }

    // col_def := IDENT <any tokens until ',' or ')'>
    // The trailing tokens are column constraints; only PRIMARY KEY is
    // recorded, plus the leading identifier as the column's type name.
    fn col_def(&mut self) -> Result<ast::ColDef, Error> {
        let colname = self.ident("a column name")?;
        let mut coltype = String::new();
        if let Token::Ident(t) = self.peek() {
            coltype = t.clone();
            self.advance();
        }
        let mut is_primary_key = false;
        loop {
            match self.peek() {
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::Primary if *self.peek_next() == Token::Key => {
                    self.advance();
                    self.advance();
                    is_primary_key = true;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(ast::ColDef {
            colname: ast::ColName { name: colname },
            coltype,
            is_primary_key,
        })
    }

    // index_def := IDENT ON IDENT '(' IDENT (',' IDENT)* ')'
    fn index_def(&mut self) -> Result<ast::CreateIndexStatement, Error> {
        let indexname = self.ident("an index name")?;
        self.expect(Token::On, "ON")?;
        let tablename = self.ident("a table name")?;
        self.expect(Token::LParen, "'('")?;
        let mut columns = vec![ast::ColName {
            name: self.ident("a column name")?,
        }];
        loop {
            match self.advance() {
                Token::Comma => columns.push(ast::ColName {
                    name: self.ident("a column name")?,
                }),
                Token::RParen => break,
                t => return Err(Error::UnexpectedToken(t, "',' or ')'")),
            }
        }
        Ok(ast::CreateIndexStatement {
            indexname,
            tablename,
            columns,
        })
    }
}

#[cfg(test)]
use crate::ast::{ColName, Constant, SelItem};

#[test]
fn test_parse_select_statements() {
    let cases = vec![
        "SELECT name FROM apples",
        "select name, color from apples",
        "select * from apples",
        "SELECT count(*) FROM apples",
        "SELECT COUNT(*) FROM apples",
        "select id, name from apples where color = 'Red'",
        "select name from apples where id = 3",
        "select \"name\" from apples",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(matches!(
            parse_statement(case),
            Ok(ast::Statement::Select(_))
        ));
    }
}

#[test]
fn test_parse_select_shape() {
    let stmt = parse_statement("select id, name from apples where color = 'Red'").unwrap();
    let ast::Statement::Select(s) = stmt else {
        panic!("expected a select statement")
    };
    assert_eq!(
        s.items,
        vec![
            SelItem::ColName(ColName {
                name: "id".to_string()
            }),
            SelItem::ColName(ColName {
                name: "name".to_string()
            }),
        ]
    );
    assert_eq!(s.tablename, "apples");
    let w = s.where_clause.expect("Should have a where clause.");
    assert_eq!(w.column, "color");
    assert_eq!(w.value, Constant::String("Red".to_string()));
}

#[test]
fn test_not_parse_invalid_select_statements() {
    let cases = vec![
        "SELECT FROM apples",
        "SELECT name apples",
        "SELECT name FROM",
        "select name from apples where",
        "select name from apples where color =",
        "select name from apples where color = color",
        "select count(*) extra FROM apples",
        "select sum(*) from apples",
        "select name from apples trailing",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(parse_statement(case).is_err());
    }
}

#[test]
fn test_parse_create_table() {
    let c =
        parse_create_table("CREATE TABLE apples (id integer primary key, name text, color text)")
            .unwrap();
    assert_eq!(c.tablename, "apples");
    assert_eq!(c.coldefs.len(), 3);
    assert_eq!(c.coldefs[0].colname.name, "id");
    assert_eq!(c.coldefs[0].coltype, "integer");
    assert!(c.coldefs[0].is_primary_key);
    assert_eq!(c.coldefs[1].colname.name, "name");
    assert_eq!(c.coldefs[1].coltype, "text");
    assert!(!c.coldefs[1].is_primary_key);
    assert_eq!(c.coldefs[2].colname.name, "color");
}

#[test]
fn test_parse_create_table_variations() {
    // Multi-line definition, as sqlite stores them.
    let c = parse_create_table("CREATE TABLE a\n( b int )").unwrap();
    assert_eq!(c.tablename, "a");
    assert_eq!(c.coldefs[0].colname.name, "b");
    assert_eq!(c.coldefs[0].coltype, "int");

    // A column with no declared type at all.
    let c = parse_create_table("create table t (x, y text)").unwrap();
    assert_eq!(c.coldefs[0].coltype, "");
    assert_eq!(c.coldefs[1].coltype, "text");

    // Unrecognized constraint words are skimmed, PRIMARY KEY still found.
    let c = parse_create_table("create table t (x integer not null primary key)").unwrap();
    assert!(c.coldefs[0].is_primary_key);

    // Tokens past the closing paren are ignored.
    let c = parse_create_table("create table t (x int) without rowid").unwrap();
    assert_eq!(c.coldefs.len(), 1);
}

#[test]
fn test_not_parse_invalid_create_statements() {
    let cases = vec![
        "CREATE apples (id integer)",
        "create table (id integer)",
        "create table t id integer",
        "create table t (",
        "create table t (,)",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(parse_statement(case).is_err());
    }
}

#[test]
fn test_parse_create_index() {
    let c = parse_create_index("CREATE INDEX idx_apples_color ON apples (color)").unwrap();
    assert_eq!(c.indexname, "idx_apples_color");
    assert_eq!(c.tablename, "apples");
    assert_eq!(
        c.columns,
        vec![ColName {
            name: "color".to_string()
        }]
    );

    let c = parse_create_index("create index i on t (a, b, c)").unwrap();
    assert_eq!(c.columns.len(), 3);
}

#[test]
fn test_not_parse_invalid_create_index() {
    let cases = vec![
        "CREATE INDEX idx ON apples",
        "CREATE INDEX idx apples (color)",
        "CREATE INDEX ON apples (color)",
        "CREATE INDEX idx ON apples ()",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(parse_statement(case).is_err());
    }
}
