//! Parser for the query language
//!
//! This module parses a token stream into a [`Command`]. It is a pure
//! translation: no engine state is consulted and no I/O happens here.

use super::command::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::error::{Error, Result};
use crate::storage::{ColumnRef, DataType, Value};

/// Statement parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a statement string
    pub fn new(text: &str) -> Result<Self> {
        let mut lexer = Lexer::new(text);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single statement
    pub fn parse(&mut self) -> Result<Command> {
        let command = self.parse_statement()?;

        // Consume optional trailing semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", self.current()),
            });
        }

        Ok(command)
    }

    fn parse_statement(&mut self) -> Result<Command> {
        match self.current() {
            Token::Create => self.parse_create_table().map(Command::CreateTable),
            Token::Drop => self.parse_drop_table(),
            Token::Insert => self.parse_insert(),
            Token::Select => self.parse_select().map(Command::Select),
            Token::Update => self.parse_update().map(Command::Update),
            Token::Delete => self.parse_delete(),
            _ => Err(Error::UnexpectedToken {
                expected: "CREATE, DROP, INSERT, SELECT, UPDATE, or DELETE".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== CREATE TABLE ==========

    fn parse_create_table(&mut self) -> Result<CreateTableCommand> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let table = self.expect_identifier()?;

        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut primary_key = None;
        let mut unique_columns = Vec::new();

        loop {
            let name = self.expect_identifier()?;
            let data_type = self.parse_data_type()?;

            // Column constraints: [PRIMARY KEY] [UNIQUE]
            loop {
                if self.check(&Token::Primary) {
                    self.advance();
                    self.expect(&Token::Key)?;
                    if primary_key.is_some() {
                        return Err(Error::ParseError(
                            "multiple primary keys defined".to_string(),
                        ));
                    }
                    primary_key = Some(name.clone());
                } else if self.check(&Token::Unique) {
                    self.advance();
                    unique_columns.push(name.clone());
                } else {
                    break;
                }
            }

            columns.push((name, data_type));

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableCommand {
            table,
            columns,
            primary_key,
            unique_columns,
        })
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let dt = match self.current() {
            Token::Integer => DataType::Integer,
            Token::Real => DataType::Real,
            Token::Text => DataType::Text,
            Token::Boolean => DataType::Boolean,
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "INTEGER, REAL, TEXT, or BOOLEAN".to_string(),
                    found: format!("{}", self.current()),
                });
            }
        };
        self.advance();
        Ok(dt)
    }

    // ========== DROP TABLE ==========

    fn parse_drop_table(&mut self) -> Result<Command> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;
        let table = self.expect_identifier()?;
        Ok(Command::DropTable { table })
    }

    // ========== INSERT ==========

    fn parse_insert(&mut self) -> Result<Command> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table = self.expect_identifier()?;

        self.expect(&Token::Values)?;
        self.expect(&Token::LParen)?;

        let mut values = Vec::new();
        loop {
            values.push(self.expect_literal()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(Command::Insert { table, values })
    }

    // ========== SELECT ==========

    fn parse_select(&mut self) -> Result<SelectCommand> {
        self.expect(&Token::Select)?;

        // Projection: `*` or a column reference list
        let columns = if self.check(&Token::Asterisk) {
            self.advance();
            None
        } else {
            let mut refs = Vec::new();
            loop {
                refs.push(self.parse_column_ref()?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
            Some(refs)
        };

        self.expect(&Token::From)?;
        let table = self.expect_identifier()?;

        // Optional JOIN ... ON colref = colref
        let join = if self.check(&Token::Join) {
            self.advance();
            let join_table = self.expect_identifier()?;
            self.expect(&Token::On)?;
            let left = self.parse_column_ref()?;
            self.expect(&Token::Eq)?;
            let right = self.parse_column_ref()?;
            Some(JoinClause {
                table: join_table,
                left,
                right,
            })
        } else {
            None
        };

        let conditions = self.parse_where_clause()?;

        Ok(SelectCommand {
            table,
            columns,
            join,
            conditions,
        })
    }

    // ========== UPDATE ==========

    fn parse_update(&mut self) -> Result<UpdateCommand> {
        self.expect(&Token::Update)?;

        let table = self.expect_identifier()?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.parse_column_ref()?;
            self.expect(&Token::Eq)?;
            let value = self.expect_literal()?;
            assignments.push((column, value));

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let conditions = self.parse_where_clause()?;

        Ok(UpdateCommand {
            table,
            assignments,
            conditions,
        })
    }

    // ========== DELETE ==========

    fn parse_delete(&mut self) -> Result<Command> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table = self.expect_identifier()?;
        let conditions = self.parse_where_clause()?;

        Ok(Command::Delete { table, conditions })
    }

    // ========== Clauses ==========

    /// Parse an optional `WHERE colref = literal [AND ...]` clause.
    /// A missing clause yields an empty conjunction, which matches all rows.
    fn parse_where_clause(&mut self) -> Result<Vec<Condition>> {
        if !self.check(&Token::Where) {
            return Ok(Vec::new());
        }
        self.advance();

        let mut conditions = Vec::new();
        loop {
            let column = self.parse_column_ref()?;
            self.expect(&Token::Eq)?;
            let value = self.expect_literal()?;
            conditions.push(Condition { column, value });

            if !self.check(&Token::And) {
                break;
            }
            self.advance();
        }

        Ok(conditions)
    }

    /// Parse `column` or `table.column`
    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier()?;

        if self.check(&Token::Dot) {
            self.advance();
            let column = self.expect_identifier()?;
            Ok(ColumnRef::qualified(first, column))
        } else {
            Ok(ColumnRef::bare(first))
        }
    }

    // ========== Helper functions ==========

    fn expect_literal(&mut self) -> Result<Value> {
        let value = match self.current().clone() {
            Token::IntegerLiteral(n) => Value::Integer(n),
            Token::RealLiteral(n) => Value::Real(n),
            Token::StringLiteral(s) => Value::Text(s),
            Token::True => Value::Boolean(true),
            Token::False => Value::Boolean(false),
            Token::Null => Value::Null,
            Token::Eof => {
                return Err(Error::UnexpectedEof("literal".to_string()));
            }
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "literal".to_string(),
                    found: format!("{}", other),
                });
            }
        };
        self.advance();
        Ok(value)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(Error::UnexpectedEof(format!("{}", token)))
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            Token::Eof => Err(Error::UnexpectedEof("identifier".to_string())),
            other => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", other),
            }),
        }
    }
}

/// Parse one statement into a [`Command`]
pub fn parse_command(text: &str) -> Result<Command> {
    Parser::new(text)?.parse()
}
