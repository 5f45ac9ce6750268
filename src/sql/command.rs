//! Command records produced by the parser
//!
//! A `Command` is the structured form of one statement; the executor
//! dispatches on its variant.

use crate::storage::{ColumnRef, DataType, Value};

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// CREATE TABLE statement
    CreateTable(CreateTableCommand),
    /// DROP TABLE statement
    DropTable { table: String },
    /// INSERT statement
    Insert { table: String, values: Vec<Value> },
    /// SELECT statement
    Select(SelectCommand),
    /// UPDATE statement
    Update(UpdateCommand),
    /// DELETE statement
    Delete {
        table: String,
        conditions: Vec<Condition>,
    },
}

/// CREATE TABLE payload
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableCommand {
    /// Table name
    pub table: String,
    /// Column definitions in declaration order
    pub columns: Vec<(String, DataType)>,
    /// Primary key column, if declared
    pub primary_key: Option<String>,
    /// UNIQUE-constrained columns
    pub unique_columns: Vec<String>,
}

/// SELECT payload
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCommand {
    /// Table named in FROM
    pub table: String,
    /// Projection; `None` means `*`
    pub columns: Option<Vec<ColumnRef>>,
    /// JOIN clause, if present
    pub join: Option<JoinClause>,
    /// WHERE conjunction (empty means match all)
    pub conditions: Vec<Condition>,
}

/// UPDATE payload
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    /// Target table
    pub table: String,
    /// SET assignments in statement order
    pub assignments: Vec<(ColumnRef, Value)>,
    /// WHERE conjunction (empty means match all)
    pub conditions: Vec<Condition>,
}

/// JOIN clause of a SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Table to join
    pub table: String,
    /// Left side of the ON equality
    pub left: ColumnRef,
    /// Right side of the ON equality
    pub right: ColumnRef,
}

/// One equality predicate of a WHERE conjunction
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column being compared
    pub column: ColumnRef,
    /// Literal to compare against
    pub value: Value,
}
