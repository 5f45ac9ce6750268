//! Statement executor for josedb
//!
//! The executor parses statement text, dispatches the resulting command to
//! the database and table operations, and persists the database after every
//! successful mutation when a file path is configured.

use crate::error::{Error, Result};
use crate::sql::{parse_command, Command, Condition, SelectCommand, UpdateCommand};
use crate::storage::{Column, ColumnRef, Database, ResultRow, Table, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The outcome of one executed statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryResult {
    /// Result rows of a SELECT
    Rows(Vec<ResultRow>),
    /// Status message of a non-SELECT statement
    Message(String),
}

impl QueryResult {
    /// The rows of a SELECT result, if this is one
    pub fn rows(&self) -> Option<&[ResultRow]> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            QueryResult::Message(_) => None,
        }
    }

    /// The status message, if this is one
    pub fn message(&self) -> Option<&str> {
        match self {
            QueryResult::Rows(_) => None,
            QueryResult::Message(msg) => Some(msg),
        }
    }
}

/// Schema description of one table, for embedders
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    /// Ordered column list
    pub columns: Vec<Column>,
    /// Primary key column, if declared
    pub primary_key: Option<String>,
    /// UNIQUE-constrained columns
    pub unique_columns: Vec<String>,
}

/// Statement executor bound to one database
pub struct Executor {
    db: Database,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Executor {
    /// Open an executor without persistence
    pub fn in_memory() -> Self {
        Self {
            db: Database::new(),
            path: None,
            dirty: false,
        }
    }

    /// Open an executor bound to a database file
    ///
    /// Loads the file when it exists, otherwise starts empty; either way
    /// every future mutation is persisted back to the path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = if path.exists() {
            Database::load_from_file(path)?
        } else {
            Database::new()
        };
        Ok(Self {
            db,
            path: Some(path.to_path_buf()),
            dirty: false,
        })
    }

    /// The underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Execute one statement
    ///
    /// Returns a status message for non-SELECT statements and result rows
    /// for SELECT. After a successful mutation, the database is saved to
    /// the configured path; a save failure is surfaced to the caller and
    /// does not roll back the in-memory mutation.
    pub fn execute(&mut self, text: &str) -> Result<QueryResult> {
        let command = parse_command(text)?;
        debug!(?command, "executing");

        let result = match command {
            Command::CreateTable(ct) => {
                let columns = ct
                    .columns
                    .into_iter()
                    .map(|(name, data_type)| Column::new(name, data_type))
                    .collect();
                self.db
                    .create_table(&ct.table, columns, ct.primary_key, ct.unique_columns)?;
                self.mutated(format!("Table '{}' created.", ct.table))?
            }
            Command::DropTable { table } => {
                self.db.drop_table(&table)?;
                self.mutated(format!("Table '{}' dropped.", table))?
            }
            Command::Insert { table, values } => {
                self.db.get_table_mut(&table)?.insert_row(values)?;
                self.mutated("1 row inserted.".to_string())?
            }
            Command::Select(select) => QueryResult::Rows(self.execute_select(select)?),
            Command::Update(update) => {
                let count = self.execute_update(update)?;
                self.mutated(format!("{} rows updated.", count))?
            }
            Command::Delete { table, conditions } => {
                let conditions = Self::resolve_conditions(self.db.get_table(&table)?, &conditions)?;
                let count = self.db.get_table_mut(&table)?.delete(&conditions)?;
                self.mutated(format!("{} rows deleted.", count))?
            }
        };

        Ok(result)
    }

    /// All table names, sorted
    pub fn list_table_names(&self) -> Vec<String> {
        self.db.list_table_names()
    }

    /// Describe a table: columns, primary key, unique columns
    pub fn describe(&self, table: &str) -> Result<TableInfo> {
        let table = self.db.get_table(table)?;
        Ok(TableInfo {
            columns: table.columns().to_vec(),
            primary_key: table.primary_key().map(str::to_string),
            unique_columns: table.unique_columns().to_vec(),
        })
    }

    /// Flush any unsaved state to the configured path
    ///
    /// Idempotent; a no-op without a path or pending changes.
    pub fn close(&mut self) -> Result<()> {
        if self.dirty {
            if let Some(path) = &self.path {
                self.db.save_to_file(path)?;
            }
            self.dirty = false;
        }
        Ok(())
    }

    /// Record a completed mutation and auto-persist
    fn mutated(&mut self, message: String) -> Result<QueryResult> {
        self.dirty = true;
        if let Some(path) = &self.path {
            debug!(path = %path.display(), "auto-saving after mutation");
            self.db.save_to_file(path)?;
            self.dirty = false;
        }
        Ok(QueryResult::Message(message))
    }

    fn execute_select(&self, select: SelectCommand) -> Result<Vec<ResultRow>> {
        match select.join {
            None => {
                let table = self.db.get_table(&select.table)?;
                let columns = select
                    .columns
                    .map(|refs| {
                        refs.iter()
                            .map(|r| Self::resolve_single_table_ref(table, r))
                            .collect::<Result<Vec<_>>>()
                    })
                    .transpose()?;
                let conditions = Self::resolve_conditions(table, &select.conditions)?;
                table.select(columns.as_deref(), &conditions)
            }
            Some(join) => {
                let left = self.db.get_table(&select.table)?;
                let right = self.db.get_table(&join.table)?;
                let (left_col, right_col) =
                    Self::resolve_on_clause(left, right, &join.left, &join.right)?;

                let conditions: Vec<(ColumnRef, Value)> = select
                    .conditions
                    .into_iter()
                    .map(|c| (c.column, c.value))
                    .collect();

                left.inner_join(
                    right,
                    &left_col,
                    &right_col,
                    select.columns.as_deref(),
                    &conditions,
                )
            }
        }
    }

    fn execute_update(&mut self, update: UpdateCommand) -> Result<usize> {
        let table = self.db.get_table(&update.table)?;
        let set_values: Vec<(String, Value)> = update
            .assignments
            .iter()
            .map(|(column, value)| {
                Self::resolve_single_table_ref(table, column).map(|name| (name, value.clone()))
            })
            .collect::<Result<_>>()?;
        let conditions = Self::resolve_conditions(table, &update.conditions)?;

        self.db
            .get_table_mut(&update.table)?
            .update(&set_values, &conditions)
    }

    /// Resolve a possibly-qualified reference against a single table
    ///
    /// A qualifier must name that table; the column itself is validated by
    /// the table operation.
    fn resolve_single_table_ref(table: &Table, r: &ColumnRef) -> Result<String> {
        match &r.table {
            Some(qualifier) if qualifier != table.name() => Err(Error::UnknownColumn(
                r.to_string(),
                table.name().to_string(),
            )),
            _ => Ok(r.column.clone()),
        }
    }

    fn resolve_conditions(table: &Table, conditions: &[Condition]) -> Result<Vec<(String, Value)>> {
        conditions
            .iter()
            .map(|c| {
                Self::resolve_single_table_ref(table, &c.column)
                    .map(|name| (name, c.value.clone()))
            })
            .collect()
    }

    /// Resolve the two sides of an ON equality to (left column, right
    /// column), accepting either writing order
    fn resolve_on_clause(
        left: &Table,
        right: &Table,
        a: &ColumnRef,
        b: &ColumnRef,
    ) -> Result<(String, String)> {
        let side_of = |r: &ColumnRef| -> Result<(bool, String)> {
            match &r.table {
                Some(qualifier) if qualifier == left.name() => Ok((true, r.column.clone())),
                Some(qualifier) if qualifier == right.name() => Ok((false, r.column.clone())),
                Some(qualifier) => Err(Error::UnknownColumn(r.column.clone(), qualifier.clone())),
                None => match (
                    left.column_index(&r.column),
                    right.column_index(&r.column),
                ) {
                    (Some(_), Some(_)) => Err(Error::AmbiguousColumn(r.column.clone())),
                    (Some(_), None) => Ok((true, r.column.clone())),
                    (None, Some(_)) => Ok((false, r.column.clone())),
                    (None, None) => Err(Error::UnknownColumn(
                        r.column.clone(),
                        format!("{} JOIN {}", left.name(), right.name()),
                    )),
                },
            }
        };

        match (side_of(a)?, side_of(b)?) {
            ((true, l), (false, r)) => Ok((l, r)),
            ((false, r), (true, l)) => Ok((l, r)),
            _ => Err(Error::ParseError(
                "ON condition must relate the two joined tables".to_string(),
            )),
        }
    }
}
