//! Database: the table catalog and its persistence
//!
//! A database owns its tables and knows how to serialize itself to a JSON
//! document and restore from one. Indexes are never persisted; a load
//! replays every row through `Table::insert_row`, which rebuilds them and
//! re-verifies constraints.

use crate::error::{Error, Result};
use crate::storage::table::{Column, Table};
use crate::storage::value::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// A name-to-table mapping with file persistence
///
/// Table names are case-sensitive. The map is ordered so the persisted
/// document is byte-stable across saves.
#[derive(Debug, Default)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

/// Serializable proxy for the persistence document
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseRecord {
    tables: BTreeMap<String, TableRecord>,
}

/// Serializable proxy for one table
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableRecord {
    columns: Vec<(String, DataType)>,
    primary_key: Option<String>,
    unique_columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Database {
    /// Create a new empty database
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Create a table
    pub fn create_table(
        &mut self,
        name: &str,
        columns: Vec<Column>,
        primary_key: Option<String>,
        unique_columns: Vec<String>,
    ) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::TableExists(name.to_string()));
        }
        let table = Table::new(name, columns, primary_key, unique_columns)?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Get a mutable table by name
    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Drop a table
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::UnknownTable(name.to_string()));
        }
        Ok(())
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// All table names, sorted
    pub fn list_table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Serialize the database to a file
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place, so a concurrent reader sees either the prior snapshot or the
    /// new one, never a truncated prefix.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let record = DatabaseRecord {
            tables: self
                .tables
                .iter()
                .map(|(name, table)| {
                    let record = TableRecord {
                        columns: table
                            .columns()
                            .iter()
                            .map(|c| (c.name.clone(), c.data_type))
                            .collect(),
                        primary_key: table.primary_key().map(str::to_string),
                        unique_columns: table.unique_columns().to_vec(),
                        rows: table.rows().to_vec(),
                    };
                    (name.clone(), record)
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| Error::CorruptDatabase(e.to_string()))?;

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %path.display(), tables = self.tables.len(), "database saved");
        Ok(())
    }

    /// Restore a database from a file
    ///
    /// Rows are replayed through `Table::insert_row` so every index is
    /// rebuilt and every constraint re-verified. A document that cannot be
    /// decoded, or whose rows no longer satisfy their constraints, fails
    /// with `CorruptDatabase` and yields no database.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        // An empty file is an empty database
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let record: DatabaseRecord =
            serde_json::from_str(&text).map_err(|e| Error::CorruptDatabase(e.to_string()))?;

        let mut db = Self::new();
        for (name, table_record) in record.tables {
            let columns = table_record
                .columns
                .into_iter()
                .map(|(name, data_type)| Column::new(name, data_type))
                .collect();

            let mut table = Table::new(
                &name,
                columns,
                table_record.primary_key,
                table_record.unique_columns,
            )
            .map_err(|e| Error::CorruptDatabase(e.to_string()))?;

            for values in table_record.rows {
                table
                    .insert_row(values)
                    .map_err(|e| Error::CorruptDatabase(e.to_string()))?;
            }

            db.tables.insert(name, table);
        }

        debug!(path = %path.display(), tables = db.tables.len(), "database loaded");
        Ok(db)
    }
}
