//! Hash indexes for josedb
//!
//! An index is a multimap from a column value to the set of row ids holding
//! that value, optionally constrained to at most one row per value.

use crate::error::{Error, Result};
use crate::storage::Value;
use std::collections::{BTreeSet, HashMap};

/// A hash index over one column
///
/// NULL values never enter the index: inserting NULL is a no-op and looking
/// up NULL yields the empty set. Uniqueness therefore does not apply to
/// NULL.
#[derive(Debug, Clone)]
pub struct Index {
    /// Column this index covers (used in violation messages)
    column: String,
    /// At most one row id per value when set
    unique: bool,
    /// Value to row-id set mapping; BTreeSet keeps ids in ascending order
    entries: HashMap<Value, BTreeSet<usize>>,
}

impl Index {
    /// Create a new empty index
    pub fn new(column: impl Into<String>, unique: bool) -> Self {
        Self {
            column: column.into(),
            unique,
            entries: HashMap::new(),
        }
    }

    /// The column this index covers
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Whether this index enforces uniqueness
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Insert an entry for `value` at `row_id`
    ///
    /// NULL is skipped. Fails with `UniqueViolation` if the index is unique
    /// and the value is already present.
    pub fn insert(&mut self, value: &Value, row_id: usize) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        if self.unique && self.entries.contains_key(value) {
            return Err(Error::UniqueViolation(self.column.clone()));
        }

        self.entries.entry(value.clone()).or_default().insert(row_id);
        Ok(())
    }

    /// Whether a non-NULL value is present in the index
    pub fn contains(&self, value: &Value) -> bool {
        !value.is_null() && self.entries.contains_key(value)
    }

    /// The set of row ids mapped from `value` (empty for NULL or absent
    /// values), in ascending order
    pub fn lookup(&self, value: &Value) -> BTreeSet<usize> {
        if value.is_null() {
            return BTreeSet::new();
        }
        self.entries.get(value).cloned().unwrap_or_default()
    }

    /// Remove the entry for `value` at `row_id`, pruning the key when its
    /// set becomes empty
    pub fn remove(&mut self, value: &Value, row_id: usize) {
        if value.is_null() {
            return;
        }
        if let Some(rows) = self.entries.get_mut(value) {
            rows.remove(&row_id);
            if rows.is_empty() {
                self.entries.remove(value);
            }
        }
    }

    /// Discard all state and re-insert the given entries in order
    pub fn rebuild<'a, I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a Value, usize)>,
    {
        self.entries.clear();
        for (value, row_id) in entries {
            self.insert(value, row_id)?;
        }
        Ok(())
    }

    /// Number of distinct non-NULL values in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
