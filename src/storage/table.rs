//! Table storage for josedb
//!
//! A table owns its schema, its row vector, and one hash index per
//! constrained column. All constraint enforcement and the
//! select/update/delete/join paths live here.

use crate::error::{Error, Result};
use crate::storage::index::Index;
use crate::storage::value::{DataType, ResultRow, Value};
use std::collections::{BTreeSet, HashMap};

/// A column definition: name plus advisory declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type (recorded and exposed, never enforced)
    pub data_type: DataType,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A column reference, optionally qualified by a table name
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table qualifier (the `users` in `users.id`)
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl ColumnRef {
    /// Create a bare (unqualified) reference
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Create a qualified reference
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// A stored row
pub type Row = Vec<Value>;

/// Which side of a join a resolved reference points at
#[derive(Debug, Clone, Copy, PartialEq)]
enum JoinSide {
    Left,
    Right,
}

/// An equality predicate resolved against this table's schema
struct Predicate<'a> {
    column: &'a str,
    pos: usize,
    value: &'a Value,
}

/// A named, schema-bearing, row-oriented collection
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (unique within its database)
    name: String,
    /// Ordered column list
    columns: Vec<Column>,
    /// Primary key column, if declared
    primary_key: Option<String>,
    /// UNIQUE-constrained columns (excluding the primary key unless also
    /// declared UNIQUE)
    unique_columns: Vec<String>,
    /// Row vector; a row id is a position in this vector
    rows: Vec<Row>,
    /// One index per constrained column
    indexes: HashMap<String, Index>,
    /// Column name to position, derived from `columns`
    col_map: HashMap<String, usize>,
}

impl Table {
    /// Create a new empty table
    ///
    /// Fails on duplicate column names and on a primary key or unique
    /// column that is not among the declared columns. Initializes one
    /// unique index per constrained column.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        primary_key: Option<String>,
        unique_columns: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();

        let mut col_map = HashMap::new();
        for (pos, column) in columns.iter().enumerate() {
            if col_map.insert(column.name.clone(), pos).is_some() {
                return Err(Error::DuplicateColumn(column.name.clone(), name));
            }
        }

        let mut indexes = HashMap::new();
        if let Some(pk) = &primary_key {
            if !col_map.contains_key(pk) {
                return Err(Error::UnknownColumn(pk.clone(), name));
            }
            indexes.insert(pk.clone(), Index::new(pk.clone(), true));
        }
        for column in &unique_columns {
            if !col_map.contains_key(column) {
                return Err(Error::UnknownColumn(column.clone(), name));
            }
            indexes
                .entry(column.clone())
                .or_insert_with(|| Index::new(column.clone(), true));
        }

        Ok(Self {
            name,
            columns,
            primary_key,
            unique_columns,
            rows: Vec::new(),
            indexes,
            col_map,
        })
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered column list
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Primary key column, if declared
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// UNIQUE-constrained columns
    pub fn unique_columns(&self) -> &[String] {
        &self.unique_columns
    }

    /// Number of stored rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Stored rows in row-id order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Look up a column position by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.col_map.get(name).copied()
    }

    /// The index for a constrained column, if one exists
    pub fn index(&self, column: &str) -> Option<&Index> {
        self.indexes.get(column)
    }

    /// Constrained column names in declaration order: primary key first,
    /// then unique columns
    fn constrained_columns(&self) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        if let Some(pk) = &self.primary_key {
            out.push((pk.clone(), self.col_map[pk]));
        }
        for column in &self.unique_columns {
            if Some(column.as_str()) != self.primary_key.as_deref() {
                out.push((column.clone(), self.col_map[column]));
            }
        }
        out
    }

    // ========== Insert ==========

    /// Insert a row, enforcing arity and uniqueness
    ///
    /// All constraint checks complete before any mutation, so a failed
    /// insert leaves the table unchanged.
    pub fn insert_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::SchemaMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        for (column, pos) in self.constrained_columns() {
            let value = &values[pos];
            if !value.is_null() && self.indexes[&column].contains(value) {
                return Err(Error::UniqueViolation(column));
            }
        }

        let row_id = self.rows.len();
        self.rows.push(values);
        for (column, pos) in self.constrained_columns() {
            let value = self.rows[row_id][pos].clone();
            if let Some(index) = self.indexes.get_mut(&column) {
                // Cannot fail: presence was checked above
                index.insert(&value, row_id)?;
            }
        }

        Ok(())
    }

    // ========== Select ==========

    /// Select rows matching a conjunction of equality predicates
    ///
    /// `columns` projects the result (in the given order); `None` returns
    /// all columns. An empty `conditions` slice matches every row. Results
    /// are materialized copies in row-id ascending order.
    pub fn select(
        &self,
        columns: Option<&[String]>,
        conditions: &[(String, Value)],
    ) -> Result<Vec<ResultRow>> {
        let target: Vec<(&str, usize)> = match columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    self.col_map
                        .get(name.as_str())
                        .map(|&pos| (name.as_str(), pos))
                        .ok_or_else(|| Error::UnknownColumn(name.clone(), self.name.clone()))
                })
                .collect::<Result<_>>()?,
            None => self
                .columns
                .iter()
                .enumerate()
                .map(|(pos, column)| (column.name.as_str(), pos))
                .collect(),
        };

        let predicates = self.resolve_predicates(conditions)?;
        let matching = self.matching_row_ids(&predicates);

        let mut results = Vec::with_capacity(matching.len());
        for row_id in matching {
            let row = &self.rows[row_id];
            let mut result = ResultRow::with_capacity(target.len());
            for &(name, pos) in &target {
                result.push(name, row[pos].clone());
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Resolve predicate column names to positions, failing on unknown
    /// columns
    fn resolve_predicates<'a>(
        &self,
        conditions: &'a [(String, Value)],
    ) -> Result<Vec<Predicate<'a>>> {
        conditions
            .iter()
            .map(|(column, value)| {
                self.col_map
                    .get(column.as_str())
                    .map(|&pos| Predicate {
                        column: column.as_str(),
                        pos,
                        value,
                    })
                    .ok_or_else(|| Error::UnknownColumn(column.clone(), self.name.clone()))
            })
            .collect()
    }

    /// Compute the row ids matching all predicates, in ascending order
    ///
    /// Predicates on constrained columns are answered from their indexes
    /// (smallest candidate set first); everything is re-checked against the
    /// candidate rows. A NULL comparison value never uses the index: NULLs
    /// are unindexed, and `c = null` is defined to match NULL rows.
    fn matching_row_ids(&self, predicates: &[Predicate<'_>]) -> BTreeSet<usize> {
        let mut index_sets: Vec<BTreeSet<usize>> = predicates
            .iter()
            .filter(|p| !p.value.is_null())
            .filter_map(|p| self.indexes.get(p.column).map(|index| index.lookup(p.value)))
            .collect();
        index_sets.sort_by_key(|set| set.len());

        let mut candidates: Option<BTreeSet<usize>> = None;
        for set in index_sets {
            candidates = Some(match candidates {
                None => set,
                Some(acc) => acc.intersection(&set).copied().collect(),
            });
            if candidates.as_ref().is_some_and(|c| c.is_empty()) {
                break;
            }
        }

        let mut matching =
            candidates.unwrap_or_else(|| (0..self.rows.len()).collect::<BTreeSet<_>>());
        matching.retain(|&row_id| {
            predicates
                .iter()
                .all(|p| self.rows[row_id][p.pos] == *p.value)
        });
        matching
    }

    // ========== Update ==========

    /// Update all rows matching the predicates, returning the updated count
    ///
    /// Uniqueness is simulated against the indexes before anything is
    /// written: a violation leaves the table unchanged.
    pub fn update(
        &mut self,
        set_values: &[(String, Value)],
        conditions: &[(String, Value)],
    ) -> Result<usize> {
        let assignments: Vec<(usize, &str, &Value)> = set_values
            .iter()
            .map(|(column, value)| {
                self.col_map
                    .get(column.as_str())
                    .map(|&pos| (pos, column.as_str(), value))
                    .ok_or_else(|| Error::UnknownColumn(column.clone(), self.name.clone()))
            })
            .collect::<Result<_>>()?;

        let predicates = self.resolve_predicates(conditions)?;
        let matching = self.matching_row_ids(&predicates);
        if matching.is_empty() {
            return Ok(0);
        }

        // Simulate constrained assignments: the new value may only be held
        // by rows inside the matching set, and a multi-row update cannot
        // assign the same non-NULL value to a unique column.
        for &(_, column, value) in &assignments {
            if let Some(index) = self.indexes.get(column) {
                if !value.is_null() {
                    if matching.len() > 1 {
                        return Err(Error::UniqueViolation(column.to_string()));
                    }
                    if index
                        .lookup(value)
                        .iter()
                        .any(|row_id| !matching.contains(row_id))
                    {
                        return Err(Error::UniqueViolation(column.to_string()));
                    }
                }
            }
        }

        for &row_id in &matching {
            for &(pos, column, value) in &assignments {
                let old = std::mem::replace(&mut self.rows[row_id][pos], value.clone());
                if let Some(index) = self.indexes.get_mut(column) {
                    index.remove(&old, row_id);
                    // Cannot fail: simulated above
                    index.insert(value, row_id)?;
                }
            }
        }

        Ok(matching.len())
    }

    // ========== Delete ==========

    /// Delete all rows matching the predicates, returning the removed count
    ///
    /// Rows are removed in descending row-id order so the pending match
    /// list stays valid; after each removal, surviving index entries above
    /// the removed id are shifted down by one.
    pub fn delete(&mut self, conditions: &[(String, Value)]) -> Result<usize> {
        let predicates = self.resolve_predicates(conditions)?;
        let matching = self.matching_row_ids(&predicates);
        let constrained = self.constrained_columns();

        for &row_id in matching.iter().rev() {
            for (column, pos) in &constrained {
                let value = self.rows[row_id][*pos].clone();
                if let Some(index) = self.indexes.get_mut(column) {
                    index.remove(&value, row_id);
                }
            }
            self.rows.remove(row_id);

            // Removing a row shifts every later row down by one; the index
            // entries must follow.
            for shifted in row_id..self.rows.len() {
                for (column, pos) in &constrained {
                    let value = self.rows[shifted][*pos].clone();
                    if let Some(index) = self.indexes.get_mut(column) {
                        index.remove(&value, shifted + 1);
                        index.insert(&value, shifted)?;
                    }
                }
            }
        }

        Ok(matching.len())
    }

    // ========== Join ==========

    /// Hash equi-join with another table on one column pair
    ///
    /// Builds from the right side (its index on `right_col` when present,
    /// a transient map otherwise), probes this table in row-id order, and
    /// emits rows keyed by qualified `table.column` names. `select_columns`
    /// and `conditions` accept qualified or bare references.
    pub fn inner_join(
        &self,
        other: &Table,
        left_col: &str,
        right_col: &str,
        select_columns: Option<&[ColumnRef]>,
        conditions: &[(ColumnRef, Value)],
    ) -> Result<Vec<ResultRow>> {
        let left_pos = self
            .column_index(left_col)
            .ok_or_else(|| Error::UnknownColumn(left_col.to_string(), self.name.clone()))?;
        let right_pos = other
            .column_index(right_col)
            .ok_or_else(|| Error::UnknownColumn(right_col.to_string(), other.name.clone()))?;

        // Resolve projection and predicates once, before the probe loop, so
        // name errors surface even when the join is empty.
        let projection: Vec<(JoinSide, usize, String)> = match select_columns {
            Some(refs) => refs
                .iter()
                .map(|r| self.resolve_join_column(other, r))
                .collect::<Result<_>>()?,
            None => self
                .columns
                .iter()
                .enumerate()
                .map(|(pos, c)| (JoinSide::Left, pos, format!("{}.{}", self.name, c.name)))
                .chain(other.columns.iter().enumerate().map(|(pos, c)| {
                    (JoinSide::Right, pos, format!("{}.{}", other.name, c.name))
                }))
                .collect(),
        };

        let predicates: Vec<(JoinSide, usize, &Value)> = conditions
            .iter()
            .map(|(r, value)| {
                self.resolve_join_column(other, r)
                    .map(|(side, pos, _)| (side, pos, value))
            })
            .collect::<Result<_>>()?;

        // Build phase: reuse the right table's index when one exists,
        // otherwise build a transient value-to-row-ids map. NULL join keys
        // are excluded.
        let right_index = other.indexes.get(right_col);
        let mut built: HashMap<&Value, Vec<usize>> = HashMap::new();
        if right_index.is_none() {
            for (row_id, row) in other.rows.iter().enumerate() {
                let value = &row[right_pos];
                if !value.is_null() {
                    built.entry(value).or_default().push(row_id);
                }
            }
        }

        // Probe phase: left table in row-id order, right matches in row-id
        // order.
        let mut results = Vec::new();
        for l_row in &self.rows {
            let l_value = &l_row[left_pos];
            if l_value.is_null() {
                continue;
            }

            let matches: Vec<usize> = match right_index {
                Some(index) => index.lookup(l_value).into_iter().collect(),
                None => built.get(l_value).cloned().unwrap_or_default(),
            };

            for r_id in matches {
                let r_row = &other.rows[r_id];

                let keep = predicates.iter().all(|&(side, pos, value)| match side {
                    JoinSide::Left => l_row[pos] == *value,
                    JoinSide::Right => r_row[pos] == *value,
                });
                if !keep {
                    continue;
                }

                let mut result = ResultRow::with_capacity(projection.len());
                for (side, pos, name) in &projection {
                    let value = match side {
                        JoinSide::Left => l_row[*pos].clone(),
                        JoinSide::Right => r_row[*pos].clone(),
                    };
                    result.push(name.clone(), value);
                }
                results.push(result);
            }
        }

        Ok(results)
    }

    /// Resolve a qualified or bare reference against the two joined tables
    ///
    /// Bare names owned by both sides are ambiguous; names owned by neither
    /// are unknown.
    fn resolve_join_column(
        &self,
        other: &Table,
        r: &ColumnRef,
    ) -> Result<(JoinSide, usize, String)> {
        match &r.table {
            Some(table) if table == &self.name => self
                .column_index(&r.column)
                .map(|pos| (JoinSide::Left, pos, format!("{}.{}", self.name, r.column)))
                .ok_or_else(|| Error::UnknownColumn(r.column.clone(), self.name.clone())),
            Some(table) if table == &other.name => other
                .column_index(&r.column)
                .map(|pos| (JoinSide::Right, pos, format!("{}.{}", other.name, r.column)))
                .ok_or_else(|| Error::UnknownColumn(r.column.clone(), other.name.clone())),
            Some(table) => Err(Error::UnknownColumn(r.column.clone(), table.clone())),
            None => match (self.column_index(&r.column), other.column_index(&r.column)) {
                (Some(_), Some(_)) => Err(Error::AmbiguousColumn(r.column.clone())),
                (Some(pos), None) => {
                    Ok((JoinSide::Left, pos, format!("{}.{}", self.name, r.column)))
                }
                (None, Some(pos)) => Ok((
                    JoinSide::Right,
                    pos,
                    format!("{}.{}", other.name, r.column),
                )),
                (None, None) => Err(Error::UnknownColumn(
                    r.column.clone(),
                    format!("{} JOIN {}", self.name, other.name),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::Text),
                Column::new("age", DataType::Integer),
            ],
            Some("id".to_string()),
            vec![],
        )
        .unwrap()
    }

    fn row(values: &[Value]) -> Vec<Value> {
        values.to_vec()
    }

    #[test]
    fn test_new_rejects_duplicate_column() {
        let result = Table::new(
            "t",
            vec![
                Column::new("a", DataType::Integer),
                Column::new("a", DataType::Text),
            ],
            None,
            vec![],
        );
        assert!(matches!(result, Err(Error::DuplicateColumn(c, _)) if c == "a"));
    }

    #[test]
    fn test_new_rejects_unknown_primary_key() {
        let result = Table::new(
            "t",
            vec![Column::new("a", DataType::Integer)],
            Some("missing".to_string()),
            vec![],
        );
        assert!(matches!(result, Err(Error::UnknownColumn(c, _)) if c == "missing"));
    }

    #[test]
    fn test_insert_arity_mismatch() {
        let mut table = users_table();
        let result = table.insert_row(row(&[Value::Integer(1)]));
        assert!(matches!(
            result,
            Err(Error::SchemaMismatch {
                expected: 3,
                found: 1
            })
        ));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_insert_primary_key_violation_leaves_table_unchanged() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();

        let result =
            table.insert_row(row(&[Value::Integer(1), "Bob".into(), Value::Integer(25)]));
        assert!(matches!(result, Err(Error::UniqueViolation(c)) if c == "id"));
        assert_eq!(table.row_count(), 1);

        let all = table.select(None, &[]).unwrap();
        assert_eq!(all[0].get("name"), Some(&Value::Text("Alice".to_string())));
    }

    #[test]
    fn test_nulls_do_not_participate_in_uniqueness() {
        let mut table = Table::new(
            "t",
            vec![Column::new("x", DataType::Integer)],
            None,
            vec!["x".to_string()],
        )
        .unwrap();

        table.insert_row(row(&[Value::Null])).unwrap();
        table.insert_row(row(&[Value::Null])).unwrap();
        table.insert_row(row(&[Value::Integer(1)])).unwrap();
        assert!(matches!(
            table.insert_row(row(&[Value::Integer(1)])),
            Err(Error::UniqueViolation(_))
        ));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_select_with_index_and_scan_predicates() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();
        table
            .insert_row(row(&[Value::Integer(2), "Bob".into(), Value::Integer(25)]))
            .unwrap();

        // Indexed predicate
        let results = table
            .select(None, &[("id".to_string(), Value::Integer(2))])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("name"), Some(&Value::Text("Bob".to_string())));

        // Unindexed predicate with projection
        let results = table
            .select(
                Some(&["name".to_string()]),
                &[("age".to_string(), Value::Integer(30))],
            )
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].columns().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(
            results[0].get("name"),
            Some(&Value::Text("Alice".to_string()))
        );
    }

    #[test]
    fn test_select_unknown_column() {
        let table = users_table();
        assert!(matches!(
            table.select(Some(&["nope".to_string()]), &[]),
            Err(Error::UnknownColumn(c, t)) if c == "nope" && t == "users"
        ));
        assert!(matches!(
            table.select(None, &[("nope".to_string(), Value::Null)]),
            Err(Error::UnknownColumn(..))
        ));
    }

    #[test]
    fn test_select_null_predicate_matches_null_rows() {
        let mut table = Table::new(
            "t",
            vec![Column::new("x", DataType::Integer)],
            None,
            vec!["x".to_string()],
        )
        .unwrap();
        table.insert_row(row(&[Value::Null])).unwrap();
        table.insert_row(row(&[Value::Integer(1)])).unwrap();
        table.insert_row(row(&[Value::Null])).unwrap();

        // Even on a constrained column, a NULL comparison takes the scan
        // path and matches the NULL rows.
        let results = table
            .select(None, &[("x".to_string(), Value::Null)])
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_update_moves_index_entries() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();

        let count = table
            .update(
                &[("id".to_string(), Value::Integer(7))],
                &[("id".to_string(), Value::Integer(1))],
            )
            .unwrap();
        assert_eq!(count, 1);

        assert!(table.index("id").unwrap().lookup(&Value::Integer(1)).is_empty());
        assert_eq!(
            table.index("id").unwrap().lookup(&Value::Integer(7)),
            BTreeSet::from([0])
        );
    }

    #[test]
    fn test_update_unique_violation_is_atomic() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();
        table
            .insert_row(row(&[Value::Integer(2), "Bob".into(), Value::Integer(25)]))
            .unwrap();

        let result = table.update(
            &[("id".to_string(), Value::Integer(1))],
            &[("id".to_string(), Value::Integer(2))],
        );
        assert!(matches!(result, Err(Error::UniqueViolation(c)) if c == "id"));

        // Nothing changed
        let results = table
            .select(None, &[("id".to_string(), Value::Integer(2))])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("name"), Some(&Value::Text("Bob".to_string())));
    }

    #[test]
    fn test_update_multi_row_same_unique_value_rejected() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();
        table
            .insert_row(row(&[Value::Integer(2), "Bob".into(), Value::Integer(30)]))
            .unwrap();

        // Two rows match; both cannot take id = 9
        let result = table.update(
            &[("id".to_string(), Value::Integer(9))],
            &[("age".to_string(), Value::Integer(30))],
        );
        assert!(matches!(result, Err(Error::UniqueViolation(_))));
    }

    #[test]
    fn test_update_without_conditions_matches_all() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();
        table
            .insert_row(row(&[Value::Integer(2), "Bob".into(), Value::Integer(25)]))
            .unwrap();

        let count = table
            .update(&[("age".to_string(), Value::Integer(0))], &[])
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_delete_shifts_surviving_index_entries() {
        let mut table = users_table();
        for (id, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
            table
                .insert_row(row(&[Value::Integer(id), name.into(), Value::Integer(20)]))
                .unwrap();
        }

        let count = table
            .delete(&[("id".to_string(), Value::Integer(2))])
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(table.row_count(), 2);

        // Carol shifted from row 2 to row 1; her index entry must follow
        assert_eq!(
            table.index("id").unwrap().lookup(&Value::Integer(3)),
            BTreeSet::from([1])
        );
        let results = table
            .select(None, &[("id".to_string(), Value::Integer(3))])
            .unwrap();
        assert_eq!(
            results[0].get("name"),
            Some(&Value::Text("Carol".to_string()))
        );

        // The deleted key can be reused
        table
            .insert_row(row(&[Value::Integer(2), "Dave".into(), Value::Integer(40)]))
            .unwrap();
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_delete_twice_returns_zero() {
        let mut table = users_table();
        table
            .insert_row(row(&[Value::Integer(1), "Alice".into(), Value::Integer(30)]))
            .unwrap();

        assert_eq!(
            table
                .delete(&[("id".to_string(), Value::Integer(1))])
                .unwrap(),
            1
        );
        assert_eq!(
            table
                .delete(&[("id".to_string(), Value::Integer(1))])
                .unwrap(),
            0
        );
    }

    fn join_fixture() -> (Table, Table) {
        let mut users = users_table();
        for (id, name, age) in [(1, "Alice", 30), (2, "Bob", 25)] {
            users
                .insert_row(row(&[Value::Integer(id), name.into(), Value::Integer(age)]))
                .unwrap();
        }

        let mut orders = Table::new(
            "orders",
            vec![
                Column::new("oid", DataType::Integer),
                Column::new("user_id", DataType::Integer),
                Column::new("amt", DataType::Integer),
            ],
            Some("oid".to_string()),
            vec![],
        )
        .unwrap();
        for (oid, user_id, amt) in [(101, 1, 500), (102, 2, 300), (103, 1, 200)] {
            orders
                .insert_row(row(&[
                    Value::Integer(oid),
                    Value::Integer(user_id),
                    Value::Integer(amt),
                ]))
                .unwrap();
        }

        (users, orders)
    }

    #[test]
    fn test_inner_join_qualified_keys_and_order() {
        let (users, orders) = join_fixture();

        let results = users
            .inner_join(&orders, "id", "user_id", None, &[])
            .unwrap();
        assert_eq!(results.len(), 3);

        // Left row order, then right row order
        assert_eq!(results[0].get("orders.oid"), Some(&Value::Integer(101)));
        assert_eq!(results[1].get("orders.oid"), Some(&Value::Integer(103)));
        assert_eq!(results[2].get("orders.oid"), Some(&Value::Integer(102)));
        assert_eq!(
            results[0].get("users.name"),
            Some(&Value::Text("Alice".to_string()))
        );
    }

    #[test]
    fn test_inner_join_projection_and_where() {
        let (users, orders) = join_fixture();

        let results = users
            .inner_join(
                &orders,
                "id",
                "user_id",
                Some(&[
                    ColumnRef::qualified("users", "name"),
                    ColumnRef::qualified("orders", "amt"),
                ]),
                &[(
                    ColumnRef::qualified("users", "name"),
                    Value::Text("Alice".to_string()),
                )],
            )
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].columns().collect::<Vec<_>>(),
            vec!["users.name", "orders.amt"]
        );
        assert_eq!(results[0].get("orders.amt"), Some(&Value::Integer(500)));
        assert_eq!(results[1].get("orders.amt"), Some(&Value::Integer(200)));
    }

    #[test]
    fn test_inner_join_bare_reference_resolution() {
        let (users, orders) = join_fixture();

        // "amt" is owned only by orders
        let results = users
            .inner_join(
                &orders,
                "id",
                "user_id",
                Some(&[ColumnRef::bare("amt")]),
                &[],
            )
            .unwrap();
        assert_eq!(results[0].columns().collect::<Vec<_>>(), vec!["orders.amt"]);
    }

    #[test]
    fn test_inner_join_name_resolution_errors() {
        let (users, orders) = join_fixture();

        // Both sides own "id"... users.id and orders has no "id"; use a
        // genuinely shared name by joining users with itself
        let result = users.inner_join(&orders, "id", "user_id", Some(&[ColumnRef::bare("nope")]), &[]);
        assert!(matches!(result, Err(Error::UnknownColumn(c, _)) if c == "nope"));

        let mut people = Table::new(
            "people",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::Text),
            ],
            Some("id".to_string()),
            vec![],
        )
        .unwrap();
        people
            .insert_row(row(&[Value::Integer(1), "Alice".into()]))
            .unwrap();
        // both sides own "name", so a bare reference is ambiguous
        let result = users.inner_join(&people, "id", "id", Some(&[ColumnRef::bare("name")]), &[]);
        assert!(matches!(result, Err(Error::AmbiguousColumn(c)) if c == "name"));
    }

    #[test]
    fn test_inner_join_skips_null_keys() {
        let mut left = Table::new(
            "l",
            vec![Column::new("k", DataType::Integer)],
            None,
            vec![],
        )
        .unwrap();
        let mut right = Table::new(
            "r",
            vec![Column::new("k", DataType::Integer)],
            None,
            vec![],
        )
        .unwrap();

        left.insert_row(row(&[Value::Null])).unwrap();
        left.insert_row(row(&[Value::Integer(1)])).unwrap();
        right.insert_row(row(&[Value::Integer(1)])).unwrap();
        right.insert_row(row(&[Value::Null])).unwrap();

        let results = left.inner_join(&right, "k", "k", None, &[]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("l.k"), Some(&Value::Integer(1)));
    }
}
