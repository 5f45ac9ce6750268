//! Storage engine module
//!
//! This module contains the in-memory storage components:
//! - Value and result-row types
//! - Hash indexes for constrained columns
//! - Tables (schema, rows, constraints, joins)
//! - The database catalog and its file persistence

pub mod database;
pub mod index;
pub mod table;
pub mod value;

pub use database::Database;
pub use index::Index;
pub use table::{Column, ColumnRef, Row, Table};
pub use value::{DataType, ResultRow, Value};
