//! josedb - A small single-node relational database engine
//!
//! This library provides the core components of the engine:
//! - Query parsing (lexer, parser, command records)
//! - In-memory storage (values, hash indexes, tables, the database catalog)
//! - Statement execution with auto-persistence to a JSON file

pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
pub use executor::{Executor, QueryResult};
