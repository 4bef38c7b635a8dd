//! # sqlpeek
//!
//! sqlpeek is a small command-line tool for MySQL. It connects with the account given on the
//! command line, enumerates the tables of the target database, prints the rows of selected
//! tables as JSON on standard output and then lets the user pick a table from an interactive
//! terminal list.
//!
//! ## Features
//!
//! - **Row dumps**: `SELECT *` results are materialized into ordered column-name-to-value
//!   records; text and blob columns are decoded into strings, numbers keep their type
//! - **Layered configuration**: defaults, `~/.sqlpeek/config.toml`, `SQLPEEK_*` environment
//!   variables and command-line flags, in increasing precedence
//! - **Table picker**: a terminal list of the database's tables, navigated with the arrow keys
//!
//! ## Modules
//!
//! - `config`: Connection settings and their sources
//! - `db`: MySQL connection, table listing and row materialization
//! - `error`: The `QueryError` type shared by every database operation
//! - `record`: Dynamically-typed records and their JSON encoding
//! - `tui`: The table picker

pub mod config;
pub mod db;
pub mod error;
pub mod record;
pub mod tui;

pub use config::ConnectionConfig;
pub use db::DatabaseConnection;
pub use error::QueryError;
pub use record::{CellValue, Record};
