//! # sqlx-sqlcipher-toolkit
//!
//! Resource-scoped statement execution on top of `sqlx-sqlcipher-conn`.
//!
//! ## Core Types
//!
//! - **[`ScopedExecutor`]**: Runs reads, writes and transactions, one connection per call
//! - **[`Cursor`]**: Forward-only row stream that owns the connection of its read
//! - **[`Statement`]**: SQL text plus values bound to `?N` placeholders
//! - **[`WriteQueryResult`]**: Rows affected and last insert id of a write
//! - **[`Row`]**: A decoded row, column name to JSON value
//! - **[`Error`]**: Error type for every operation
//!
//! The [`sql`] module builds the parameterized statements behind the table
//! helpers (`insert`, `update`, `select_where` and the rest).
//!
//! ## Usage
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlcipher_toolkit::{ScopedExecutor, Statement};
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlcipher_toolkit::Result<()> {
//!     let executor = ScopedExecutor::from_connection_string("Data Source=app.db;Password=s3cret", None)?;
//!
//!     executor
//!         .create_table("users", &["id", "name"], &["INTEGER PRIMARY KEY", "TEXT NOT NULL"])
//!         .await?;
//!     executor.insert("users", vec![json!(1), json!("Alice")]).await?;
//!
//!     // Atomic: both rows or neither
//!     executor
//!         .run_transaction(vec![
//!             Statement::new("INSERT INTO users (name) VALUES (?1)").bind("Bob"),
//!             Statement::new("INSERT INTO users (name) VALUES (?1)").bind("Carol"),
//!         ])
//!         .await?;
//!
//!     let mut cursor = executor.read_full_table("users").await?;
//!     while let Some(row) = cursor.next_row().await {
//!         println!("{:?}", row?);
//!     }
//!     Ok(())
//! }
//! ```

mod cursor;
mod decode;
mod error;
mod executor;
pub mod sql;
mod statement;

pub use cursor::{ActiveCursors, Cursor};
pub use decode::Row;
pub use error::{Error, Result};
pub use executor::{Phase, ScopedExecutor};
pub use statement::{Statement, WriteQueryResult};

// Re-export connection types so callers need a single dependency
pub use sqlx_sqlcipher_conn::{ConnectionConfig, ConnectionString, Database, OpenMode};
