//! # sqlx-sqlcipher-conn
//!
//! Opens SQLite connections through SQLx for a helper that never keeps a
//! connection between operations.
//!
//! ## Core Types
//!
//! - **[`ConnectionString`]**: Parsed `Data Source=...;Password=...` configuration value
//! - **[`ConnectionConfig`]**: Settings not carried by the connection string
//! - **[`Database`]**: Resolved connect options; opens one connection per call
//! - **[`ScopedConnection`]**: Sole owner of an open connection
//! - **[`Error`]**: Error type for configuration and open failures
//!
//! ## Encryption
//!
//! When the connection string carries a `Password`, it is applied with
//! `PRAGMA key` before any other statement on every new connection, and the
//! first page is read back to catch a wrong key early. Building with the
//! `sqlcipher` feature links the bundled SQLCipher so the file is encrypted at
//! rest; with stock SQLite the key pragma is accepted and ignored.
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_sqlcipher_conn::Database;
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlcipher_conn::Result<()> {
//!     let db = Database::from_connection_string("Data Source=app.db;Password=s3cret", None)?;
//!
//!     let mut conn = db.open().await?;
//!     sqlx::query("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)")
//!         .execute(&mut *conn)
//!         .await?;
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod connection_string;
mod database;
mod error;

// Re-export public types
pub use config::ConnectionConfig;
pub use connection::ScopedConnection;
pub use connection_string::{ConnectionString, OpenMode};
pub use database::Database;
pub use error::{Error, Result};
