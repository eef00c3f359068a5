//! # sqlcipher-helper
//!
//! Data access for an (optionally SQLCipher-encrypted) SQLite database.
//!
//! Every operation opens its own connection and releases it before
//! returning, whether it succeeds or fails. Reads hand back a forward-only
//! cursor that owns its connection until it is exhausted, closed, or
//! dropped. Groups of writes run atomically with
//! [`run_transaction`](SqlCipherHelper::run_transaction).
//!
//! Two entry points share the same semantics:
//!
//! - **[`SqlCipherHelper`]**: blocking calls for synchronous code
//! - **[`ScopedExecutor`]**: `async` calls for code already on a tokio runtime
//!
//! Encryption at rest needs the `sqlcipher` feature, which links the bundled
//! SQLCipher build. The key is taken from the `Password` entry of the
//! connection string.

#![warn(missing_docs)]

mod blocking_cursor;
mod helper;

pub use blocking_cursor::BlockingCursor;
pub use helper::SqlCipherHelper;

pub use sqlx_sqlcipher_toolkit::{
   ActiveCursors, ConnectionConfig, ConnectionString, Cursor, Database, Error, OpenMode, Phase,
   Result, Row, ScopedExecutor, Statement, WriteQueryResult, sql,
};
