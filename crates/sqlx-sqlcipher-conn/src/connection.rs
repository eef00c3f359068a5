//! RAII owner of a single SQLite connection

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use sqlx::{Connection, SqliteConnection};
use tracing::debug;

use crate::Result;

/// A connection owned by exactly one operation.
///
/// Derefs to [`SqliteConnection`] so it can be passed straight to sqlx
/// queries with `&mut *conn`. Call [`close`](Self::close) for a graceful
/// shutdown that reports errors; dropping it instead still closes the
/// underlying handle, just without a chance to observe failures.
#[must_use = "if unused, the connection is immediately closed"]
#[derive(Debug)]
pub struct ScopedConnection {
   conn: SqliteConnection,
   path: PathBuf,
}

impl ScopedConnection {
   pub(crate) fn new(conn: SqliteConnection, path: PathBuf) -> Self {
      Self { conn, path }
   }

   /// Path of the database this connection is attached to
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Close the connection, flushing any pending work.
   pub async fn close(self) -> Result<()> {
      self.conn.close().await?;
      debug!(path = %self.path.display(), "connection closed");
      Ok(())
   }
}

impl Deref for ScopedConnection {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      &self.conn
   }
}

impl DerefMut for ScopedConnection {
   fn deref_mut(&mut self) -> &mut Self::Target {
      &mut self.conn
   }
}
