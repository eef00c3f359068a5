//! Database location plus the options used to open each connection

use std::path::{Path, PathBuf};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, trace};

use crate::config::ConnectionConfig;
use crate::connection::ScopedConnection;
use crate::connection_string::{ConnectionString, OpenMode};
use crate::{Error, Result};

/// Query that touches the first page. On an encrypted file with the wrong key
/// this is where SQLCipher reports `SQLITE_NOTADB`.
const KEY_PROBE: &str = "SELECT count(*) FROM sqlite_master";

/// A configured SQLite database that hands out one connection per operation.
///
/// `Database` keeps no connection of its own. Every call to [`open`](Self::open)
/// creates a fresh connection with the key applied before anything else, and
/// the returned [`ScopedConnection`] is the only owner of it.
///
/// ## Open sequence
///
/// ```text
/// 1. connect     PRAGMA key runs first, then busy_timeout and foreign_keys
/// 2. verify      SELECT count(*) FROM sqlite_master (encrypted files only)
/// 3. journal     PRAGMA journal_mode = WAL (writable files, when enabled)
/// ```
#[derive(Clone)]
pub struct Database {
   /// Connect options shared by every connection (key pragma is first)
   options: SqliteConnectOptions,

   /// Path to database file (used for cleanup)
   path: PathBuf,

   /// Whether a key is applied on connect
   encrypted: bool,

   /// Run the key probe after connecting
   verify_key: bool,

   /// Switch to WAL after connecting
   wal: bool,
}

impl Database {
   /// Build a database from a parsed connection string.
   ///
   /// Nothing is opened here; the first I/O happens on [`open`](Self::open).
   pub fn new(connection_string: ConnectionString, config: Option<ConnectionConfig>) -> Self {
      let config = config.unwrap_or_default();
      let mode = connection_string.mode();

      let mut options = SqliteConnectOptions::new();

      // sqlx emits pragmas in insertion order and reserves the first slot for
      // `key`, so the key is applied before any page is read.
      if let Some(key) = connection_string.key() {
         options = options.pragma("key", quote_key(key));
      }

      options = options
         .filename(connection_string.data_source())
         .busy_timeout(connection_string.busy_timeout().unwrap_or(config.busy_timeout))
         .foreign_keys(connection_string.foreign_keys().unwrap_or(config.foreign_keys));

      options = match mode {
         OpenMode::ReadWriteCreate => options.create_if_missing(true),
         OpenMode::ReadWrite => options.create_if_missing(false),
         OpenMode::ReadOnly => options.read_only(true),
      };

      Self {
         options,
         path: connection_string.data_source().to_path_buf(),
         encrypted: connection_string.is_encrypted(),
         verify_key: config.verify_key,
         wal: config.wal && mode != OpenMode::ReadOnly,
      }
   }

   /// Parse `connection_string` and build a database from it.
   pub fn from_connection_string(
      connection_string: &str,
      config: Option<ConnectionConfig>,
   ) -> Result<Self> {
      let parsed = ConnectionString::parse(connection_string)?;
      Ok(Self::new(parsed, config))
   }

   /// Path of the database file
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Whether connections are keyed
   pub fn is_encrypted(&self) -> bool {
      self.encrypted
   }

   /// Open a new connection owned by the caller.
   ///
   /// On any failure after the connection was established it is closed
   /// before the error is returned.
   pub async fn open(&self) -> Result<ScopedConnection> {
      trace!(path = %self.path.display(), "opening connection");
      let mut conn = self.options.connect().await?;

      if self.encrypted
         && self.verify_key
         && let Err(e) = sqlx::query(KEY_PROBE).execute(&mut conn).await
      {
         close_quietly(conn).await;
         return Err(Error::KeyVerificationFailed(e));
      }

      if self.wal
         && let Err(e) = sqlx::query("PRAGMA journal_mode = WAL").execute(&mut conn).await
      {
         close_quietly(conn).await;
         return Err(e.into());
      }

      Ok(ScopedConnection::new(conn, self.path.clone()))
   }

   /// Delete the database file and its WAL/shared-memory siblings.
   ///
   /// Missing files are not an error. Any connection still open on the file
   /// keeps working on its own handle until it is closed.
   pub async fn remove(&self) -> Result<()> {
      let mut targets = vec![self.path.clone()];
      for suffix in ["-wal", "-shm", "-journal"] {
         let mut sibling = self.path.clone().into_os_string();
         sibling.push(suffix);
         targets.push(PathBuf::from(sibling));
      }

      for target in targets {
         match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!(path = %target.display(), "removed database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
         }
      }

      Ok(())
   }
}

// SqliteConnectOptions prints its pragmas, key included
impl std::fmt::Debug for Database {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Database")
         .field("path", &self.path)
         .field("encrypted", &self.encrypted)
         .field("verify_key", &self.verify_key)
         .field("wal", &self.wal)
         .finish_non_exhaustive()
   }
}

/// Format the key as a SQL string literal for `PRAGMA key = ...`.
fn quote_key(key: &str) -> String {
   format!("'{}'", key.replace('\'', "''"))
}

async fn close_quietly(conn: sqlx::SqliteConnection) {
   if let Err(e) = conn.close().await {
      debug!(error = %e, "failed to close connection after open error");
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_quote_key() {
      assert_eq!(quote_key("secret"), "'secret'");
      assert_eq!(quote_key("it's"), "'it''s'");
   }

   #[test]
   fn test_read_only_disables_wal() {
      let cs = ConnectionString::from_path("a.db").with_mode(OpenMode::ReadOnly);
      let db = Database::new(cs, None);
      assert!(!db.wal);

      let db = Database::new(ConnectionString::from_path("a.db"), None);
      assert!(db.wal);
   }

   #[test]
   fn test_encrypted_flag_follows_key() {
      let db = Database::from_connection_string("Data Source=a.db;Password=k", None).unwrap();
      assert!(db.is_encrypted());
      assert_eq!(db.path(), Path::new("a.db"));

      let db = Database::from_connection_string("a.db", None).unwrap();
      assert!(!db.is_encrypted());
   }
}
