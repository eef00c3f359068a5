//! Connection settings that are not carried by the connection string

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration applied to every connection a [`Database`](crate::Database) opens.
///
/// Values given in the connection string (`Default Timeout`, `Foreign Keys`)
/// take precedence over the ones here.
///
/// # Examples
///
/// ```
/// use sqlx_sqlcipher_conn::ConnectionConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = ConnectionConfig::default();
///
/// // Override just one field
/// let config = ConnectionConfig {
///     busy_timeout: Duration::from_secs(1),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionConfig {
   /// How long a statement waits on a locked database before failing with
   /// `SQLITE_BUSY`.
   ///
   /// Default: 5 seconds
   pub busy_timeout: Duration,

   /// Enforce foreign key constraints on each connection.
   ///
   /// Default: true
   pub foreign_keys: bool,

   /// Read the first page right after keying an encrypted database so a wrong
   /// key fails at open time rather than on the first real statement.
   ///
   /// Default: true
   pub verify_key: bool,

   /// Switch writable databases to WAL journaling so an open cursor does not
   /// block writers on other connections.
   ///
   /// Default: true
   pub wal: bool,
}

impl Default for ConnectionConfig {
   fn default() -> Self {
      Self {
         busy_timeout: Duration::from_secs(5),
         foreign_keys: true,
         verify_key: true,
         wal: true,
      }
   }
}
