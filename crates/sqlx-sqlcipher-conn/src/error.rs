//! Error types for sqlx-sqlcipher-conn

use thiserror::Error;

/// Errors that may occur while configuring or opening a connection
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The connection string could not be understood
   #[error("invalid connection string: {0}")]
   InvalidConnectionString(String),

   /// The database was opened but the first page could not be read with the
   /// configured key. With SQLCipher this almost always means a wrong key.
   #[error("encryption key verification failed (is the key correct?): {0}")]
   KeyVerificationFailed(#[source] sqlx::Error),
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
