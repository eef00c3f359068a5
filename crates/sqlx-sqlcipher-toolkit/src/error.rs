/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for executor operations.
///
/// Argument-shape problems (`LengthMismatch`, `EmptyColumns`, `Invalid*`) are
/// raised by the statement builders before any connection is opened. Most
/// other variants carry the underlying failure as their source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error while configuring or opening a connection.
   #[error(transparent)]
   Connection(#[from] sqlx_sqlcipher_conn::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Multiple rows returned from fetch_one query.
   #[error("fetch_one() query returned {0} rows, expected 0 or 1")]
   MultipleRowsReturned(usize),

   /// A statement inside a transaction failed; the transaction was rolled back.
   #[error("statement {index} of the transaction failed: {source}")]
   StatementFailed {
      index: usize,
      #[source]
      source: sqlx::Error,
   },

   /// Transaction failed and rollback also failed.
   #[error("transaction failed: {transaction_error}; rollback also failed: {rollback_error}")]
   TransactionRollbackFailed {
      #[source]
      transaction_error: Box<Error>,
      rollback_error: sqlx::Error,
   },

   /// Paired argument lists have different lengths.
   #[error("{left} has {left_len} entries but {right} has {right_len}")]
   LengthMismatch {
      left: &'static str,
      left_len: usize,
      right: &'static str,
      right_len: usize,
   },

   /// A list that needs at least one entry was empty.
   #[error("{0} must contain at least one entry")]
   EmptyColumns(&'static str),

   /// Table or column name contains invalid characters.
   ///
   /// Each dot-separated part must match `[A-Za-z_][A-Za-z0-9_]*`.
   #[error("invalid identifier '{name}': must match [A-Za-z_][A-Za-z0-9_]* (optionally dot-qualified)")]
   InvalidIdentifier { name: String },

   /// Column type declaration contains characters outside the allow-list.
   #[error("invalid column type '{declaration}'")]
   InvalidColumnType { declaration: String },

   /// Comparison operator is not in the supported set.
   #[error("unsupported comparison operator '{0}'")]
   InvalidOperator(String),

   /// The task producing cursor rows panicked.
   #[error("cursor task failed: {0}")]
   CursorTask(String),

   /// I/O error, e.g. while starting the runtime of a blocking caller.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => sqlx_code(e),
         Error::Connection(sqlx_sqlcipher_conn::Error::KeyVerificationFailed(_)) => {
            "KEY_VERIFICATION_FAILED".to_string()
         }
         Error::Connection(_) => "CONNECTION_ERROR".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::MultipleRowsReturned(_) => "MULTIPLE_ROWS_RETURNED".to_string(),
         Error::StatementFailed { source, .. } => sqlx_code(source),
         Error::TransactionRollbackFailed { .. } => "TRANSACTION_ROLLBACK_FAILED".to_string(),
         Error::LengthMismatch { .. } => "LENGTH_MISMATCH".to_string(),
         Error::EmptyColumns(_) => "EMPTY_COLUMNS".to_string(),
         Error::InvalidIdentifier { .. } => "INVALID_IDENTIFIER".to_string(),
         Error::InvalidColumnType { .. } => "INVALID_COLUMN_TYPE".to_string(),
         Error::InvalidOperator(_) => "INVALID_OPERATOR".to_string(),
         Error::CursorTask(_) => "CURSOR_TASK_FAILED".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }

   /// Whether this error was raised while validating arguments, before any
   /// database access.
   pub fn is_argument_error(&self) -> bool {
      matches!(
         self,
         Error::LengthMismatch { .. }
            | Error::EmptyColumns(_)
            | Error::InvalidIdentifier { .. }
            | Error::InvalidColumnType { .. }
            | Error::InvalidOperator(_)
      )
   }
}

fn sqlx_code(e: &sqlx::Error) -> String {
   if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
      return format!("SQLITE_{}", code);
   }
   "SQLX_ERROR".to_string()
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_unsupported_datatype() {
      let err = Error::UnsupportedDatatype("WEIRD".into());
      assert_eq!(err.error_code(), "UNSUPPORTED_DATATYPE");
   }

   #[test]
   fn test_error_code_multiple_rows_returned() {
      let err = Error::MultipleRowsReturned(5);
      assert_eq!(err.error_code(), "MULTIPLE_ROWS_RETURNED");
      assert!(err.to_string().contains("5 rows"));
   }

   #[test]
   fn test_statement_failed_keeps_source() {
      let err = Error::StatementFailed {
         index: 2,
         source: sqlx::Error::RowNotFound,
      };
      assert_eq!(err.error_code(), "SQLX_ERROR");
      assert!(err.to_string().contains("statement 2"));
      assert!(std::error::Error::source(&err).is_some());
   }

   #[test]
   fn test_error_code_transaction_rollback_failed() {
      let err = Error::TransactionRollbackFailed {
         transaction_error: Box::new(Error::InvalidOperator("constraint".into())),
         rollback_error: sqlx::Error::PoolClosed,
      };
      assert_eq!(err.error_code(), "TRANSACTION_ROLLBACK_FAILED");
      assert!(err.to_string().contains("constraint"));
      assert!(err.to_string().contains("rollback also failed"));
   }

   #[test]
   fn test_error_code_length_mismatch() {
      let err = Error::LengthMismatch {
         left: "columns",
         left_len: 2,
         right: "values",
         right_len: 3,
      };
      assert_eq!(err.error_code(), "LENGTH_MISMATCH");
      assert_eq!(err.to_string(), "columns has 2 entries but values has 3");
      assert!(err.is_argument_error());
   }

   #[test]
   fn test_error_code_empty_columns() {
      let err = Error::EmptyColumns("columns");
      assert_eq!(err.error_code(), "EMPTY_COLUMNS");
      assert!(err.to_string().contains("at least one"));
   }

   #[test]
   fn test_error_code_invalid_identifier() {
      let err = Error::InvalidIdentifier {
         name: "bad;name".into(),
      };
      assert_eq!(err.error_code(), "INVALID_IDENTIFIER");
      assert!(err.to_string().contains("bad;name"));
   }

   #[test]
   fn test_error_code_invalid_operator() {
      let err = Error::InvalidOperator("~=".into());
      assert_eq!(err.error_code(), "INVALID_OPERATOR");
      assert!(err.is_argument_error());
   }

   #[test]
   fn test_error_code_connection() {
      let err = Error::Connection(sqlx_sqlcipher_conn::Error::InvalidConnectionString(
         "empty".into(),
      ));
      assert_eq!(err.error_code(), "CONNECTION_ERROR");
      assert!(!err.is_argument_error());

      let err = Error::Connection(sqlx_sqlcipher_conn::Error::KeyVerificationFailed(
         sqlx::Error::RowNotFound,
      ));
      assert_eq!(err.error_code(), "KEY_VERIFICATION_FAILED");
   }

   #[test]
   fn test_error_code_io() {
      let err = Error::Io(std::io::Error::other("no threads"));
      assert_eq!(err.error_code(), "IO_ERROR");
   }

   #[test]
   fn test_error_code_sqlx_non_database() {
      // RowNotFound is not a database error, so no SQLite code
      let err = Error::Sqlx(sqlx::Error::RowNotFound);
      assert_eq!(err.error_code(), "SQLX_ERROR");
   }
}
