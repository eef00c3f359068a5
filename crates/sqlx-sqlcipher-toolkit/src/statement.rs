//! Statements with bound values, and write results

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteQueryResult};
use sqlx::{Sqlite, query::Query};

/// A SQL statement plus the values bound to its placeholders, in order.
///
/// The query text is never interpolated with values; they are always sent as
/// bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
   pub query: String,
   #[serde(default)]
   pub values: Vec<JsonValue>,
}

impl Statement {
   /// A statement with no bound values
   pub fn new(query: impl Into<String>) -> Self {
      Self {
         query: query.into(),
         values: Vec::new(),
      }
   }

   /// Replace the bound values
   pub fn with_values(mut self, values: Vec<JsonValue>) -> Self {
      self.values = values;
      self
   }

   /// Append one bound value
   pub fn bind(mut self, value: impl Into<JsonValue>) -> Self {
      self.values.push(value.into());
      self
   }

   /// Build the sqlx query with every value bound.
   pub(crate) fn to_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
      let mut q = sqlx::query(&self.query);
      for value in &self.values {
         q = bind_value(q, value.clone());
      }
      q
   }
}

impl From<&str> for Statement {
   fn from(query: &str) -> Self {
      Statement::new(query)
   }
}

impl From<String> for Statement {
   fn from(query: String) -> Self {
      Statement::new(query)
   }
}

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only set for INSERT operations on tables with a ROWID.
   /// Tables created with `WITHOUT ROWID` will not set this value (returns 0).
   pub last_insert_id: i64,
}

impl From<SqliteQueryResult> for WriteQueryResult {
   fn from(result: SqliteQueryResult) -> Self {
      Self {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      }
   }
}

/// Helper function to bind a JSON value to a SQLx query
pub(crate) fn bind_value<'a>(
   query: Query<'a, Sqlite, SqliteArguments<'a>>,
   value: JsonValue,
) -> Query<'a, Sqlite, SqliteArguments<'a>> {
   match value {
      JsonValue::Null => query.bind(None::<String>),
      JsonValue::Bool(b) => query.bind(b),
      JsonValue::String(s) => query.bind(s),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Too large for SQLite's INTEGER, fall back to REAL
            query.bind(uint_val as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      // Arrays and objects are stored as JSON text
      other => query.bind(other),
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_builder_methods() {
      let stmt = Statement::new("INSERT INTO t VALUES (?1, ?2)")
         .bind(1)
         .bind("a");
      assert_eq!(stmt.values, vec![json!(1), json!("a")]);

      let stmt = stmt.with_values(vec![json!(null)]);
      assert_eq!(stmt.values, vec![JsonValue::Null]);
   }

   #[test]
   fn test_from_str() {
      let stmt: Statement = "SELECT 1".into();
      assert_eq!(stmt.query, "SELECT 1");
      assert!(stmt.values.is_empty());
   }

   #[test]
   fn test_deserialize_without_values() {
      let stmt: Statement = serde_json::from_value(json!({ "query": "DELETE FROM t" })).unwrap();
      assert_eq!(stmt, Statement::new("DELETE FROM t"));
   }

   #[test]
   fn test_write_result_serializes_camel_case() {
      let result = WriteQueryResult {
         rows_affected: 2,
         last_insert_id: 7,
      };
      assert_eq!(
         serde_json::to_value(result).unwrap(),
         json!({ "rowsAffected": 2, "lastInsertId": 7 })
      );
   }
}
