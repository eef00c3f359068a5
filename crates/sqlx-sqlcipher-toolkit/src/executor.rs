//! The resource-scoped executor

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::SqliteConnection;
use sqlx_sqlcipher_conn::{ConnectionConfig, Database, ScopedConnection};
use tracing::debug;

use crate::cursor::{ActiveCursors, Cursor};
use crate::decode::Row;
use crate::sql;
use crate::statement::{Statement, WriteQueryResult};
use crate::{Error, Result};

/// Lifecycle of a single operation.
///
/// ```text
/// Idle → Connecting → Executing → { Committed | RolledBack | Failed } → Released
/// ```
///
/// `Released` is always reached. Only transactions pass through `Committed`
/// or `RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
   Idle,
   Connecting,
   Executing,
   Committed,
   RolledBack,
   Failed,
   Released,
}

impl fmt::Display for Phase {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let name = match self {
         Phase::Idle => "idle",
         Phase::Connecting => "connecting",
         Phase::Executing => "executing",
         Phase::Committed => "committed",
         Phase::RolledBack => "rolled_back",
         Phase::Failed => "failed",
         Phase::Released => "released",
      };
      f.write_str(name)
   }
}

/// Executes one statement, or one transaction of statements, per call.
///
/// Each call opens its own connection and releases it before returning, on
/// success and on every error path. The one exception is
/// [`execute_read`](Self::execute_read): the connection moves into the
/// returned [`Cursor`] and lives until the cursor is exhausted, closed,
/// dropped, or [`release_all`](Self::release_all) is called.
///
/// Cloning is cheap; clones share the database settings and the cursor
/// registry.
#[derive(Clone)]
pub struct ScopedExecutor {
   db: Arc<Database>,
   cursors: ActiveCursors,
}

impl ScopedExecutor {
   /// Create an executor for an already configured database.
   pub fn new(db: Database) -> Self {
      Self {
         db: Arc::new(db),
         cursors: ActiveCursors::default(),
      }
   }

   /// Parse a connection string and create an executor for it.
   ///
   /// No connection is opened until the first operation.
   pub fn from_connection_string(
      connection_string: &str,
      config: Option<ConnectionConfig>,
   ) -> Result<Self> {
      Ok(Self::new(Database::from_connection_string(
         connection_string,
         config,
      )?))
   }

   /// The database this executor opens connections to
   pub fn database(&self) -> &Database {
      &self.db
   }

   /// Run a query and return a cursor over its rows.
   ///
   /// The statement is prepared before the cursor is handed out, so malformed
   /// SQL is reported here rather than on the first row.
   pub async fn execute_read(&self, statement: impl Into<Statement>) -> Result<Cursor> {
      let statement = statement.into();
      let mut conn = self.connect().await?;

      debug!(phase = %Phase::Executing, query = %statement.query, "read");
      if let Err(e) = sqlx::Executor::prepare(&mut *conn, statement.query.as_str()).await {
         release(conn, Some(Phase::Failed)).await;
         return Err(e.into());
      }

      Ok(Cursor::spawn(conn, statement, &self.cursors))
   }

   /// Run a non-query statement and return how many rows it changed.
   pub async fn execute_write(&self, statement: impl Into<Statement>) -> Result<WriteQueryResult> {
      let statement = statement.into();
      let mut conn = self.connect().await?;

      debug!(phase = %Phase::Executing, query = %statement.query, "write");
      let result = statement.to_query().execute(&mut *conn).await;

      match result {
         Ok(done) => {
            release(conn, None).await;
            Ok(done.into())
         }
         Err(e) => {
            release(conn, Some(Phase::Failed)).await;
            Err(e.into())
         }
      }
   }

   /// Execute multiple write statements atomically within a transaction.
   ///
   /// This method:
   /// 1. Begins a transaction (BEGIN IMMEDIATE)
   /// 2. Executes all statements in order
   /// 3. Commits on success (COMMIT)
   /// 4. Rolls back on the first error (ROLLBACK); later statements never run
   ///
   /// The failing statement's index and engine error are kept in
   /// [`Error::StatementFailed`]. If the rollback fails as well, both causes
   /// are returned in [`Error::TransactionRollbackFailed`].
   pub async fn run_transaction(&self, statements: Vec<Statement>) -> Result<Vec<WriteQueryResult>> {
      let mut conn = self.connect().await?;

      debug!(phase = %Phase::Executing, statements = statements.len(), "transaction");
      if let Err(e) = sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await {
         release(conn, Some(Phase::Failed)).await;
         return Err(e.into());
      }

      // Execute all statements, collecting results and stopping at the first error
      let result = async {
         let mut results = Vec::with_capacity(statements.len());
         for (index, statement) in statements.iter().enumerate() {
            let done = statement
               .to_query()
               .execute(&mut *conn)
               .await
               .map_err(|source| Error::StatementFailed { index, source })?;
            results.push(WriteQueryResult::from(done));
         }
         Ok::<Vec<WriteQueryResult>, Error>(results)
      }
      .await;

      // Commit or rollback based on result
      let outcome = match result {
         Ok(results) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(results),
            // A failed COMMIT leaves the transaction open
            Err(e) => Err(rollback(&mut conn, e.into()).await),
         },
         Err(e) => Err(rollback(&mut conn, e).await),
      };

      let phase = if outcome.is_ok() {
         Phase::Committed
      } else {
         Phase::RolledBack
      };
      release(conn, Some(phase)).await;
      outcome
   }

   /// Run a query and collect every row.
   pub async fn fetch_all(&self, statement: impl Into<Statement>) -> Result<Vec<Row>> {
      self.execute_read(statement).await?.collect_rows().await
   }

   /// Run a query expecting zero or one row.
   pub async fn fetch_one(&self, statement: impl Into<Statement>) -> Result<Option<Row>> {
      let mut rows = self.fetch_all(statement).await?;

      // Validate row count
      match rows.len() {
         0 => Ok(None),
         1 => Ok(rows.pop()),
         count => Err(Error::MultipleRowsReturned(count)),
      }
   }

   /// Cursor over every row of `table`.
   pub async fn read_full_table(&self, table: &str) -> Result<Cursor> {
      self.execute_read(sql::select_all(table)?).await
   }

   /// Cursor over the rows of `table` whose `id` column equals `id`.
   pub async fn select_by_id(&self, table: &str, id: i64) -> Result<Cursor> {
      self.execute_read(sql::select_by_id(table, id)?).await
   }

   /// Cursor over `items` of the rows matching every `cols[i] ops[i] values[i]`.
   pub async fn select_where(
      &self,
      table: &str,
      items: &[&str],
      cols: &[&str],
      ops: &[&str],
      values: Vec<JsonValue>,
   ) -> Result<Cursor> {
      self.execute_read(sql::select_where(table, items, cols, ops, values)?).await
   }

   /// Insert one row supplying a value for every column, in table order.
   pub async fn insert(&self, table: &str, values: Vec<JsonValue>) -> Result<WriteQueryResult> {
      self.execute_write(sql::insert(table, values)?).await
   }

   /// Insert one row into the named columns.
   pub async fn insert_columns(
      &self,
      table: &str,
      cols: &[&str],
      values: Vec<JsonValue>,
   ) -> Result<WriteQueryResult> {
      self.execute_write(sql::insert_columns(table, cols, values)?).await
   }

   /// Set `cols` to `values` on the rows where `key` equals `key_value`.
   pub async fn update(
      &self,
      table: &str,
      cols: &[&str],
      values: Vec<JsonValue>,
      key: &str,
      key_value: JsonValue,
   ) -> Result<WriteQueryResult> {
      self.execute_write(sql::update(table, cols, values, key, key_value)?).await
   }

   /// Delete the rows matching any `cols[i] = values[i]` pair.
   pub async fn delete_where(
      &self,
      table: &str,
      cols: &[&str],
      values: Vec<JsonValue>,
   ) -> Result<WriteQueryResult> {
      self.execute_write(sql::delete_where(table, cols, values)?).await
   }

   /// Delete every row of `table`.
   pub async fn delete_all(&self, table: &str) -> Result<WriteQueryResult> {
      self.execute_write(sql::delete_all(table)?).await
   }

   /// Create `table` with the given column names and type declarations.
   pub async fn create_table(
      &self,
      table: &str,
      cols: &[&str],
      types: &[&str],
   ) -> Result<WriteQueryResult> {
      self.execute_write(sql::create_table(table, cols, types)?).await
   }

   /// Release every connection still held by an open cursor.
   ///
   /// Safe to call any number of times.
   pub fn release_all(&self) {
      self.cursors.release_all();
   }

   /// Number of cursors still holding a connection
   pub fn open_cursors(&self) -> usize {
      self.cursors.len()
   }

   async fn connect(&self) -> Result<ScopedConnection> {
      debug!(phase = %Phase::Idle);
      debug!(phase = %Phase::Connecting, path = %self.db.path().display());
      self.db.open().await.map_err(|e| {
         // Database::open closes anything it opened before failing
         debug!(phase = %Phase::Failed, error = %e);
         debug!(phase = %Phase::Released);
         Error::from(e)
      })
   }
}

impl fmt::Debug for ScopedExecutor {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("ScopedExecutor")
         .field("db", &self.db)
         .field("open_cursors", &self.cursors.len())
         .finish()
   }
}

/// Roll back after `cause`, returning the error to report.
async fn rollback(conn: &mut SqliteConnection, cause: Error) -> Error {
   match sqlx::query("ROLLBACK").execute(&mut *conn).await {
      // Rollback succeeded, return original error
      Ok(_) => cause,

      // Rollback also failed, return the rollback error and the original error
      Err(rollback_error) => Error::TransactionRollbackFailed {
         transaction_error: Box::new(cause),
         rollback_error,
      },
   }
}

/// Close the connection at the end of an operation.
///
/// `outcome` is the phase passed through before release, if any.
async fn release(conn: ScopedConnection, outcome: Option<Phase>) {
   if let Some(outcome) = outcome {
      debug!(phase = %outcome);
   }
   if let Err(e) = conn.close().await {
      debug!(error = %e, "connection did not close cleanly");
   }
   debug!(phase = %Phase::Released);
}
