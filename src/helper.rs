use serde_json::Value as JsonValue;
use sqlx_sqlcipher_toolkit::{
   ConnectionConfig, Database, Result, Row, ScopedExecutor, Statement, WriteQueryResult,
};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::BlockingCursor;

/// Blocking access to an (optionally encrypted) SQLite database.
///
/// Wraps a [`ScopedExecutor`] and a private current-thread runtime. Every
/// method blocks the calling thread until the operation finishes and has the
/// same semantics as its async counterpart on the executor: one connection
/// per call, released on every exit path.
///
/// Must not be used from inside an async runtime; use
/// [`executor`](Self::executor) there instead.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use sqlcipher_helper::SqlCipherHelper;
///
/// # fn main() -> sqlcipher_helper::Result<()> {
/// let helper = SqlCipherHelper::new("Data Source=app.db;Password=s3cret")?;
///
/// helper.create_table("notes", &["id", "body"], &["INTEGER PRIMARY KEY", "TEXT"])?;
/// helper.insert("notes", vec![json!(1), json!("hello")])?;
///
/// for row in helper.read_full_table("notes")? {
///     println!("{:?}", row?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqlCipherHelper {
   executor: ScopedExecutor,
   runtime: Runtime,
}

impl SqlCipherHelper {
   /// Configure a helper from a connection string with default settings.
   ///
   /// No connection is opened until the first operation.
   pub fn new(connection_string: &str) -> Result<Self> {
      Self::build(ScopedExecutor::from_connection_string(connection_string, None)?)
   }

   /// Configure a helper from a connection string and explicit settings.
   pub fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
      Self::build(ScopedExecutor::from_connection_string(
         connection_string,
         Some(config),
      )?)
   }

   fn build(executor: ScopedExecutor) -> Result<Self> {
      let runtime = Builder::new_current_thread().enable_all().build()?;
      Ok(Self { executor, runtime })
   }

   /// The async executor behind this helper. Clones share its cursor registry.
   pub fn executor(&self) -> &ScopedExecutor {
      &self.executor
   }

   /// The database every operation opens a connection to
   pub fn database(&self) -> &Database {
      self.executor.database()
   }

   /// Run a query and return a cursor over its rows.
   pub fn execute_read(&self, statement: impl Into<Statement>) -> Result<BlockingCursor<'_>> {
      let cursor = self.runtime.block_on(self.executor.execute_read(statement))?;
      Ok(BlockingCursor::new(cursor, &self.runtime))
   }

   /// Run a non-query statement.
   pub fn execute_write(&self, statement: impl Into<Statement>) -> Result<WriteQueryResult> {
      self.runtime.block_on(self.executor.execute_write(statement))
   }

   /// Run `statements` in order inside one transaction.
   ///
   /// See [`ScopedExecutor::run_transaction`].
   pub fn run_transaction(&self, statements: Vec<Statement>) -> Result<Vec<WriteQueryResult>> {
      self.runtime.block_on(self.executor.run_transaction(statements))
   }

   /// Run a query and collect every row.
   pub fn fetch_all(&self, statement: impl Into<Statement>) -> Result<Vec<Row>> {
      self.runtime.block_on(self.executor.fetch_all(statement))
   }

   /// Run a query expecting zero or one row.
   ///
   /// See [`ScopedExecutor::fetch_one`].
   pub fn fetch_one(&self, statement: impl Into<Statement>) -> Result<Option<Row>> {
      self.runtime.block_on(self.executor.fetch_one(statement))
   }

   /// Cursor over every row of `table`.
   pub fn read_full_table(&self, table: &str) -> Result<BlockingCursor<'_>> {
      let cursor = self.runtime.block_on(self.executor.read_full_table(table))?;
      Ok(BlockingCursor::new(cursor, &self.runtime))
   }

   /// Cursor over the rows of `table` whose `id` column equals `id`.
   pub fn select_by_id(&self, table: &str, id: i64) -> Result<BlockingCursor<'_>> {
      let cursor = self.runtime.block_on(self.executor.select_by_id(table, id))?;
      Ok(BlockingCursor::new(cursor, &self.runtime))
   }

   /// Cursor over `items` of the rows matching every `cols[i] ops[i] values[i]`.
   ///
   /// See [`ScopedExecutor::select_where`].
   pub fn select_where(
      &self,
      table: &str,
      items: &[&str],
      cols: &[&str],
      ops: &[&str],
      values: Vec<JsonValue>,
   ) -> Result<BlockingCursor<'_>> {
      let cursor = self
         .runtime
         .block_on(self.executor.select_where(table, items, cols, ops, values))?;
      Ok(BlockingCursor::new(cursor, &self.runtime))
   }

   /// Insert one row supplying a value for every column, in table order.
   pub fn insert(&self, table: &str, values: Vec<JsonValue>) -> Result<WriteQueryResult> {
      self.runtime.block_on(self.executor.insert(table, values))
   }

   /// Insert one row into the named columns.
   pub fn insert_columns(
      &self,
      table: &str,
      cols: &[&str],
      values: Vec<JsonValue>,
   ) -> Result<WriteQueryResult> {
      self.runtime.block_on(self.executor.insert_columns(table, cols, values))
   }

   /// Set `cols` to `values` on the rows where `key` equals `key_value`.
   pub fn update(
      &self,
      table: &str,
      cols: &[&str],
      values: Vec<JsonValue>,
      key: &str,
      key_value: JsonValue,
   ) -> Result<WriteQueryResult> {
      self
         .runtime
         .block_on(self.executor.update(table, cols, values, key, key_value))
   }

   /// Delete the rows matching any `cols[i] = values[i]` pair.
   pub fn delete_where(
      &self,
      table: &str,
      cols: &[&str],
      values: Vec<JsonValue>,
   ) -> Result<WriteQueryResult> {
      self.runtime.block_on(self.executor.delete_where(table, cols, values))
   }

   /// Delete every row of `table`.
   pub fn delete_all(&self, table: &str) -> Result<WriteQueryResult> {
      self.runtime.block_on(self.executor.delete_all(table))
   }

   /// Create `table` with the given column names and type declarations.
   pub fn create_table(&self, table: &str, cols: &[&str], types: &[&str]) -> Result<WriteQueryResult> {
      self.runtime.block_on(self.executor.create_table(table, cols, types))
   }

   /// Number of cursors still holding a connection
   pub fn open_cursors(&self) -> usize {
      self.executor.open_cursors()
   }

   /// Release every connection still held by an open cursor.
   ///
   /// Idempotent. Also runs when the helper is dropped.
   pub fn dispose(&self) {
      self.executor.release_all();
      // Let aborted producers drop their connections now rather than at shutdown
      self.runtime.block_on(tokio::task::yield_now());
   }
}

impl Drop for SqlCipherHelper {
   fn drop(&mut self) {
      debug!(open_cursors = self.executor.open_cursors(), "disposing helper");
      self.executor.release_all();
   }
}
