//! Forward-only cursors that own their connection.
//!
//! A cursor is produced by [`ScopedExecutor::execute_read`](crate::ScopedExecutor::execute_read).
//! The connection the query ran on is moved into a background task that
//! decodes rows and pushes them through a bounded channel; the [`Cursor`]
//! holds the receiving end. The task closes the connection when any of these
//! happens:
//!
//! - every row has been produced
//! - a row fails to decode or the engine reports an error mid-scan
//! - the cursor is closed or dropped
//! - [`ActiveCursors::release_all`] aborts it
//!
//! so no exit path leaves the connection open.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt;
use parking_lot::Mutex;
use sqlx_sqlcipher_conn::ScopedConnection;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::decode::{Row, decode_row};
use crate::statement::Statement;
use crate::{Error, Result};

/// Rows buffered ahead of the consumer
const CURSOR_BUFFER: usize = 32;

/// A forward-only handle over the rows of one query.
///
/// Rows are read with [`next_row`](Self::next_row) or through the
/// [`Stream`] implementation. After the last row (or the first error) the
/// cursor yields `None`.
#[must_use = "if unused, the cursor is dropped and its connection released"]
pub struct Cursor {
   id: Uuid,
   rows: ReceiverStream<Result<Row>>,
   task: Option<JoinHandle<()>>,
}

impl Cursor {
   /// Move `conn` into a producer task that streams the rows of `statement`.
   pub(crate) fn spawn(conn: ScopedConnection, statement: Statement, registry: &ActiveCursors) -> Self {
      let id = Uuid::new_v4();
      let (tx, rx) = mpsc::channel(CURSOR_BUFFER);
      let task_registry = registry.clone();

      // Register before the task can run so its own removal never races ahead
      let mut cursors = registry.0.lock();
      let task = tokio::spawn(async move {
         produce_rows(conn, statement, tx).await;
         task_registry.remove(&id);
      });
      cursors.insert(id, task.abort_handle());
      drop(cursors);

      trace!(cursor = %id, "cursor opened");

      Self {
         id,
         rows: ReceiverStream::new(rx),
         task: Some(task),
      }
   }

   /// Identifier used in logs and by the cursor registry
   pub fn id(&self) -> Uuid {
      self.id
   }

   /// Read the next row, or `None` once the cursor is exhausted.
   pub async fn next_row(&mut self) -> Option<Result<Row>> {
      self.rows.next().await
   }

   /// Read every remaining row.
   ///
   /// Stops at the first error, which is returned.
   pub async fn collect_rows(mut self) -> Result<Vec<Row>> {
      let mut rows = Vec::new();
      while let Some(row) = self.next_row().await {
         rows.push(row?);
      }
      self.close().await?;
      Ok(rows)
   }

   /// Stop reading and wait until the connection has been released.
   pub async fn close(mut self) -> Result<()> {
      self.rows.close();
      if let Some(task) = self.task.take() {
         match task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(Error::CursorTask(e.to_string())),
         }
      }
      debug!(cursor = %self.id, "cursor closed");
      Ok(())
   }
}

impl Stream for Cursor {
   type Item = Result<Row>;

   fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
      // ReceiverStream is Unpin, so we can safely create a pinned reference
      Pin::new(&mut self.rows).poll_next(cx)
   }
}

impl std::fmt::Debug for Cursor {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Cursor").field("id", &self.id).finish_non_exhaustive()
   }
}

/// Body of the producer task. Owns the connection for its whole life.
async fn produce_rows(
   mut conn: ScopedConnection,
   statement: Statement,
   tx: mpsc::Sender<Result<Row>>,
) {
   {
      let mut rows = statement.to_query().fetch(&mut *conn);
      while let Some(item) = rows.next().await {
         let decoded = item.map_err(Error::from).and_then(|row| decode_row(&row));
         let failed = decoded.is_err();

         if tx.send(decoded).await.is_err() {
            trace!("cursor receiver gone, stopping scan");
            break;
         }
         if failed {
            break;
         }
      }
   }

   if let Err(e) = conn.close().await {
      debug!(error = %e, "failed to close cursor connection");
   }
}

/// Registry of cursors whose producer task is still holding a connection.
///
/// Shared by every clone of an executor. Uses a synchronous lock so it can be
/// released from `Drop` and from blocking callers.
#[derive(Clone, Default)]
pub struct ActiveCursors(Arc<Mutex<HashMap<Uuid, AbortHandle>>>);

impl ActiveCursors {
   /// Number of cursors still holding a connection
   pub fn len(&self) -> usize {
      self.0.lock().len()
   }

   pub fn is_empty(&self) -> bool {
      self.0.lock().is_empty()
   }

   fn remove(&self, id: &Uuid) {
      self.0.lock().remove(id);
   }

   /// Abort every producer task, dropping its connection.
   ///
   /// Idempotent. Rows already buffered in a cursor can still be read; after
   /// them the cursor ends.
   pub fn release_all(&self) {
      let mut cursors = self.0.lock();
      if cursors.is_empty() {
         return;
      }
      debug!("Releasing {} open cursor(s)", cursors.len());

      for (id, abort_handle) in cursors.drain() {
         trace!(cursor = %id, "aborting cursor task");
         abort_handle.abort();
      }
   }
}
