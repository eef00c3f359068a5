use std::fmt;

use sqlx_sqlcipher_toolkit::{Cursor, Result, Row};
use tokio::runtime::Runtime;

/// Blocking view of a [`Cursor`].
///
/// Each call to [`Iterator::next`] drives the helper's runtime until the next
/// row arrives, so the row producer only makes progress while the cursor is
/// being read. Dropping the cursor closes it and waits for the connection to
/// be released.
#[must_use = "if unused, the cursor is dropped and its connection released"]
pub struct BlockingCursor<'a> {
   // Taken by `close`/`collect_rows`; `None` afterwards
   cursor: Option<Cursor>,
   runtime: &'a Runtime,
}

impl<'a> BlockingCursor<'a> {
   pub(crate) fn new(cursor: Cursor, runtime: &'a Runtime) -> Self {
      Self {
         cursor: Some(cursor),
         runtime,
      }
   }

   /// Read every remaining row, stopping at the first error.
   pub fn collect_rows(mut self) -> Result<Vec<Row>> {
      match self.cursor.take() {
         Some(cursor) => self.runtime.block_on(cursor.collect_rows()),
         None => Ok(Vec::new()),
      }
   }

   /// Stop reading and wait until the connection has been released.
   pub fn close(mut self) -> Result<()> {
      match self.cursor.take() {
         Some(cursor) => self.runtime.block_on(cursor.close()),
         None => Ok(()),
      }
   }
}

impl Iterator for BlockingCursor<'_> {
   type Item = Result<Row>;

   fn next(&mut self) -> Option<Self::Item> {
      let cursor = self.cursor.as_mut()?;
      self.runtime.block_on(cursor.next_row())
   }
}

impl Drop for BlockingCursor<'_> {
   fn drop(&mut self) {
      // The producer only runs inside block_on, so drive it to the end here
      if let Some(cursor) = self.cursor.take() {
         let _ = self.runtime.block_on(cursor.close());
      }
   }
}

impl fmt::Debug for BlockingCursor<'_> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("BlockingCursor").field("cursor", &self.cursor).finish()
   }
}
