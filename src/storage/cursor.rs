use std::collections::VecDeque;

use rusqlite::params_from_iter;
use tracing::trace;

use crate::error::{GraphError, Result};
use crate::types::Rid;

use super::query::{ItemQuery, ItemTable};
use super::GraphStore;

/// One base-table row as read by a cursor.
#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct ItemRow {
    pub(crate) table: ItemTable,
    pub(crate) rid: Rid,
    pub(crate) schema_id: String,
    pub(crate) object_id: String,
    pub(crate) edge_kind: Option<i64>,
}

/// Types a cursor can rebuild from a base-table row.
pub trait FromRow<'g>: Sized {
    #[doc(hidden)]
    fn from_row(store: &'g GraphStore, row: ItemRow) -> Result<Self>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CursorState {
    Open,
    Drained,
    Disconnected,
}

/// Lazy, prefetch-one-ahead iterator over the items a query yields.
///
/// Rows are fetched a page at a time. A cursor holds its current page until it
/// is exhausted, [`disconnect`](Self::disconnect)ed or dropped. Any number of
/// cursors may be open against the same store, including nested inside each
/// other's iteration.
pub struct ItemCursor<'g, T> {
    store: &'g GraphStore,
    query: ItemQuery,
    sql: String,
    page: VecDeque<ItemRow>,
    last_rid: Rid,
    peeked: Option<T>,
    state: CursorState,
}

impl<'g, T: FromRow<'g>> ItemCursor<'g, T> {
    pub(crate) fn new(store: &'g GraphStore, query: ItemQuery) -> Self {
        let sql = query.page_sql();
        Self {
            store,
            query,
            sql,
            page: VecDeque::new(),
            last_rid: Rid(i64::MIN),
            peeked: None,
            state: CursorState::Open,
        }
    }

    /// Whether another item is available; fetches the next page when needed.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.peeked.is_none() {
            self.peeked = self.advance()?;
        }
        Ok(self.peeked.is_some())
    }

    /// Returns the next item. Calling this past exhaustion is an error.
    pub fn next_item(&mut self) -> Result<T> {
        if let Some(item) = self.peeked.take() {
            return Ok(item);
        }
        self.advance()?
            .ok_or_else(|| GraphError::InvalidState("cursor is exhausted".into()))
    }

    /// Releases buffered rows; the cursor reports no further items.
    pub fn disconnect(&mut self) {
        if self.state != CursorState::Disconnected {
            trace!(sql = %self.sql, "cursor disconnected");
        }
        self.page.clear();
        self.peeked = None;
        self.state = CursorState::Disconnected;
    }

    /// Whether the cursor can still yield items.
    pub fn is_connected(&self) -> bool {
        match self.state {
            CursorState::Open => true,
            CursorState::Drained => !self.page.is_empty() || self.peeked.is_some(),
            CursorState::Disconnected => false,
        }
    }

    /// Drains the remaining items into a vector.
    pub fn collect_items(self) -> Result<Vec<T>> {
        self.collect()
    }

    fn advance(&mut self) -> Result<Option<T>> {
        if self.page.is_empty() && self.state == CursorState::Open {
            self.fetch_page()?;
        }
        match self.page.pop_front() {
            Some(row) => T::from_row(self.store, row).map(Some),
            None => {
                if self.state != CursorState::Disconnected {
                    self.state = CursorState::Drained;
                }
                Ok(None)
            }
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let batch = self.store.cursor_batch();
        let params = self.query.page_params(self.last_rid, batch);
        let table = self.query.table();
        let rows = self.store.backing()?.query(
            &self.sql,
            params_from_iter(params.iter()),
            |row| {
                Ok(ItemRow {
                    table,
                    rid: Rid(row.get(0)?),
                    schema_id: row.get(1)?,
                    object_id: row.get(2)?,
                    edge_kind: row.get(3)?,
                })
            },
        )?;
        self.store.metrics().cursor_page(rows.len());
        trace!(rows = rows.len(), after = self.last_rid.0, "cursor page fetched");
        if rows.len() < batch {
            self.state = CursorState::Drained;
        }
        if let Some(last) = rows.last() {
            self.last_rid = last.rid;
        }
        self.page.extend(rows);
        Ok(())
    }
}

impl<'g, T: FromRow<'g>> Iterator for ItemCursor<'g, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => self.peeked.take().map(Ok),
            Ok(false) => None,
            Err(err) => {
                self.disconnect();
                Some(Err(err))
            }
        }
    }
}
