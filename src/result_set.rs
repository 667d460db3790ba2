use std::sync::Arc;

use auto_impl::auto_impl;

use crate::col::{Column, ColumnSet};
use crate::error::{Error, Result};
use crate::pool::RowsPool;
use crate::value::Value;

/// The packet stream a result set reads from.
///
/// Implemented by [`Conn`](crate::sync::Conn); row reads return `Ok(false)`
/// once the result set terminator has been consumed.
#[auto_impl(&mut, Box)]
pub trait RowSource {
    /// Whether the transport is attached and usable
    fn is_alive(&self) -> bool;

    /// Decode one text protocol row into `dest`
    fn read_text_row(&mut self, columns: &[Column], dest: &mut [Value]) -> Result<bool>;

    /// Decode one binary protocol row into `dest`
    fn read_binary_row(&mut self, columns: &[Column], dest: &mut [Value]) -> Result<bool>;

    /// Discard packets up to and including the current result set's terminator
    fn drain_until_result_set_end(&mut self) -> Result<()>;

    /// Discard any result sets the server announced after the current one
    fn discard_pending_results(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads one row from a [`RowSource`]
pub type RowReader<C> = fn(&mut C, &[Column], &mut [Value]) -> Result<bool>;

/// Row encoding of a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// COM_QUERY responses
    #[default]
    Text,
    /// COM_STMT_EXECUTE responses
    Binary,
}

impl Encoding {
    pub fn row_reader<C: RowSource>(self) -> RowReader<C> {
        match self {
            Encoding::Text => C::read_text_row,
            Encoding::Binary => C::read_binary_row,
        }
    }
}

/// Lifecycle of a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Rows may still be read
    Open,
    /// The terminator has been read; the connection is still attached
    Exhausted,
    /// Released; the state is neutral and belongs to the pool
    #[default]
    Closed,
}

/// The part of a result set that is recycled through [`RowsPool`].
///
/// It never holds a connection.
#[derive(Debug, Default)]
pub struct RowsState {
    columns: Option<ColumnSet>,
    encoding: Encoding,
    state: State,
    columns_with_alias: bool,
}

impl RowsState {
    pub(crate) fn reset(&mut self) {
        *self = RowsState::default();
    }

    /// True when no columns are held and the state is closed
    pub fn is_neutral(&self) -> bool {
        self.columns.is_none()
            && self.encoding == Encoding::Text
            && self.state == State::Closed
            && !self.columns_with_alias
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn columns(&self) -> &[Column] {
        self.columns.as_ref().map_or(&[][..], ColumnSet::as_slice)
    }
}

/// The rows of one command's response, read from the connection `C`.
///
/// Returned by [`Conn::query`](crate::sync::Conn::query) and
/// [`Conn::exec`](crate::sync::Conn::exec) inside a [`Rows`](crate::Rows).
///
/// # Errors from `next`
///
/// Only `Ok(false)` marks the end of the rows. Any error leaves the result
/// set open, so `close` will still drain a stream that may be desynchronized;
/// discard the connection after such an error.
pub struct ResultSet<C: RowSource> {
    conn: Option<C>,
    rows: Option<Box<RowsState>>,
    read_row: RowReader<C>,
    pool: Arc<RowsPool>,
}

impl<C: RowSource> ResultSet<C> {
    pub fn new(
        conn: C,
        columns: ColumnSet,
        encoding: Encoding,
        columns_with_alias: bool,
        pool: Arc<RowsPool>,
    ) -> Self {
        let mut rows = pool.acquire();
        rows.columns = Some(columns);
        rows.encoding = encoding;
        rows.state = State::Open;
        rows.columns_with_alias = columns_with_alias;
        Self {
            conn: Some(conn),
            rows: Some(rows),
            read_row: encoding.row_reader(),
            pool,
        }
    }

    /// Column names in order; `table.name` when aliasing is enabled
    pub fn columns(&self) -> Vec<String> {
        let Some(rows) = self.rows.as_deref() else {
            return Vec::new();
        };
        rows.columns()
            .iter()
            .map(|col| {
                if rows.columns_with_alias {
                    col.name_with_alias()
                } else {
                    col.name.clone()
                }
            })
            .collect()
    }

    pub fn column_definitions(&self) -> &[Column] {
        self.rows.as_deref().map_or(&[][..], RowsState::columns)
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.rows.as_deref().map(|rows| rows.encoding)
    }

    pub fn state(&self) -> State {
        self.rows.as_deref().map_or(State::Closed, RowsState::state)
    }

    /// Read the next row into `dest`, which must have one slot per column.
    ///
    /// Returns `Ok(false)` at the end of the rows and on every call after that.
    pub fn next(&mut self, dest: &mut [Value]) -> Result<bool> {
        let Some(rows) = self.rows.as_deref_mut() else {
            return Err(Error::InvalidConn);
        };
        if rows.state == State::Exhausted {
            return Ok(false);
        }
        let conn = match self.conn.as_mut() {
            Some(conn) if conn.is_alive() => conn,
            _ => return Err(Error::InvalidConn),
        };

        let columns = rows.columns();
        if dest.len() != columns.len() {
            return Err(Error::BadUsageError(format!(
                "row buffer has {} slots for {} columns",
                dest.len(),
                columns.len()
            )));
        }

        let has_row = (self.read_row)(conn, columns, dest)?;
        if !has_row {
            rows.state = State::Exhausted;
        }
        Ok(has_row)
    }

    /// Drain unread rows, detach the connection and recycle this result set.
    ///
    /// Idempotent. The connection and columns are released even if draining
    /// fails; the drain error is returned and the connection should then be
    /// discarded.
    #[tracing::instrument(skip_all)]
    pub fn close(&mut self) -> Result<()> {
        let Some(mut rows) = self.rows.take() else {
            return Ok(());
        };

        let mut result = Ok(());
        if rows.state == State::Open {
            result = match self.conn.as_mut() {
                Some(conn) if conn.is_alive() => conn.drain_until_result_set_end(),
                _ => Err(Error::InvalidConn),
            };
            // a failed drain leaves the stream in an unknown position; never drain it twice
            rows.state = State::Exhausted;
        }
        if result.is_ok()
            && let Some(conn) = self.conn.as_mut()
            && conn.is_alive()
        {
            result = conn.discard_pending_results();
        }

        self.conn = None;
        if let Some(columns) = rows.columns.take() {
            columns.release(&self.pool);
        }
        self.pool.release(rows);
        result
    }

    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }
}

impl<C: RowSource> Drop for ResultSet<C> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!("failed to drain result set on drop: {}", err);
        }
    }
}

impl<C: RowSource> std::fmt::Debug for ResultSet<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("attached", &self.conn.is_some())
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
