//! Driver-facing cursor over a command's response
use auto_impl::auto_impl;

use crate::col::Column;
use crate::error::{Error, Result};
use crate::protocol::response::OkPayload;
use crate::result_set::{ResultSet, RowSource};
use crate::value::Value;

/// Row iteration as seen by code that does not care how rows were encoded.
///
/// `close` may be called any number of times.
#[auto_impl(&mut, Box)]
pub trait Cursor {
    fn columns(&self) -> Vec<String>;

    /// Fill `dest` with the next row; `Ok(false)` once there are no more rows
    fn next(&mut self, dest: &mut [Value]) -> Result<bool>;

    fn close(&mut self) -> Result<()>;
}

/// Rows of a text or binary result set.
///
/// Owns its [`ResultSet`] until the first `close`. A default `Rows` holds
/// nothing and behaves like one that is already closed.
pub struct Rows<C: RowSource> {
    inner: Option<ResultSet<C>>,
}

impl<C: RowSource> Rows<C> {
    pub fn new(result_set: ResultSet<C>) -> Self {
        Self {
            inner: Some(result_set),
        }
    }

    pub fn column_definitions(&self) -> &[Column] {
        self.inner
            .as_ref()
            .map_or(&[][..], ResultSet::column_definitions)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<C: RowSource> Default for Rows<C> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<C: RowSource> Cursor for Rows<C> {
    fn columns(&self) -> Vec<String> {
        self.inner
            .as_ref()
            .map(ResultSet::columns)
            .unwrap_or_default()
    }

    fn next(&mut self, dest: &mut [Value]) -> Result<bool> {
        match self.inner.as_mut() {
            Some(result_set) => result_set.next(dest),
            None => Err(Error::InvalidConn),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut result_set) => result_set.close(),
            None => Ok(()),
        }
    }
}

impl<C: RowSource> std::fmt::Debug for Rows<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows").field("inner", &self.inner).finish()
    }
}

/// Response of a command that returned no result set
#[derive(Debug, Clone)]
pub struct EmptyRows {
    ok: OkPayload,
}

impl EmptyRows {
    pub fn new(ok: OkPayload) -> Self {
        Self { ok }
    }

    pub fn affected_rows(&self) -> u64 {
        self.ok.affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.ok.last_insert_id
    }

    pub fn warnings(&self) -> u16 {
        self.ok.warnings
    }
}

impl Cursor for EmptyRows {
    fn columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn next(&mut self, _dest: &mut [Value]) -> Result<bool> {
        Ok(false)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Response of [`Conn::query`](crate::sync::Conn::query) or
/// [`Conn::exec`](crate::sync::Conn::exec)
#[derive(Debug)]
pub enum QueryResult<C: RowSource> {
    Rows(Rows<C>),
    Empty(EmptyRows),
}

impl<C: RowSource> QueryResult<C> {
    pub fn affected_rows(&self) -> u64 {
        match self {
            QueryResult::Rows(_) => 0,
            QueryResult::Empty(empty) => empty.affected_rows(),
        }
    }

    /// The rows, or an error if the command returned none
    pub fn into_rows(self) -> Result<Rows<C>> {
        match self {
            QueryResult::Rows(rows) => Ok(rows),
            QueryResult::Empty(_) => Err(Error::BadUsageError(
                "command returned no result set".to_string(),
            )),
        }
    }
}

impl<C: RowSource> Cursor for QueryResult<C> {
    fn columns(&self) -> Vec<String> {
        match self {
            QueryResult::Rows(rows) => rows.columns(),
            QueryResult::Empty(empty) => empty.columns(),
        }
    }

    fn next(&mut self, dest: &mut [Value]) -> Result<bool> {
        match self {
            QueryResult::Rows(rows) => rows.next(dest),
            QueryResult::Empty(empty) => empty.next(dest),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            QueryResult::Rows(rows) => rows.close(),
            QueryResult::Empty(empty) => empty.close(),
        }
    }
}
