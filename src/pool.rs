use std::sync::{Arc, LazyLock};

use crossbeam_queue::ArrayQueue;

use crate::col::Column;
use crate::result_set::RowsState;

const POOL_CAPACITY: usize = 128;

/// The pool used by connections whose [`Opts`](crate::Opts) do not name another one.
pub static GLOBAL_ROWS_POOL: LazyLock<Arc<RowsPool>> =
    LazyLock::new(|| Arc::new(RowsPool::default()));

/// Free lists of result set state and text protocol column buffers.
///
/// Shared by every connection in the process. Both lists are lock-free and
/// bounded; a release into a full list drops the value. Which recycled value
/// an acquire returns is unspecified.
#[derive(Debug)]
pub struct RowsPool {
    rows: ArrayQueue<Box<RowsState>>,
    columns: ArrayQueue<Vec<Column>>,
}

impl RowsPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: ArrayQueue::new(capacity),
            columns: ArrayQueue::new(capacity),
        }
    }

    /// A result set state in its neutral form: no columns, closed.
    pub fn acquire(&self) -> Box<RowsState> {
        self.rows.pop().unwrap_or_default()
    }

    pub fn release(&self, mut state: Box<RowsState>) {
        state.reset();
        // Ignore if pool is full
        let _ = self.rows.push(state);
    }

    /// An empty column buffer, possibly with capacity left from an earlier result set.
    pub fn acquire_columns(&self) -> Vec<Column> {
        self.columns.pop().unwrap_or_default()
    }

    pub fn release_columns(&self, mut columns: Vec<Column>) {
        columns.clear();
        // Ignore if pool is full
        let _ = self.columns.push(columns);
    }

    /// Number of recycled result set states waiting to be reused
    pub fn idle_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of recycled column buffers waiting to be reused
    pub fn idle_columns(&self) -> usize {
        self.columns.len()
    }
}

impl Default for RowsPool {
    fn default() -> Self {
        Self::new(POOL_CAPACITY)
    }
}
