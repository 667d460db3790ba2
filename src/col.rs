use std::sync::Arc;

use crate::constant::{ColumnFlags, ColumnType};
use crate::pool::RowsPool;

/// Column definition from MySQL protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Table alias, empty for computed columns
    pub table: String,
    /// Column alias
    pub name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, flags: ColumnFlags) -> Self {
        Self {
            table: String::new(),
            name: name.into(),
            charset: 0,
            column_length: 0,
            column_type,
            flags,
            decimals: 0,
        }
    }

    /// `table.name`, or `name` for columns without a table
    pub fn name_with_alias(&self) -> String {
        if self.table.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }
}

/// The columns of one result set, tagged with who owns them.
#[derive(Debug)]
pub enum ColumnSet {
    /// Parsed for a single result set and recycled when it closes
    Exclusive(Vec<Column>),
    /// Cached on a prepared statement and shared by all of its executions
    Shared(Arc<[Column]>),
}

impl ColumnSet {
    pub fn as_slice(&self) -> &[Column] {
        match self {
            ColumnSet::Exclusive(columns) => columns,
            ColumnSet::Shared(columns) => columns,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Give up this result set's hold on the columns.
    ///
    /// Exclusive buffers go back to `pool`; shared metadata only loses one
    /// reference and is never modified.
    pub fn release(self, pool: &RowsPool) {
        match self {
            ColumnSet::Exclusive(columns) => pool.release_columns(columns),
            ColumnSet::Shared(columns) => drop(columns),
        }
    }
}
