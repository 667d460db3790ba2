//! Pooled result sets for a MySQL client.
//!
//! A command's response is read row by row through a [`Cursor`]. Closing a
//! cursor early drains the rows still on the wire, so the connection is ready
//! for the next command, and recycles the result set through a [`RowsPool`].

mod buffer;
pub mod col;
pub mod constant;
pub mod cursor;
pub mod error;
mod opts;
pub mod pool;
pub mod protocol;
pub mod result_set;
mod statement;
#[cfg(feature = "sync")]
pub mod sync;
pub mod value;

pub use col::{Column, ColumnSet};
pub use cursor::{Cursor, EmptyRows, QueryResult, Rows};
pub use error::{Error, Result};
pub use opts::Opts;
pub use pool::{GLOBAL_ROWS_POOL, RowsPool};
pub use result_set::{Encoding, ResultSet, RowSource, State};
pub use statement::Statement;
pub use value::{Time, Timestamp, Value};

#[cfg(test)]
mod result_set_test;
