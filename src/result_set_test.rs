use std::collections::VecDeque;
use std::sync::Arc;

use crate::col::{Column, ColumnSet};
use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::pool::RowsPool;
use crate::result_set::{Encoding, ResultSet, RowSource, State};
use crate::value::Value;

/// Serves canned rows; counts the calls a result set makes on it.
#[derive(Default)]
struct FakeSource {
    rows: VecDeque<Vec<Value>>,
    alive: bool,
    fail_drain: bool,
    fail_next_read: bool,
    detach_at_end: bool,
    text_reads: usize,
    binary_reads: usize,
    drains: usize,
    discards: usize,
}

impl FakeSource {
    fn with_rows(count: i64) -> Self {
        Self {
            rows: (1..=count).map(|i| vec![Value::SignedInt(i)]).collect(),
            alive: true,
            ..Default::default()
        }
    }

    fn read_row(&mut self, dest: &mut [Value]) -> Result<bool> {
        if self.fail_next_read {
            self.fail_next_read = false;
            return Err(Error::UnexpectedEof);
        }
        match self.rows.pop_front() {
            Some(row) => {
                dest.clone_from_slice(&row);
                Ok(true)
            }
            None => {
                if self.detach_at_end {
                    self.alive = false;
                }
                Ok(false)
            }
        }
    }
}

impl RowSource for FakeSource {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn read_text_row(&mut self, _columns: &[Column], dest: &mut [Value]) -> Result<bool> {
        self.text_reads += 1;
        self.read_row(dest)
    }

    fn read_binary_row(&mut self, _columns: &[Column], dest: &mut [Value]) -> Result<bool> {
        self.binary_reads += 1;
        self.read_row(dest)
    }

    fn drain_until_result_set_end(&mut self) -> Result<()> {
        self.drains += 1;
        if self.fail_drain {
            self.alive = false;
            return Err(Error::UnexpectedEof);
        }
        self.rows.clear();
        Ok(())
    }

    fn discard_pending_results(&mut self) -> Result<()> {
        self.discards += 1;
        Ok(())
    }
}

fn id_column() -> Vec<Column> {
    vec![Column::new("id", ColumnType::MYSQL_TYPE_LONGLONG, ColumnFlags::empty())]
}

fn text_result_set<'a>(
    source: &'a mut FakeSource,
    pool: &Arc<RowsPool>,
) -> ResultSet<&'a mut FakeSource> {
    ResultSet::new(
        source,
        ColumnSet::Exclusive(id_column()),
        Encoding::Text,
        false,
        Arc::clone(pool),
    )
}

#[test]
fn reads_rows_then_end_is_sticky() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(2);
    let mut rs = text_result_set(&mut source, &pool);
    let mut row = vec![Value::Null];

    assert!(rs.next(&mut row).unwrap());
    assert_eq!(row[0], Value::SignedInt(1));
    assert!(rs.next(&mut row).unwrap());
    assert_eq!(row[0], Value::SignedInt(2));
    assert!(!rs.next(&mut row).unwrap());
    assert_eq!(rs.state(), State::Exhausted);
    assert!(!rs.next(&mut row).unwrap());
    assert!(!rs.next(&mut row).unwrap());

    rs.close().unwrap();
    drop(rs);
    // only one read reached the terminator; later calls never touched the source
    assert_eq!(source.text_reads, 3);
    assert_eq!(source.drains, 0);
    assert_eq!(source.discards, 1);
}

#[test]
fn exhausted_ignores_detached_transport() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(0);
    source.detach_at_end = true;
    let mut rs = text_result_set(&mut source, &pool);
    let mut row = vec![Value::Null];
    assert!(!rs.next(&mut row).unwrap());
    assert!(!rs.next(&mut row).unwrap());
    rs.close().unwrap();
    drop(rs);
    assert_eq!(source.discards, 0);
}

#[test]
fn dead_transport_is_invalid_conn() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(1);
    source.alive = false;
    let mut rs = text_result_set(&mut source, &pool);
    let mut row = vec![Value::Null];
    assert!(matches!(rs.next(&mut row), Err(Error::InvalidConn)));
    assert_eq!(rs.state(), State::Open);
}

#[test]
fn encoding_selects_row_reader() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(1);
    let mut rs = ResultSet::new(
        &mut source,
        ColumnSet::Exclusive(id_column()),
        Encoding::Binary,
        false,
        Arc::clone(&pool),
    );
    let mut row = vec![Value::Null];
    assert!(rs.next(&mut row).unwrap());
    assert_eq!(rs.encoding(), Some(Encoding::Binary));
    drop(rs);
    assert_eq!(source.binary_reads, 1);
    assert_eq!(source.text_reads, 0);
}

#[test]
fn destination_length_must_match_columns() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(1);
    let mut rs = text_result_set(&mut source, &pool);
    let mut row = vec![Value::Null, Value::Null];
    assert!(matches!(rs.next(&mut row), Err(Error::BadUsageError(_))));
    assert_eq!(rs.state(), State::Open);
}

#[test]
fn close_is_idempotent() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(3);
    let mut rs = text_result_set(&mut source, &pool);

    rs.close().unwrap();
    rs.close().unwrap();
    rs.close().unwrap();
    assert!(rs.is_closed());
    assert_eq!(rs.state(), State::Closed);
    assert!(rs.columns().is_empty());
    assert!(rs.column_definitions().is_empty());

    let mut row = vec![Value::Null];
    assert!(matches!(rs.next(&mut row), Err(Error::InvalidConn)));
    drop(rs);

    assert_eq!(source.drains, 1);
    assert_eq!(pool.idle_rows(), 1);
    assert_eq!(pool.idle_columns(), 1);
}

#[test]
fn close_drains_unread_rows() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(5);
    let mut rs = text_result_set(&mut source, &pool);
    let mut row = vec![Value::Null];
    assert!(rs.next(&mut row).unwrap());
    assert!(rs.next(&mut row).unwrap());
    rs.close().unwrap();
    drop(rs);

    assert_eq!(source.drains, 1);
    assert!(source.rows.is_empty());
}

#[test]
fn drop_closes() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(5);
    drop(text_result_set(&mut source, &pool));
    assert_eq!(source.drains, 1);
    assert_eq!(pool.idle_rows(), 1);
}

#[test]
fn drain_failure_still_releases() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(5);
    source.fail_drain = true;
    let mut rs = text_result_set(&mut source, &pool);

    assert!(matches!(rs.close(), Err(Error::UnexpectedEof)));
    assert!(rs.is_closed());
    rs.close().unwrap();
    drop(rs);

    assert_eq!(source.drains, 1);
    assert_eq!(source.discards, 0);
    assert_eq!(pool.idle_rows(), 1);
    assert_eq!(pool.idle_columns(), 1);
    assert!(pool.acquire().is_neutral());
}

#[test]
fn close_with_dead_transport_reports_invalid_conn() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(1);
    source.alive = false;
    let mut rs = text_result_set(&mut source, &pool);
    assert!(matches!(rs.close(), Err(Error::InvalidConn)));
    drop(rs);
    assert_eq!(source.drains, 0);
    assert_eq!(pool.idle_rows(), 1);
}

#[test]
fn read_error_leaves_result_set_open() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(2);
    source.fail_next_read = true;
    let mut rs = text_result_set(&mut source, &pool);
    let mut row = vec![Value::Null];

    let err = rs.next(&mut row).unwrap_err();
    assert!(err.is_conn_broken());
    assert_eq!(rs.state(), State::Open);
    rs.close().unwrap();
    drop(rs);
    assert_eq!(source.drains, 1);
}

#[test]
fn shared_columns_survive_sibling_close() {
    let pool = Arc::new(RowsPool::new(4));
    let shared: Arc<[Column]> = id_column().into();
    let mut first = FakeSource::with_rows(1);
    let mut second = FakeSource::with_rows(1);

    let mut a = ResultSet::new(
        &mut first,
        ColumnSet::Shared(Arc::clone(&shared)),
        Encoding::Binary,
        false,
        Arc::clone(&pool),
    );
    let mut b = ResultSet::new(
        &mut second,
        ColumnSet::Shared(Arc::clone(&shared)),
        Encoding::Binary,
        false,
        Arc::clone(&pool),
    );
    assert_eq!(Arc::strong_count(&shared), 3);

    a.close().unwrap();
    assert_eq!(Arc::strong_count(&shared), 2);
    assert_eq!(b.columns(), vec!["id".to_string()]);
    assert_eq!(b.column_definitions()[0].column_type, ColumnType::MYSQL_TYPE_LONGLONG);

    let mut row = vec![Value::Null];
    assert!(b.next(&mut row).unwrap());
    b.close().unwrap();
    assert_eq!(Arc::strong_count(&shared), 1);
    assert_eq!(shared[0].name, "id");
    // shared metadata never enters the column pool
    assert_eq!(pool.idle_columns(), 0);
}

#[test]
fn recycled_state_is_neutral() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(1);
    let mut rs = ResultSet::new(
        &mut source,
        ColumnSet::Exclusive(id_column()),
        Encoding::Binary,
        true,
        Arc::clone(&pool),
    );
    rs.close().unwrap();
    drop(rs);

    let state = pool.acquire();
    assert!(state.is_neutral());
    assert_eq!(state.state(), State::Closed);
}

#[test]
fn columns_with_alias() {
    let pool = Arc::new(RowsPool::new(4));
    let mut source = FakeSource::with_rows(0);
    let mut columns = id_column();
    columns[0].table = "u".to_string();
    columns.push(Column::new("now", ColumnType::MYSQL_TYPE_DATETIME, ColumnFlags::empty()));

    let rs = ResultSet::new(
        &mut source,
        ColumnSet::Exclusive(columns),
        Encoding::Text,
        true,
        Arc::clone(&pool),
    );
    assert_eq!(rs.columns(), vec!["u.id".to_string(), "now".to_string()]);
}
