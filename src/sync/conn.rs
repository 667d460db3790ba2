use std::io::{BufReader, Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferSet;
use crate::col::{Column, ColumnSet};
use crate::constant::{CapabilityFlags, StatusFlags};
use crate::cursor::{Cursor, EmptyRows, QueryResult, Rows};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::ColumnDefinitionBytes;
use crate::protocol::command::{Response, read_response, write_execute, write_query};
use crate::protocol::packet::{read_payload, write_payload};
use crate::protocol::response::{
    ErrPayloadBytes, OkPayload, is_result_set_terminator, read_eof_packet, read_terminator_status,
};
use crate::protocol::row::{decode_binary_row, decode_text_row};
use crate::result_set::{Encoding, ResultSet, RowSource};
use crate::statement::Statement;
use crate::value::Value;

/// First packet of a command response, once parsed
enum ResponseHeader {
    Empty(OkPayload),
    Columns(usize),
}

/// A MySQL connection over an already authenticated transport.
///
/// Result sets borrow the connection mutably, so a command cannot be sent
/// while the rows of the previous one are still being read. An I/O or
/// framing error tears the transport down; every later operation fails with
/// [`Error::InvalidConn`].
pub struct Conn<S: Read + Write> {
    stream: Option<BufReader<S>>,
    buffer_set: BufferSet,
    opts: Opts,
    status_flags: StatusFlags,
    /// Sequence id expected on the next packet read
    sequence_id: u8,
    /// Rows of a result set are still on the wire
    in_result_set: bool,
}

impl<S: Read + Write> Conn<S> {
    pub fn new(stream: S, opts: Opts) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
            buffer_set: BufferSet::new(),
            opts,
            status_flags: StatusFlags::empty(),
            sequence_id: 0,
            in_result_set: false,
        }
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn capability_flags(&self) -> CapabilityFlags {
        self.opts.capabilities
    }

    /// Status flags of the last OK or EOF packet
    pub fn status_flags(&self) -> StatusFlags {
        self.status_flags
    }

    /// Detach and return the transport
    pub fn disconnect(&mut self) -> Option<S> {
        self.in_result_set = false;
        self.stream.take().map(BufReader::into_inner)
    }

    /// Tear the transport down if `result` means the stream can no longer be trusted
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_conn_broken()
            && self.stream.take().is_some()
        {
            self.in_result_set = false;
            debug!("connection closed after error: {}", err);
        }
        result
    }

    #[tracing::instrument(skip_all)]
    fn read_packet(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::InvalidConn);
        };
        let result = read_payload(
            stream,
            &mut self.buffer_set.read_buffer,
            &mut self.sequence_id,
        );
        self.guard(result)
    }

    /// Send the command buffer, its first packet carrying `sequence_id`
    fn write_packets(&mut self, sequence_id: u8) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::InvalidConn);
        };
        let result = write_payload(stream.get_mut(), self.buffer_set.command_mut(), sequence_id);
        self.sequence_id = self.guard(result)?;
        Ok(())
    }

    /// Send the command in the write buffer
    fn write_command(&mut self) -> Result<()> {
        let payload_len = self.buffer_set.command_len();
        if payload_len > self.opts.max_allowed_packet {
            return Err(Error::BadUsageError(format!(
                "command of {} bytes exceeds max_allowed_packet ({})",
                payload_len, self.opts.max_allowed_packet
            )));
        }
        if self.stream.is_none() {
            return Err(Error::InvalidConn);
        }

        self.status_flags = StatusFlags::empty();
        self.in_result_set = false;
        self.write_packets(0)
    }

    fn read_response_header(&mut self) -> Result<ResponseHeader> {
        self.read_packet()?;
        let header = match read_response(&self.buffer_set.read_buffer) {
            Ok(Response::Ok(ok_bytes)) => {
                OkPayload::try_from(ok_bytes).map(|ok| Some(ResponseHeader::Empty(ok)))
            }
            Ok(Response::ResultSet { column_count }) => usize::try_from(column_count)
                .map(|count| Some(ResponseHeader::Columns(count)))
                .map_err(Error::from_debug),
            Ok(Response::LocalInfile { filename }) => {
                debug!(
                    filename = %String::from_utf8_lossy(filename),
                    "declining LOCAL INFILE request"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        };
        match self.guard(header)? {
            Some(ResponseHeader::Empty(ok)) => {
                self.status_flags = ok.status_flags;
                Ok(ResponseHeader::Empty(ok))
            }
            Some(header) => Ok(header),
            None => {
                self.decline_local_infile()?;
                Err(Error::BadUsageError(
                    "LOCAL INFILE requests are not supported".to_string(),
                ))
            }
        }
    }

    /// Answer a LOCAL INFILE request with an empty file and read the server's
    /// verdict on the statement, leaving the connection ready for a command.
    fn decline_local_infile(&mut self) -> Result<()> {
        self.buffer_set.new_command();
        self.write_packets(self.sequence_id)?;
        self.read_packet()?;
        let ok = match read_response(&self.buffer_set.read_buffer) {
            Ok(Response::Ok(ok_bytes)) => OkPayload::try_from(ok_bytes),
            Ok(_) => Err(Error::InvalidPacket),
            Err(err) => Err(err),
        };
        self.status_flags = self.guard(ok)?.status_flags;
        self.discard_pending_results()
    }

    /// Read the EOF packet that follows column definitions, unless the server omits it
    fn read_column_definitions_end(&mut self) -> Result<()> {
        if !self
            .opts
            .capabilities
            .contains(CapabilityFlags::CLIENT_DEPRECATE_EOF)
        {
            self.read_packet()?;
            let eof = read_eof_packet(&self.buffer_set.read_buffer).map(|_| ());
            self.guard(eof)?;
        }
        Ok(())
    }

    fn read_column_definitions(&mut self, count: usize, columns: &mut Vec<Column>) -> Result<()> {
        columns.reserve(count);
        for _ in 0..count {
            self.read_packet()?;
            let column = Column::try_from(ColumnDefinitionBytes(&self.buffer_set.read_buffer));
            columns.push(self.guard(column)?);
        }
        self.read_column_definitions_end()
    }

    fn skip_column_definitions(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.read_packet()?;
        }
        self.read_column_definitions_end()
    }

    /// Parse `count` column definitions into a pooled buffer
    fn read_exclusive_columns(&mut self, count: usize) -> Result<ColumnSet> {
        let mut columns = self.opts.pool.acquire_columns();
        match self.read_column_definitions(count, &mut columns) {
            Ok(()) => Ok(ColumnSet::Exclusive(columns)),
            Err(err) => {
                self.opts.pool.release_columns(columns);
                Err(err)
            }
        }
    }

    fn rows(&mut self, columns: ColumnSet, encoding: Encoding) -> QueryResult<&mut Self> {
        self.in_result_set = true;
        let columns_with_alias = self.opts.columns_with_alias;
        let pool = Arc::clone(&self.opts.pool);
        QueryResult::Rows(Rows::new(ResultSet::new(
            self,
            columns,
            encoding,
            columns_with_alias,
            pool,
        )))
    }

    fn empty(&mut self, ok: OkPayload) -> Result<QueryResult<&mut Self>> {
        self.discard_pending_results()?;
        Ok(QueryResult::Empty(EmptyRows::new(ok)))
    }

    /// Run `sql` with COM_QUERY. The rows, if any, use the text encoding.
    ///
    /// Only the first result of a multi-statement query is returned; the
    /// remaining ones are discarded when the rows are closed. A LOCAL INFILE
    /// request is answered with an empty file and reported as
    /// [`Error::BadUsageError`].
    #[tracing::instrument(skip_all)]
    pub fn query(&mut self, sql: &str) -> Result<QueryResult<&mut Self>> {
        if self.stream.is_none() {
            return Err(Error::InvalidConn);
        }
        write_query(self.buffer_set.new_command(), sql);
        self.write_command()?;

        match self.read_response_header()? {
            ResponseHeader::Empty(ok) => self.empty(ok),
            ResponseHeader::Columns(count) => {
                let columns = self.read_exclusive_columns(count)?;
                Ok(self.rows(columns, Encoding::Text))
            }
        }
    }

    /// Run `sql` and discard its result
    pub fn query_drop(&mut self, sql: &str) -> Result<()> {
        self.query(sql)?.close()
    }

    /// Execute a prepared statement with COM_STMT_EXECUTE. The rows, if any,
    /// use the binary encoding.
    ///
    /// When the server announces as many columns as the statement was
    /// prepared with, the result set shares the statement's metadata.
    #[tracing::instrument(skip_all)]
    pub fn exec(&mut self, stmt: &Statement, params: &[Value]) -> Result<QueryResult<&mut Self>> {
        if params.len() != usize::from(stmt.num_params()) {
            return Err(Error::BadUsageError(format!(
                "statement expects {} parameters, got {}",
                stmt.num_params(),
                params.len()
            )));
        }
        if self.stream.is_none() {
            return Err(Error::InvalidConn);
        }
        write_execute(self.buffer_set.new_command(), stmt.id(), params);
        self.write_command()?;

        match self.read_response_header()? {
            ResponseHeader::Empty(ok) => self.empty(ok),
            ResponseHeader::Columns(count) if count == stmt.columns().len() => {
                self.skip_column_definitions(count)?;
                Ok(self.rows(ColumnSet::Shared(Arc::clone(stmt.columns())), Encoding::Binary))
            }
            ResponseHeader::Columns(count) => {
                let columns = self.read_exclusive_columns(count)?;
                Ok(self.rows(columns, Encoding::Binary))
            }
        }
    }

    /// Execute a prepared statement and discard its result
    pub fn exec_drop(&mut self, stmt: &Statement, params: &[Value]) -> Result<()> {
        self.exec(stmt, params)?.close()
    }

    /// Read the next packet of the current result set.
    ///
    /// Returns `Ok(false)` after the terminator, recording its status flags.
    fn read_row_packet(&mut self) -> Result<bool> {
        if !self.in_result_set {
            return Ok(false);
        }
        self.read_packet()?;

        let capabilities = self.opts.capabilities;
        let payload = &self.buffer_set.read_buffer;
        if payload.first() == Some(&0xFF) {
            // an ERR packet ends the result set
            self.in_result_set = false;
            return Err(ErrPayloadBytes(payload).into());
        }
        if is_result_set_terminator(payload, capabilities) {
            let status = read_terminator_status(payload, capabilities);
            self.status_flags = self.guard(status)?;
            self.in_result_set = false;
            return Ok(false);
        }
        Ok(true)
    }
}

impl<S: Read + Write> RowSource for Conn<S> {
    fn is_alive(&self) -> bool {
        self.stream.is_some()
    }

    fn read_text_row(&mut self, _columns: &[Column], dest: &mut [Value]) -> Result<bool> {
        if !self.read_row_packet()? {
            return Ok(false);
        }
        let decoded = decode_text_row(&self.buffer_set.read_buffer, dest);
        self.guard(decoded)?;
        Ok(true)
    }

    fn read_binary_row(&mut self, columns: &[Column], dest: &mut [Value]) -> Result<bool> {
        if !self.read_row_packet()? {
            return Ok(false);
        }
        let decoded = decode_binary_row(&self.buffer_set.read_buffer, columns, dest);
        self.guard(decoded)?;
        Ok(true)
    }

    #[tracing::instrument(skip_all)]
    fn drain_until_result_set_end(&mut self) -> Result<()> {
        let mut drained = 0_usize;
        while self.read_row_packet()? {
            drained += 1;
        }
        debug!(drained, "drained unread rows");
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    fn discard_pending_results(&mut self) -> Result<()> {
        while self
            .status_flags
            .contains(StatusFlags::SERVER_MORE_RESULTS_EXISTS)
        {
            self.status_flags.remove(StatusFlags::SERVER_MORE_RESULTS_EXISTS);
            match self.read_response_header()? {
                ResponseHeader::Empty(_) => {}
                ResponseHeader::Columns(count) => {
                    debug!(columns = count, "discarding pending result set");
                    self.skip_column_definitions(count)?;
                    self.in_result_set = true;
                    self.drain_until_result_set_end()?;
                }
            }
        }
        Ok(())
    }
}

impl<S: Read + Write> std::fmt::Debug for Conn<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("alive", &self.stream.is_some())
            .field("status_flags", &self.status_flags)
            .field("in_result_set", &self.in_result_set)
            .finish_non_exhaustive()
    }
}
