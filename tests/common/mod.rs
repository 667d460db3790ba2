//! In-memory MySQL server responses for driving `Conn` without a server
#![allow(dead_code)]

use std::io::{self, Read, Write};

use zero_mysql_rows::constant::{ColumnFlags, ColumnType, StatusFlags};

/// A transport that replays scripted server packets and records what the
/// client wrote. Reading past the script is an I/O error.
#[derive(Debug)]
pub struct ScriptedStream {
    input: io::Cursor<Vec<u8>>,
    pub written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: io::Cursor::new(input),
            written: Vec::new(),
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn write_lenenc_int(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xFC);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < (1 << 24) {
        out.push(0xFD);
        out.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        out.push(0xFE);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn write_lenenc_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_lenenc_int(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Column of a scripted result set
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub table: &'static str,
    pub name: &'static str,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
}

pub fn col(name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        table: "",
        name,
        column_type,
        flags: ColumnFlags::empty(),
    }
}

pub fn table_col(table: &'static str, name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        table,
        ..col(name, column_type)
    }
}

/// Server responses, one command at a time.
///
/// Call [`Script::reply`] before the packets answering each command so the
/// sequence ids restart at 1.
#[derive(Debug, Default)]
pub struct Script {
    bytes: Vec<u8>,
    seq: u8,
    deprecate_eof: bool,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate result sets the way a server does after negotiating `CLIENT_DEPRECATE_EOF`
    pub fn deprecate_eof() -> Self {
        Self {
            deprecate_eof: true,
            ..Self::default()
        }
    }

    pub fn reply(&mut self) -> &mut Self {
        self.seq = 1;
        self
    }

    /// Skip the sequence id of a packet the client sends mid-exchange
    pub fn client_packet(&mut self) -> &mut Self {
        self.seq = self.seq.wrapping_add(1);
        self
    }

    pub fn packet(&mut self, payload: &[u8]) -> &mut Self {
        let len = (payload.len() as u32).to_le_bytes();
        self.bytes.extend_from_slice(&[len[0], len[1], len[2], self.seq]);
        self.bytes.extend_from_slice(payload);
        self.seq = self.seq.wrapping_add(1);
        self
    }

    pub fn ok(&mut self, affected_rows: u64, last_insert_id: u64, status: StatusFlags) -> &mut Self {
        let payload = ok_payload(0x00, affected_rows, last_insert_id, status);
        self.packet(&payload)
    }

    pub fn err(&mut self, code: u16, sql_state: &str, message: &str) -> &mut Self {
        let mut payload = vec![0xFF];
        payload.extend_from_slice(&code.to_le_bytes());
        payload.push(b'#');
        payload.extend_from_slice(sql_state.as_bytes());
        payload.extend_from_slice(message.as_bytes());
        self.packet(&payload)
    }

    /// EOF packet, or the OK packet that replaces it under `CLIENT_DEPRECATE_EOF`
    pub fn end(&mut self, status: StatusFlags) -> &mut Self {
        if self.deprecate_eof {
            let payload = ok_payload(0xFE, 0, 0, status);
            self.packet(&payload)
        } else {
            let mut payload = vec![0xFE, 0x00, 0x00];
            payload.extend_from_slice(&status.bits().to_le_bytes());
            self.packet(&payload)
        }
    }

    /// Column count, definitions and, unless deprecated, the EOF after them
    pub fn columns(&mut self, columns: &[ColumnSpec]) -> &mut Self {
        let mut count = Vec::new();
        write_lenenc_int(&mut count, columns.len() as u64);
        self.packet(&count);
        for column in columns {
            let payload = column_definition(column);
            self.packet(&payload);
        }
        if !self.deprecate_eof {
            self.end(StatusFlags::SERVER_STATUS_AUTOCOMMIT);
        }
        self
    }

    pub fn text_row(&mut self, fields: &[Option<&str>]) -> &mut Self {
        let mut payload = Vec::new();
        for field in fields {
            match field {
                Some(value) => write_lenenc_bytes(&mut payload, value.as_bytes()),
                None => payload.push(0xFB),
            }
        }
        self.packet(&payload)
    }

    /// Binary row from already encoded non-NULL values
    pub fn binary_row(&mut self, fields: &[Option<Vec<u8>>]) -> &mut Self {
        let mut payload = vec![0x00];
        let mut bitmap = vec![0u8; (fields.len() + 7 + 2) >> 3];
        for (idx, field) in fields.iter().enumerate() {
            if field.is_none() {
                let bit = idx + 2;
                bitmap[bit >> 3] |= 1 << (bit & 7);
            }
        }
        payload.extend_from_slice(&bitmap);
        for field in fields.iter().flatten() {
            payload.extend_from_slice(field);
        }
        self.packet(&payload)
    }

    /// Complete text result set ending with status `SERVER_STATUS_AUTOCOMMIT`
    pub fn text_result_set(&mut self, columns: &[ColumnSpec], rows: &[Vec<Option<&str>>]) -> &mut Self {
        self.columns(columns);
        for row in rows {
            self.text_row(row);
        }
        self.end(StatusFlags::SERVER_STATUS_AUTOCOMMIT)
    }

    /// Raw bytes, for cutting the script short
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn into_stream(self) -> ScriptedStream {
        ScriptedStream::new(self.bytes)
    }
}

fn ok_payload(header: u8, affected_rows: u64, last_insert_id: u64, status: StatusFlags) -> Vec<u8> {
    let mut payload = vec![header];
    write_lenenc_int(&mut payload, affected_rows);
    write_lenenc_int(&mut payload, last_insert_id);
    payload.extend_from_slice(&status.bits().to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload
}

pub fn column_definition(column: &ColumnSpec) -> Vec<u8> {
    let mut out = Vec::new();
    write_lenenc_bytes(&mut out, b"def");
    write_lenenc_bytes(&mut out, b"test");
    write_lenenc_bytes(&mut out, column.table.as_bytes());
    write_lenenc_bytes(&mut out, column.table.as_bytes());
    write_lenenc_bytes(&mut out, column.name.as_bytes());
    write_lenenc_bytes(&mut out, column.name.as_bytes());
    out.push(0x0c);
    out.extend_from_slice(&45u16.to_le_bytes()); // utf8mb4_general_ci
    out.extend_from_slice(&255u32.to_le_bytes());
    out.push(column.column_type as u8);
    out.extend_from_slice(&column.flags.bits().to_le_bytes());
    out.push(0); // decimals
    out.extend_from_slice(&[0, 0]);
    out
}

/// Packets the client sent, as (sequence id, payload)
pub fn sent_packets(written: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut packets = Vec::new();
    let mut rest = written;
    while rest.len() >= 4 {
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], 0]) as usize;
        let seq = rest[3];
        packets.push((seq, rest[4..4 + len].to_vec()));
        rest = &rest[4 + len..];
    }
    packets
}
