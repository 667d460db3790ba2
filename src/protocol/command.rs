use crate::constant::{ColumnType, CommandByte};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::{ErrPayloadBytes, OkPayloadBytes};
use crate::value::{Time, Timestamp, Value};

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Write COM_STMT_EXECUTE command
pub fn write_execute(out: &mut Vec<u8>, statement_id: u32, params: &[Value]) {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);

    // flags (1 byte) - CURSOR_TYPE_NO_CURSOR
    write_int_1(out, 0x00);

    // iteration count (4 bytes) - always 1
    write_int_4(out, 1);

    if params.is_empty() {
        return;
    }

    // NULL bitmap: (num_params + 7) / 8 bytes
    let start = out.len();
    out.resize(start + params.len().div_ceil(8), 0);
    for (idx, param) in params.iter().enumerate() {
        if param.is_null() {
            out[start + (idx >> 3)] |= 1 << (idx & 7);
        }
    }

    // new-params-bound-flag
    write_int_1(out, 0x01);
    for param in params {
        let (column_type, unsigned) = param_type(param);
        write_int_1(out, column_type as u8);
        write_int_1(out, if unsigned { 0x80 } else { 0x00 });
    }

    for param in params {
        write_param(out, param);
    }
}

fn param_type(param: &Value) -> (ColumnType, bool) {
    match param {
        Value::Null => (ColumnType::MYSQL_TYPE_NULL, false),
        Value::SignedInt(_) => (ColumnType::MYSQL_TYPE_LONGLONG, false),
        Value::UnsignedInt(_) => (ColumnType::MYSQL_TYPE_LONGLONG, true),
        Value::Float(_) => (ColumnType::MYSQL_TYPE_FLOAT, false),
        Value::Double(_) => (ColumnType::MYSQL_TYPE_DOUBLE, false),
        Value::Timestamp(_) => (ColumnType::MYSQL_TYPE_DATETIME, false),
        Value::Time(_) => (ColumnType::MYSQL_TYPE_TIME, false),
        Value::Bytes(_) => (ColumnType::MYSQL_TYPE_STRING, false),
    }
}

fn write_param(out: &mut Vec<u8>, param: &Value) {
    match param {
        Value::Null => {}
        Value::SignedInt(v) => write_int_8(out, *v as u64),
        Value::UnsignedInt(v) => write_int_8(out, *v),
        Value::Float(v) => write_int_4(out, v.to_bits()),
        Value::Double(v) => write_int_8(out, v.to_bits()),
        Value::Timestamp(ts) => write_timestamp(out, ts),
        Value::Time(time) => write_time(out, time),
        Value::Bytes(bytes) => write_bytes_lenenc(out, bytes),
    }
}

fn write_timestamp(out: &mut Vec<u8>, ts: &Timestamp) {
    write_int_1(out, 11);
    write_int_2(out, ts.year);
    write_int_1(out, ts.month);
    write_int_1(out, ts.day);
    write_int_1(out, ts.hour);
    write_int_1(out, ts.minute);
    write_int_1(out, ts.second);
    write_int_4(out, ts.microsecond);
}

fn write_time(out: &mut Vec<u8>, time: &Time) {
    write_int_1(out, 12);
    write_int_1(out, u8::from(time.is_negative));
    write_int_4(out, time.days);
    write_int_1(out, time.hour);
    write_int_1(out, time.minute);
    write_int_1(out, time.second);
    write_int_4(out, time.microsecond);
}

/// First packet of a COM_QUERY or COM_STMT_EXECUTE response
#[derive(Debug)]
pub enum Response<'a> {
    Ok(OkPayloadBytes<'a>),
    ResultSet { column_count: u64 },
    /// LOCAL INFILE request; the server waits for the file's contents
    LocalInfile { filename: &'a [u8] },
}

/// Read the first response packet
/// This can be:
/// - 0xFF: ERR packet (error occurred)
/// - 0x00: OK packet (command succeeded without result set)
/// - 0xFB: LOCAL INFILE request, followed by the file name
/// - Otherwise: Result set (first byte is column count as length-encoded integer)
pub fn read_response(payload: &[u8]) -> Result<Response<'_>> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
        Some(0x00) => Ok(Response::Ok(OkPayloadBytes(payload))),
        Some(0xFB) => Ok(Response::LocalInfile {
            filename: &payload[1..],
        }),
        Some(_) => {
            let (column_count, _rest) = read_int_lenenc(payload)?;
            Ok(Response::ResultSet { column_count })
        }
    }
}
