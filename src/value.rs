//! Decoded field values written into a caller-owned row buffer
use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// One field of a row.
///
/// A `Value` is a slot in the destination buffer handed to `next`; the bytes
/// variant keeps its allocation when the slot is overwritten by a later row.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value
    #[default]
    Null,
    /// Signed integer (TINYINT, SMALLINT, INT, BIGINT)
    SignedInt(i64),
    /// Unsigned integer (TINYINT UNSIGNED, SMALLINT UNSIGNED, INT UNSIGNED, BIGINT UNSIGNED)
    UnsignedInt(u64),
    /// FLOAT - 4-byte floating point
    Float(f32),
    /// DOUBLE - 8-byte floating point
    Double(f64),
    /// DATE/DATETIME/TIMESTAMP
    Timestamp(Timestamp),
    /// TIME
    Time(Time),
    /// Text protocol fields and BLOB, STRING, VARCHAR, DECIMAL, JSON, ..
    Bytes(Vec<u8>),
}

/// DATE/DATETIME/TIMESTAMP as sent on the wire; all zero for `0000-00-00 00:00:00`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

/// TIME as sent on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Time {
    pub is_negative: bool,
    pub days: u32,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Overwrite with `Bytes(data)`, reusing the current allocation if any
    pub fn set_bytes(&mut self, data: &[u8]) {
        if let Value::Bytes(buf) = self {
            buf.clear();
            buf.extend_from_slice(data);
        } else {
            *self = Value::Bytes(data.to_vec());
        }
    }

    /// Decode one non-NULL binary protocol field into `self`
    ///
    /// Returns the bytes following the field.
    pub fn read_binary<'a>(
        &mut self,
        column_type: ColumnType,
        flags: ColumnFlags,
        data: &'a [u8],
    ) -> Result<&'a [u8]> {
        let is_unsigned = flags.contains(ColumnFlags::UNSIGNED_FLAG);

        match column_type {
            ColumnType::MYSQL_TYPE_NULL => {
                *self = Value::Null;
                Ok(data)
            }

            ColumnType::MYSQL_TYPE_TINY => {
                let (val, rest) = read_int_1(data)?;
                *self = if is_unsigned {
                    Value::UnsignedInt(u64::from(val))
                } else {
                    Value::SignedInt(i64::from(val as i8))
                };
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
                let (val, rest) = read_int_2(data)?;
                *self = if is_unsigned {
                    Value::UnsignedInt(u64::from(val))
                } else {
                    Value::SignedInt(i64::from(val as i16))
                };
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
                let (val, rest) = read_int_4(data)?;
                *self = if is_unsigned {
                    Value::UnsignedInt(u64::from(val))
                } else {
                    Value::SignedInt(i64::from(val as i32))
                };
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_LONGLONG => {
                let (val, rest) = read_int_8(data)?;
                *self = if is_unsigned {
                    Value::UnsignedInt(val)
                } else {
                    Value::SignedInt(val as i64)
                };
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_FLOAT => {
                let (val, rest) = read_int_4(data)?;
                *self = Value::Float(f32::from_bits(val));
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_DOUBLE => {
                let (val, rest) = read_int_8(data)?;
                *self = Value::Double(f64::from_bits(val));
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_DATE
            | ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_NEWDATE => {
                let (len, rest) = read_int_1(data)?;
                let (bytes, rest) = read_string_fix(rest, usize::from(len))?;
                *self = Value::Timestamp(read_timestamp(bytes)?);
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                let (len, rest) = read_int_1(data)?;
                let (bytes, rest) = read_string_fix(rest, usize::from(len))?;
                *self = Value::Time(read_time(bytes)?);
                Ok(rest)
            }

            ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_GEOMETRY
            | ColumnType::MYSQL_TYPE_JSON
            | ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_NEWDECIMAL
            | ColumnType::MYSQL_TYPE_ENUM
            | ColumnType::MYSQL_TYPE_SET
            | ColumnType::MYSQL_TYPE_BIT
            | ColumnType::MYSQL_TYPE_VECTOR
            | ColumnType::MYSQL_TYPE_TYPED_ARRAY => {
                let (bytes, rest) = read_string_lenenc(data)?;
                self.set_bytes(bytes);
                Ok(rest)
            }
        }
    }
}

// ============================================================================
// Temporal wire layouts
// ============================================================================

/// DATE/DATETIME/TIMESTAMP with date only
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct Timestamp4 {
    year: U16LE,
    month: u8,
    day: u8,
}

/// DATE/DATETIME/TIMESTAMP without microseconds
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct Timestamp7 {
    date: Timestamp4,
    hour: u8,
    minute: u8,
    second: u8,
}

/// DATE/DATETIME/TIMESTAMP with microseconds
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct Timestamp11 {
    datetime: Timestamp7,
    microsecond: U32LE,
}

/// TIME without microseconds
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct Time8 {
    is_negative: u8,
    days: U32LE,
    hour: u8,
    minute: u8,
    second: u8,
}

/// TIME with microseconds
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct Time12 {
    time: Time8,
    microsecond: U32LE,
}

impl From<Timestamp4> for Timestamp {
    fn from(ts: Timestamp4) -> Self {
        Self {
            year: ts.year.get(),
            month: ts.month,
            day: ts.day,
            ..Default::default()
        }
    }
}

impl From<Timestamp7> for Timestamp {
    fn from(ts: Timestamp7) -> Self {
        Self {
            hour: ts.hour,
            minute: ts.minute,
            second: ts.second,
            ..Timestamp::from(ts.date)
        }
    }
}

impl From<Time8> for Time {
    fn from(time: Time8) -> Self {
        Self {
            is_negative: time.is_negative != 0,
            days: time.days.get(),
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            microsecond: 0,
        }
    }
}

fn read_timestamp(bytes: &[u8]) -> Result<Timestamp> {
    match bytes.len() {
        0 => Ok(Timestamp::default()),
        4 => Ok(Timestamp4::read_from_bytes(bytes)?.into()),
        7 => Ok(Timestamp7::read_from_bytes(bytes)?.into()),
        11 => {
            let ts = Timestamp11::read_from_bytes(bytes)?;
            Ok(Timestamp {
                microsecond: ts.microsecond.get(),
                ..Timestamp::from(ts.datetime)
            })
        }
        _ => Err(Error::InvalidPacket),
    }
}

fn read_time(bytes: &[u8]) -> Result<Time> {
    match bytes.len() {
        0 => Ok(Time::default()),
        8 => Ok(Time8::read_from_bytes(bytes)?.into()),
        12 => {
            let time = Time12::read_from_bytes(bytes)?;
            Ok(Time {
                microsecond: time.microsecond.get(),
                ..Time::from(time.time)
            })
        }
        _ => Err(Error::InvalidPacket),
    }
}
