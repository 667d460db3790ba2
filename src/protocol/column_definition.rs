use crate::col::Column;
use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Represents a payload part of a column definition packet
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinitionBytes<'a>(pub &'a [u8]);

/// Fixed-size tail of Column Definition packet (12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    pub fn column_type(&self) -> Result<ColumnType> {
        let column_type = self.column_type;
        ColumnType::from_u8(column_type)
            .ok_or_else(|| Error::LibraryBug(eyre!("unknown column type: 0x{:02X}", column_type)))
    }

    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_truncate(self.flags.get())
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

fn read_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes)
        .ok()
        .ok_or(Error::InvalidPacket)
}

impl ColumnDefinitionBytes<'_> {
    /// Parse into `column`, reusing its string allocations
    pub fn parse_into(self, column: &mut Column) -> Result<()> {
        let data = self.0;

        // ─── Variable Length String Fields ───────────────────────────
        let (_catalog, data) = read_string_lenenc(data)?;
        let (_schema, data) = read_string_lenenc(data)?;
        let (table_alias, data) = read_string_lenenc(data)?;
        let (_table_original, data) = read_string_lenenc(data)?;
        let (name_alias, data) = read_string_lenenc(data)?;
        let (_name_original, data) = read_string_lenenc(data)?;

        // ─── Column Definition Tail ──────────────────────────────────
        // length is always 0x0c
        let (_length, data) = read_int_lenenc(data)?;
        let (tail, _default_values) = read_string_fix(data, 12)?;
        let tail = ColumnDefinitionTail::read_from_bytes(tail)?;

        column.table.clear();
        column.table.push_str(read_utf8(table_alias)?);
        column.name.clear();
        column.name.push_str(read_utf8(name_alias)?);
        column.charset = tail.charset();
        column.column_length = tail.column_length();
        column.column_type = tail.column_type()?;
        column.flags = tail.flags();
        column.decimals = tail.decimals();
        Ok(())
    }
}

impl TryFrom<ColumnDefinitionBytes<'_>> for Column {
    type Error = Error;

    fn try_from(bytes: ColumnDefinitionBytes<'_>) -> Result<Self> {
        let mut column = Column::new(
            String::new(),
            ColumnType::MYSQL_TYPE_NULL,
            ColumnFlags::empty(),
        );
        bytes.parse_into(&mut column)?;
        Ok(column)
    }
}
