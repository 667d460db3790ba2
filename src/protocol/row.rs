use crate::col::Column;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::value::Value;

/// NULL bitmap of a binary protocol row
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
    offset: usize,
}

impl<'a> NullBitmap<'a> {
    /// Create a NULL bitmap for result sets (offset = 2)
    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self { bitmap, offset: 2 }
    }

    /// Number of bitmap bytes for `num_columns` row fields
    pub fn result_set_len(num_columns: usize) -> usize {
        (num_columns + 7 + 2) >> 3
    }

    /// Check if the column at the given index is NULL
    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + self.offset;
        let byte_pos = bit_pos >> 3;
        let bit_offset = bit_pos & 7;

        match self.bitmap.get(byte_pos) {
            Some(byte) => byte & (1 << bit_offset) != 0,
            None => false,
        }
    }
}

/// Decode a text protocol row: one length-encoded string or `0xFB` per column.
///
/// Values are stored as bytes; `dest` must have one slot per column.
pub fn decode_text_row(payload: &[u8], dest: &mut [Value]) -> Result<()> {
    let mut data = payload;
    for slot in dest.iter_mut() {
        let (field, rest) = read_bytes_lenenc_nullable(data)?;
        match field {
            Some(bytes) => slot.set_bytes(bytes),
            None => *slot = Value::Null,
        }
        data = rest;
    }
    if !data.is_empty() {
        return Err(Error::InvalidPacket);
    }
    Ok(())
}

/// Decode a binary protocol row: header `0x00`, NULL bitmap, then the
/// non-NULL values in the layout given by each column's type.
pub fn decode_binary_row(payload: &[u8], columns: &[Column], dest: &mut [Value]) -> Result<()> {
    let (header, data) = read_int_1(payload)?;
    if header != 0x00 {
        return Err(Error::InvalidPacket);
    }
    let (bitmap, mut data) = read_string_fix(data, NullBitmap::result_set_len(columns.len()))?;
    let null_bitmap = NullBitmap::for_result_set(bitmap);

    for (idx, (column, slot)) in columns.iter().zip(dest.iter_mut()).enumerate() {
        if null_bitmap.is_null(idx) {
            *slot = Value::Null;
            continue;
        }
        data = slot.read_binary(column.column_type, column.flags, data)?;
    }
    if !data.is_empty() {
        return Err(Error::InvalidPacket);
    }
    Ok(())
}
