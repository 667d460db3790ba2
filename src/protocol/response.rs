use crate::constant::{CapabilityFlags, StatusFlags};
use crate::error::{Error, Result};
use crate::protocol::packet::MAX_PAYLOAD_LEN;
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// OK packet payload, header `0x00` (or `0xFE` when it terminates a result set)
#[derive(Debug)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

/// ERR packet payload, header `0xFF`
#[derive(Debug)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// OK packet response
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: StatusFlags,
    pub warnings: u16,
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (last_insert_id, rest) = read_int_lenenc(rest)?;
        let (status_flags, rest) = read_int_2(rest)?;
        let (warnings, _info) = read_int_2(rest)?;

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: StatusFlags::from_bits_truncate(status_flags),
            warnings,
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        // Check for SQL state marker '#'
        let (sql_state, rest) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state_bytes, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state_bytes).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

/// EOF packet response
///
/// Layout matches MySQL wire protocol after header byte 0xFE:
/// - warnings: 2 bytes (little-endian)
/// - status_flags: 2 bytes (little-endian)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    pub warnings: U16LE,
    pub status_flags: U16LE,
}

impl EofPacket {
    pub fn status_flags(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.status_flags.get())
    }
}

/// Read EOF packet (header byte 0xFE, length < 9)
pub fn read_eof_packet(payload: &[u8]) -> Result<EofPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }
    let (eof, _rest) = read_string_fix(data, 4)?;
    Ok(EofPacket::read_from_bytes(eof)?)
}

/// Whether `payload` ends the rows of a result set.
///
/// Without `CLIENT_DEPRECATE_EOF` the terminator is an EOF packet. With it,
/// the server sends an OK packet with header `0xFE` instead; a row can only
/// start with `0xFE` when its first field is longer than the packet limit, so
/// the length tells the two apart.
pub fn is_result_set_terminator(payload: &[u8], capabilities: CapabilityFlags) -> bool {
    match payload.first() {
        Some(0xFE) if capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF) => {
            payload.len() < MAX_PAYLOAD_LEN
        }
        Some(0xFE) => payload.len() < 9,
        _ => false,
    }
}

/// Status flags carried by a result set terminator
pub fn read_terminator_status(payload: &[u8], capabilities: CapabilityFlags) -> Result<StatusFlags> {
    if capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF) {
        Ok(OkPayload::try_from(OkPayloadBytes(payload))?.status_flags)
    } else {
        Ok(read_eof_packet(payload)?.status_flags())
    }
}
