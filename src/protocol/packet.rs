use std::io::{BufRead, Write};

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Largest payload carried by a single packet; longer payloads continue in
/// the following packets.
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }
}

/// Read a complete MySQL payload, concatenating packets if they span multiple 16MB chunks
///
/// `sequence_id` is the id expected on the next packet and is advanced past
/// every packet read.
#[tracing::instrument(skip_all)]
pub fn read_payload<R: BufRead>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    sequence_id: &mut u8,
) -> Result<()> {
    buffer.clear();

    let mut header = PacketHeader::new_zeroed();
    loop {
        reader.read_exact(header.as_mut_bytes())?;
        if header.sequence_id != *sequence_id {
            return Err(Error::PacketOutOfSync {
                expected: *sequence_id,
                actual: header.sequence_id,
            });
        }
        *sequence_id = sequence_id.wrapping_add(1);

        let length = header.length();
        let start = buffer.len();
        buffer.resize(start + length, 0);
        reader.read_exact(&mut buffer[start..])?;

        if length < MAX_PAYLOAD_LEN {
            return Ok(());
        }
    }
}

/// Write `packet[4..]` as one or more packets, the first one carrying
/// `sequence_id` (0 for a new command).
///
/// `packet[..4]` is scratch space for the first header so that a payload
/// shorter than 16MB goes out in a single write. Returns the sequence id the
/// server's next reply will carry.
#[tracing::instrument(skip_all)]
pub fn write_payload<W: Write>(writer: &mut W, packet: &mut [u8], sequence_id: u8) -> Result<u8> {
    let (header_space, payload) = packet.split_at_mut(4);

    if payload.len() < MAX_PAYLOAD_LEN {
        header_space.copy_from_slice(PacketHeader::encode(payload.len(), sequence_id).as_bytes());
        writer.write_all(packet)?;
        writer.flush()?;
        return Ok(sequence_id.wrapping_add(1));
    }

    let mut sequence_id = sequence_id;
    let mut last_len = 0;
    for chunk in payload.chunks(MAX_PAYLOAD_LEN) {
        writer.write_all(PacketHeader::encode(chunk.len(), sequence_id).as_bytes())?;
        writer.write_all(chunk)?;
        sequence_id = sequence_id.wrapping_add(1);
        last_len = chunk.len();
    }
    // a payload that is an exact multiple of the chunk size ends with an empty packet
    if last_len == MAX_PAYLOAD_LEN {
        writer.write_all(PacketHeader::encode(0, sequence_id).as_bytes())?;
        sequence_id = sequence_id.wrapping_add(1);
    }
    writer.flush()?;
    Ok(sequence_id)
}
