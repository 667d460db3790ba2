use thiserror::Error;

use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

pub use color_eyre::eyre::eyre;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    /// No live transport is attached to the result set or connection.
    #[error("Invalid connection")]
    InvalidConn,

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Packet out of sync: expected sequence id {expected}, got {actual}")]
    PacketOutOfSync { expected: u8, actual: u8 },

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    /// Returns true if the connection must not be used for another command.
    ///
    /// A server error leaves the stream aligned; everything that means bytes
    /// were lost or misread does not.
    pub fn is_conn_broken(&self) -> bool {
        match self {
            Error::IoError(_)
            | Error::InvalidConn
            | Error::InvalidPacket
            | Error::UnexpectedEof
            | Error::PacketOutOfSync { .. }
            | Error::LibraryBug(_) => true,
            Error::ServerError(_) | Error::BadConfigError(_) | Error::BadUsageError(_) => false,
        }
    }

    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Error::LibraryBug(eyre!("{:?}", err))
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes<'a>) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl<Src, Dst: ?Sized> From<zerocopy::error::SizeError<Src, Dst>> for Error {
    fn from(_: zerocopy::error::SizeError<Src, Dst>) -> Self {
        Error::UnexpectedEof
    }
}

pub type Result<T> = std::result::Result<T, Error>;
