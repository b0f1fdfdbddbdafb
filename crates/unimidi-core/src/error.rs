//! Error types for MIDI message validation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Empty MIDI message")]
    Empty,

    #[error("Expected a status byte, found data byte 0x{0:02X}")]
    MissingStatus(u8),

    #[error("Status 0x{status:02X} expects {expected} bytes, got {actual}")]
    WrongLength {
        status: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Unexpected status byte 0x{byte:02X} at offset {offset}")]
    UnexpectedStatus { byte: u8, offset: usize },

    #[error("End of exclusive (0xF7) without a preceding 0xF0")]
    StrayEndOfExclusive,

    #[error("System exclusive message not terminated by 0xF7")]
    UnterminatedSysEx,

    #[error("System exclusive message of {len} bytes exceeds limit of {max}")]
    SysExTooLong { len: usize, max: usize },

    #[error("Reserved status byte 0x{0:02X}")]
    ReservedStatus(u8),
}

pub type Result<T> = std::result::Result<T, MessageError>;
