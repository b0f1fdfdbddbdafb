//! Byte-grammar validation between raw MIDI bytes and [`MidiMessage`].

use serde::{Deserialize, Serialize};

use crate::error::{MessageError, Result};
use crate::message::{Bytes, MidiMessage, SYSEX_END, SYSEX_START};

pub const DEFAULT_MAX_SYSEX_LEN: usize = 64 * 1024;

/// How undefined status bytes (0xF4, 0xF5, 0xF9, 0xFD) are treated.
///
/// Framing and length rules apply in both modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Reserved status bytes pass through as opaque messages.
    #[default]
    Permissive,
    /// Reserved status bytes are rejected.
    Strict,
}

/// Expected total length of a message by its status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Fixed(usize),
    SysEx,
    Reserved,
    StrayEnd,
}

#[inline]
pub(crate) fn framing(status: u8) -> Framing {
    debug_assert!(status >= 0x80);
    match status {
        0x80..=0xBF | 0xE0..=0xEF => Framing::Fixed(3),
        0xC0..=0xDF => Framing::Fixed(2),
        SYSEX_START => Framing::SysEx,
        0xF1 | 0xF3 => Framing::Fixed(2),
        0xF2 => Framing::Fixed(3),
        0xF6 => Framing::Fixed(1),
        SYSEX_END => Framing::StrayEnd,
        0xF4 | 0xF5 | 0xF9 | 0xFD => Framing::Reserved,
        _ => Framing::Fixed(1),
    }
}

#[inline]
pub(crate) fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// Validates complete messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codec {
    pub strictness: Strictness,
    pub max_sysex_len: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            strictness: Strictness::Permissive,
            max_sysex_len: DEFAULT_MAX_SYSEX_LEN,
        }
    }
}

impl Codec {
    pub fn new(strictness: Strictness, max_sysex_len: usize) -> Self {
        Self {
            strictness,
            max_sysex_len,
        }
    }

    pub fn strict() -> Self {
        Self {
            strictness: Strictness::Strict,
            ..Self::default()
        }
    }

    /// Validates one complete message and copies it into an owned [`MidiMessage`].
    ///
    /// Running status is not accepted here; see
    /// [`RunningStatusParser`](crate::RunningStatusParser) for streams.
    pub fn encode(&self, bytes: &[u8]) -> Result<MidiMessage> {
        self.validate(bytes)?;
        Ok(MidiMessage::from_validated(Bytes::from_slice(bytes)))
    }

    pub fn validate(&self, bytes: &[u8]) -> Result<()> {
        let (&status, data) = bytes.split_first().ok_or(MessageError::Empty)?;
        if !is_status(status) {
            return Err(MessageError::MissingStatus(status));
        }

        match framing(status) {
            Framing::Fixed(expected) => {
                check_data(data)?;
                if bytes.len() != expected {
                    return Err(MessageError::WrongLength {
                        status,
                        expected,
                        actual: bytes.len(),
                    });
                }
            }
            Framing::SysEx => self.validate_sysex(bytes)?,
            Framing::StrayEnd => return Err(MessageError::StrayEndOfExclusive),
            Framing::Reserved => {
                if self.strictness == Strictness::Strict {
                    return Err(MessageError::ReservedStatus(status));
                }
                check_data(data)?;
            }
        }
        Ok(())
    }

    fn validate_sysex(&self, bytes: &[u8]) -> Result<()> {
        let len = bytes.len();
        if len > self.max_sysex_len {
            return Err(MessageError::SysExTooLong {
                len,
                max: self.max_sysex_len,
            });
        }
        if len < 2 || bytes[len - 1] != SYSEX_END {
            // A status byte inside the payload means the SysEx was cut short.
            if let Some(offset) = bytes[1..].iter().position(|&b| is_status(b)) {
                return Err(MessageError::UnexpectedStatus {
                    byte: bytes[offset + 1],
                    offset: offset + 1,
                });
            }
            return Err(MessageError::UnterminatedSysEx);
        }
        if let Some(offset) = bytes[1..len - 1].iter().position(|&b| is_status(b)) {
            return Err(MessageError::UnexpectedStatus {
                byte: bytes[offset + 1],
                offset: offset + 1,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn decode(&self, message: &MidiMessage) -> Vec<u8> {
        message.as_bytes().to_vec()
    }

    /// Appends the message bytes to `buf` after clearing it.
    #[inline]
    pub fn decode_into(&self, message: &MidiMessage, buf: &mut Vec<u8>) {
        buf.clear();
        buf.extend_from_slice(message.as_bytes());
    }
}

fn check_data(data: &[u8]) -> Result<()> {
    match data.iter().position(|&b| is_status(b)) {
        Some(i) => Err(MessageError::UnexpectedStatus {
            byte: data[i],
            offset: i + 1,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageKind;

    #[test]
    fn test_encode_channel_messages() {
        let codec = Codec::default();
        assert_eq!(
            codec.encode(&[0x90, 0x3C, 0x7F]).unwrap(),
            crate::MidiMessage::note_on(0, 0x3C, 0x7F)
        );
        assert_eq!(codec.encode(&[0xC5, 10]).unwrap().channel(), Some(5));
        assert_eq!(
            codec.encode(&[0xF2, 0x00, 0x08]).unwrap().kind(),
            MessageKind::SongPosition(1024)
        );
        assert_eq!(codec.encode(&[0xF8]).unwrap().kind(), MessageKind::Clock);
        assert_eq!(codec.encode(&[0xF6]).unwrap().kind(), MessageKind::TuneRequest);
    }

    #[test]
    fn test_encode_rejects_empty() {
        assert_eq!(Codec::default().encode(&[]), Err(MessageError::Empty));
    }

    #[test]
    fn test_encode_rejects_leading_data_byte() {
        assert_eq!(
            Codec::default().encode(&[0x3C, 0x7F]),
            Err(MessageError::MissingStatus(0x3C))
        );
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let codec = Codec::default();
        assert_eq!(
            codec.encode(&[0x90, 0x3C]),
            Err(MessageError::WrongLength {
                status: 0x90,
                expected: 3,
                actual: 2
            })
        );
        assert!(codec.encode(&[0xC0, 1, 2]).is_err());
        assert!(codec.encode(&[0xF8, 0x00]).is_err());
    }

    #[test]
    fn test_encode_rejects_status_in_data() {
        assert_eq!(
            Codec::default().encode(&[0x90, 0x3C, 0x80]),
            Err(MessageError::UnexpectedStatus {
                byte: 0x80,
                offset: 2
            })
        );
    }

    #[test]
    fn test_sysex_framing_rules() {
        let codec = Codec::default();
        assert!(codec.encode(&[0xF0, 0x43, 0x12, 0xF7]).is_ok());
        assert!(codec.encode(&[0xF0, 0xF7]).is_ok());
        assert_eq!(
            codec.encode(&[0xF0, 0x43, 0x12]),
            Err(MessageError::UnterminatedSysEx)
        );
        assert_eq!(codec.encode(&[0xF0]), Err(MessageError::UnterminatedSysEx));
        assert_eq!(
            codec.encode(&[0xF0, 0x43, 0x90, 0xF7]),
            Err(MessageError::UnexpectedStatus {
                byte: 0x90,
                offset: 2
            })
        );
        assert_eq!(codec.encode(&[0xF7]), Err(MessageError::StrayEndOfExclusive));
    }

    #[test]
    fn test_sysex_length_limit() {
        let codec = Codec::new(Strictness::Permissive, 8);
        let mut long = vec![0xF0];
        long.extend(std::iter::repeat(0x01).take(7));
        long.push(0xF7);
        assert_eq!(
            codec.encode(&long),
            Err(MessageError::SysExTooLong { len: 9, max: 8 })
        );
        // Missing terminator within the limit is still reported as truncated
        assert_eq!(
            codec.encode(&long[..8]),
            Err(MessageError::UnterminatedSysEx)
        );
    }

    #[test]
    fn test_reserved_status_depends_on_strictness() {
        let permissive = Codec::default();
        let msg = permissive.encode(&[0xF9]).unwrap();
        assert_eq!(msg.kind(), MessageKind::Reserved(&[0xF9]));
        assert!(permissive.encode(&[0xF4, 0x01, 0x02]).is_ok());

        let strict = Codec::strict();
        assert_eq!(strict.encode(&[0xFD]), Err(MessageError::ReservedStatus(0xFD)));
        assert_eq!(strict.encode(&[0xF5, 0x01]), Err(MessageError::ReservedStatus(0xF5)));
    }

    #[test]
    fn test_decode_into_reuses_buffer() {
        let codec = Codec::default();
        let mut scratch = vec![0xAA; 16];
        let msg = codec.encode(&[0xB0, 7, 100]).unwrap();
        codec.decode_into(&msg, &mut scratch);
        assert_eq!(scratch, vec![0xB0, 7, 100]);
    }

    #[test]
    fn test_encode_copies_input() {
        let codec = Codec::default();
        let mut scratch = vec![0x90, 0x3C, 0x7F];
        let msg = codec.encode(&scratch).unwrap();
        scratch[1] = 0x40;
        assert_eq!(msg.as_bytes(), &[0x90, 0x3C, 0x7F]);
    }
}
