//! Stateful parser for raw MIDI byte streams.
//!
//! Handles running status, SysEx split across chunks and real-time bytes
//! interleaved anywhere in the stream. Every emitted message is normalized:
//! it always starts with its status byte.

use crate::codec::{framing, is_status, Codec, Framing, Strictness};
use crate::error::{MessageError, Result};
use crate::message::{Bytes, MidiMessage, CLOCK, SYSEX_END, SYSEX_START};

#[derive(Debug, Clone)]
pub struct RunningStatusParser {
    codec: Codec,
    running: Option<u8>,
    pending: Bytes,
    in_sysex: bool,
    /// Oversized SysEx: swallow bytes until the next status byte.
    skipping_sysex: bool,
}

impl Default for RunningStatusParser {
    fn default() -> Self {
        Self::new(Codec::default())
    }
}

impl RunningStatusParser {
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            running: None,
            pending: Bytes::new(),
            in_sysex: false,
            skipping_sysex: false,
        }
    }

    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running
    }

    /// True while a partial message is buffered.
    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn reset(&mut self) {
        self.running = None;
        self.pending.clear();
        self.in_sysex = false;
        self.skipping_sysex = false;
    }

    /// Parses a chunk and collects the results.
    pub fn parse(&mut self, bytes: &[u8]) -> Vec<Result<MidiMessage>> {
        let mut out = Vec::new();
        self.feed(bytes, |result| out.push(result));
        out
    }

    /// Feeds a chunk, calling `emit` for every complete message or error.
    ///
    /// Partial messages stay buffered until a later chunk completes them.
    pub fn feed(&mut self, bytes: &[u8], mut emit: impl FnMut(Result<MidiMessage>)) {
        for &byte in bytes {
            self.push_byte(byte, &mut emit);
        }
    }

    fn push_byte(&mut self, byte: u8, emit: &mut impl FnMut(Result<MidiMessage>)) {
        if byte >= CLOCK {
            emit(self.realtime(byte));
            return;
        }

        if self.skipping_sysex {
            if !is_status(byte) {
                return;
            }
            self.skipping_sysex = false;
            if byte == SYSEX_END {
                return;
            }
        }

        if self.in_sysex {
            if byte == SYSEX_END {
                self.pending.push(byte);
                self.in_sysex = false;
                emit(self.codec.encode(&self.pending));
                self.pending.clear();
                return;
            }
            if is_status(byte) {
                self.in_sysex = false;
                self.pending.clear();
                emit(Err(MessageError::UnterminatedSysEx));
            } else {
                self.pending.push(byte);
                // Leave room for the terminator.
                if self.pending.len() + 1 > self.codec.max_sysex_len {
                    let len = self.pending.len() + 1;
                    self.in_sysex = false;
                    self.skipping_sysex = true;
                    self.pending.clear();
                    emit(Err(MessageError::SysExTooLong {
                        len,
                        max: self.codec.max_sysex_len,
                    }));
                }
                return;
            }
        }

        if is_status(byte) {
            self.start_message(byte, emit);
        } else {
            self.push_data(byte, emit);
        }
    }

    fn realtime(&self, byte: u8) -> Result<MidiMessage> {
        if framing(byte) == Framing::Reserved && self.codec.strictness == Strictness::Strict {
            return Err(MessageError::ReservedStatus(byte));
        }
        Ok(MidiMessage::from_validated(Bytes::from_slice(&[byte])))
    }

    fn start_message(&mut self, status: u8, emit: &mut impl FnMut(Result<MidiMessage>)) {
        if let Some(&incomplete) = self.pending.first() {
            if let Framing::Fixed(expected) = framing(incomplete) {
                emit(Err(MessageError::WrongLength {
                    status: incomplete,
                    expected,
                    actual: self.pending.len(),
                }));
            }
            self.pending.clear();
        }

        match framing(status) {
            Framing::SysEx => {
                self.running = None;
                self.in_sysex = true;
                self.pending.push(status);
            }
            Framing::StrayEnd => {
                self.running = None;
                emit(Err(MessageError::StrayEndOfExclusive));
            }
            Framing::Reserved => {
                self.running = None;
                emit(self.codec.encode(&[status]));
            }
            Framing::Fixed(len) => {
                if status < SYSEX_START {
                    self.running = Some(status);
                } else {
                    self.running = None;
                }
                self.pending.push(status);
                if len == 1 {
                    self.complete(emit);
                }
            }
        }
    }

    fn push_data(&mut self, byte: u8, emit: &mut impl FnMut(Result<MidiMessage>)) {
        if self.pending.is_empty() {
            match self.running {
                Some(status) => self.pending.push(status),
                None => {
                    emit(Err(MessageError::MissingStatus(byte)));
                    return;
                }
            }
        }
        self.pending.push(byte);
        if let Framing::Fixed(expected) = framing(self.pending[0]) {
            if self.pending.len() == expected {
                self.complete(emit);
            }
        }
    }

    fn complete(&mut self, emit: &mut impl FnMut(Result<MidiMessage>)) {
        emit(self.codec.encode(&self.pending));
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageKind;

    fn ok_bytes(results: Vec<Result<MidiMessage>>) -> Vec<Vec<u8>> {
        results
            .into_iter()
            .map(|r| r.expect("unexpected parse error").into_vec())
            .collect()
    }

    #[test]
    fn test_channel_messages_buffer_inline() {
        let mut parser = RunningStatusParser::default();
        assert!(parser.parse(&[0x90, 0x3C]).is_empty());
        assert!(!parser.pending.spilled());
        assert_eq!(parser.parse(&[0x7F]).len(), 1);
        assert!(!parser.pending.spilled());
    }

    #[test]
    fn test_running_status_is_expanded() {
        let mut parser = RunningStatusParser::default();
        let out = ok_bytes(parser.parse(&[0x90, 60, 100, 62, 100, 64, 0]));
        assert_eq!(
            out,
            vec![vec![0x90, 60, 100], vec![0x90, 62, 100], vec![0x90, 64, 0]]
        );
        assert_eq!(parser.running_status(), Some(0x90));
    }

    #[test]
    fn test_two_byte_running_status() {
        let mut parser = RunningStatusParser::default();
        let out = ok_bytes(parser.parse(&[0xC1, 5, 6, 7]));
        assert_eq!(out, vec![vec![0xC1, 5], vec![0xC1, 6], vec![0xC1, 7]]);
    }

    #[test]
    fn test_message_split_across_chunks() {
        let mut parser = RunningStatusParser::default();
        assert!(parser.parse(&[0xB0, 7]).is_empty());
        assert!(parser.has_pending());
        let out = ok_bytes(parser.parse(&[99]));
        assert_eq!(out, vec![vec![0xB0, 7, 99]]);
        assert!(!parser.has_pending());
    }

    #[test]
    fn test_realtime_interleaves_without_breaking_running_status() {
        let mut parser = RunningStatusParser::default();
        let out = ok_bytes(parser.parse(&[0x90, 60, 0xF8, 100, 61, 0xFA, 101]));
        assert_eq!(
            out,
            vec![
                vec![0xF8],
                vec![0x90, 60, 100],
                vec![0xFA],
                vec![0x90, 61, 101],
            ]
        );
    }

    #[test]
    fn test_sysex_across_chunks_with_realtime() {
        let mut parser = RunningStatusParser::default();
        assert!(parser.parse(&[0xF0, 0x43, 0x10]).is_empty());
        let out = parser.parse(&[0xF8, 0x4C, 0xF7]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().kind(), MessageKind::Clock);
        assert_eq!(
            out[1].as_ref().unwrap().as_bytes(),
            &[0xF0, 0x43, 0x10, 0x4C, 0xF7]
        );
    }

    #[test]
    fn test_system_common_clears_running_status() {
        let mut parser = RunningStatusParser::default();
        let out = parser.parse(&[0x90, 60, 100, 0xF3, 2, 61, 100]);
        assert_eq!(out[0].as_ref().unwrap().as_bytes(), &[0x90, 60, 100]);
        assert_eq!(out[1].as_ref().unwrap().kind(), MessageKind::SongSelect(2));
        assert_eq!(out[2], Err(MessageError::MissingStatus(61)));
        assert_eq!(out[3], Err(MessageError::MissingStatus(100)));
    }

    #[test]
    fn test_leading_data_without_running_status() {
        let mut parser = RunningStatusParser::default();
        assert_eq!(parser.parse(&[0x3C]), vec![Err(MessageError::MissingStatus(0x3C))]);
    }

    #[test]
    fn test_interrupted_message_reports_wrong_length() {
        let mut parser = RunningStatusParser::default();
        let out = parser.parse(&[0x90, 60, 0x80, 60, 0]);
        assert_eq!(
            out[0],
            Err(MessageError::WrongLength {
                status: 0x90,
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(out[1].as_ref().unwrap().as_bytes(), &[0x80, 60, 0]);
    }

    #[test]
    fn test_sysex_interrupted_by_status() {
        let mut parser = RunningStatusParser::default();
        let out = parser.parse(&[0xF0, 0x01, 0x02, 0x90, 60, 100]);
        assert_eq!(out[0], Err(MessageError::UnterminatedSysEx));
        assert_eq!(out[1].as_ref().unwrap().as_bytes(), &[0x90, 60, 100]);
    }

    #[test]
    fn test_oversized_sysex_is_skipped() {
        let mut parser = RunningStatusParser::new(Codec::new(Strictness::Permissive, 4));
        let out = parser.parse(&[0xF0, 1, 2, 3, 4, 5, 0xF7, 0xF6]);
        assert_eq!(out[0], Err(MessageError::SysExTooLong { len: 5, max: 4 }));
        assert_eq!(out[1].as_ref().unwrap().kind(), MessageKind::TuneRequest);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_strict_rejects_reserved_realtime() {
        let mut parser = RunningStatusParser::new(Codec::strict());
        assert_eq!(parser.parse(&[0xFD]), vec![Err(MessageError::ReservedStatus(0xFD))]);

        let mut permissive = RunningStatusParser::default();
        assert!(permissive.parse(&[0xFD])[0].is_ok());
    }
}
