//! Validated MIDI messages and their typed view.

use smallvec::SmallVec;
use std::fmt;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_BEND: u8 = 0xE0;
pub const SYSEX_START: u8 = 0xF0;
pub const TIME_CODE: u8 = 0xF1;
pub const SONG_POSITION: u8 = 0xF2;
pub const SONG_SELECT: u8 = 0xF3;
pub const TUNE_REQUEST: u8 = 0xF6;
pub const SYSEX_END: u8 = 0xF7;
pub const CLOCK: u8 = 0xF8;
pub const TICK: u8 = 0xF9;
pub const START: u8 = 0xFA;
pub const CONTINUE: u8 = 0xFB;
pub const STOP: u8 = 0xFC;
pub const ACTIVE_SENSING: u8 = 0xFE;
pub const RESET: u8 = 0xFF;

pub(crate) type Bytes = SmallVec<[u8; 3]>;

/// An owned MIDI message whose bytes passed [`Codec`](crate::Codec) validation.
///
/// Bytes are copied in on construction and never shared with the caller, so
/// scratch buffers can be reused freely after encoding or sending.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    bytes: Bytes,
}

/// Typed view over a [`MidiMessage`]. Channels are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind<'a> {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyPressure { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, control: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, 8192 is centre.
    PitchBend { channel: u8, value: u16 },
    /// Payload between 0xF0 and 0xF7.
    SysEx(&'a [u8]),
    TimeCodeQuarterFrame(u8),
    SongPosition(u16),
    SongSelect(u8),
    TuneRequest,
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
    /// Undefined status (0xF4, 0xF5, 0xF9, 0xFD) with any trailing data.
    Reserved(&'a [u8]),
}

impl MidiMessage {
    #[inline]
    pub(crate) fn from_validated(bytes: Bytes) -> Self {
        debug_assert!(!bytes.is_empty());
        Self { bytes }
    }

    #[inline]
    fn channel_message(status: u8, channel: u8, data: &[u8]) -> Self {
        let mut bytes = Bytes::new();
        bytes.push(status | channel.min(15));
        bytes.extend(data.iter().map(|b| b & 0x7F));
        Self::from_validated(bytes)
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_message(NOTE_ON, channel, &[note, velocity])
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_message(NOTE_OFF, channel, &[note, velocity])
    }

    pub fn poly_pressure(channel: u8, note: u8, pressure: u8) -> Self {
        Self::channel_message(POLY_PRESSURE, channel, &[note, pressure])
    }

    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::channel_message(CONTROL_CHANGE, channel, &[control, value])
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::channel_message(PROGRAM_CHANGE, channel, &[program])
    }

    pub fn channel_pressure(channel: u8, pressure: u8) -> Self {
        Self::channel_message(CHANNEL_PRESSURE, channel, &[pressure])
    }

    /// `value`: signed 14-bit (-8192 to 8191).
    pub fn pitch_bend(channel: u8, value: i16) -> Self {
        let unsigned = (value as i32 + 8192).clamp(0, 16383) as u16;
        let lsb = (unsigned & 0x7F) as u8;
        let msb = ((unsigned >> 7) & 0x7F) as u8;
        Self::channel_message(PITCH_BEND, channel, &[lsb, msb])
    }

    /// Frames `payload` with 0xF0 .. 0xF7. Payload bytes are masked to 7 bits.
    pub fn sysex(payload: &[u8]) -> Self {
        let mut bytes = Bytes::with_capacity(payload.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend(payload.iter().map(|b| b & 0x7F));
        bytes.push(SYSEX_END);
        Self::from_validated(bytes)
    }

    /// Single-byte real-time message. Returns `None` for non real-time bytes.
    pub fn realtime(status: u8) -> Option<Self> {
        match status {
            CLOCK | START | CONTINUE | STOP | ACTIVE_SENSING | RESET => {
                Some(Self::from_validated(SmallVec::from_slice(&[status])))
            }
            _ => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.into_vec()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; kept for API symmetry with slices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    /// 0-based channel for channel voice messages.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        let status = self.status();
        (status < SYSEX_START).then_some(status & 0x0F)
    }

    #[inline]
    pub fn is_sysex(&self) -> bool {
        self.status() == SYSEX_START
    }

    /// MIDI time code, clock and tick messages.
    #[inline]
    pub fn is_timing(&self) -> bool {
        matches!(self.status(), TIME_CODE | CLOCK | TICK)
    }

    #[inline]
    pub fn is_active_sensing(&self) -> bool {
        self.status() == ACTIVE_SENSING
    }

    #[inline]
    pub fn is_realtime(&self) -> bool {
        self.status() >= CLOCK
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind(), MessageKind::NoteOn { velocity, .. } if velocity > 0)
    }

    /// Note off, or note on with velocity 0.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.kind(),
            MessageKind::NoteOff { .. } | MessageKind::NoteOn { velocity: 0, .. }
        )
    }

    pub fn note(&self) -> Option<u8> {
        match self.kind() {
            MessageKind::NoteOn { note, .. }
            | MessageKind::NoteOff { note, .. }
            | MessageKind::PolyPressure { note, .. } => Some(note),
            _ => None,
        }
    }

    pub fn velocity(&self) -> Option<u8> {
        match self.kind() {
            MessageKind::NoteOn { velocity, .. } | MessageKind::NoteOff { velocity, .. } => {
                Some(velocity)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> MessageKind<'_> {
        let b = self.as_bytes();
        let status = b[0];
        let channel = status & 0x0F;
        let d1 = b.get(1).copied().unwrap_or(0);
        let d2 = b.get(2).copied().unwrap_or(0);
        match status & 0xF0 {
            NOTE_OFF => MessageKind::NoteOff {
                channel,
                note: d1,
                velocity: d2,
            },
            NOTE_ON => MessageKind::NoteOn {
                channel,
                note: d1,
                velocity: d2,
            },
            POLY_PRESSURE => MessageKind::PolyPressure {
                channel,
                note: d1,
                pressure: d2,
            },
            CONTROL_CHANGE => MessageKind::ControlChange {
                channel,
                control: d1,
                value: d2,
            },
            PROGRAM_CHANGE => MessageKind::ProgramChange {
                channel,
                program: d1,
            },
            CHANNEL_PRESSURE => MessageKind::ChannelPressure {
                channel,
                pressure: d1,
            },
            PITCH_BEND => MessageKind::PitchBend {
                channel,
                value: (d1 as u16) | ((d2 as u16) << 7),
            },
            _ => match status {
                SYSEX_START => MessageKind::SysEx(&b[1..b.len() - 1]),
                TIME_CODE => MessageKind::TimeCodeQuarterFrame(d1),
                SONG_POSITION => MessageKind::SongPosition((d1 as u16) | ((d2 as u16) << 7)),
                SONG_SELECT => MessageKind::SongSelect(d1),
                TUNE_REQUEST => MessageKind::TuneRequest,
                CLOCK => MessageKind::Clock,
                START => MessageKind::Start,
                CONTINUE => MessageKind::Continue,
                STOP => MessageKind::Stop,
                ACTIVE_SENSING => MessageKind::ActiveSensing,
                RESET => MessageKind::Reset,
                _ => MessageKind::Reserved(b),
            },
        }
    }
}

impl AsRef<[u8]> for MidiMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MidiMessage(")?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02X}")?;
        }
        write!(f, ")")
    }
}
