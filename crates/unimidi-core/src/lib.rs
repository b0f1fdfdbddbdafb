//! Core MIDI types shared by every unimidi backend.
//!
//! Pure data and validation: backend identifiers ([`Api`]), enumeration
//! snapshots ([`PortDescriptor`]), validated messages ([`MidiMessage`]) and the
//! byte-grammar [`Codec`] with its stream counterpart [`RunningStatusParser`].
//! Nothing here performs I/O.
//!
//! # Example
//!
//! ```
//! use unimidi_core::{Codec, MessageKind};
//!
//! let codec = Codec::default();
//! let msg = codec.encode(&[0x90, 0x3C, 0x7F]).unwrap();
//! assert!(matches!(msg.kind(), MessageKind::NoteOn { note: 0x3C, .. }));
//! assert_eq!(codec.decode(&msg), vec![0x90, 0x3C, 0x7F]);
//! ```

pub mod error;
pub use error::{MessageError, Result};

mod api;
pub use api::Api;

mod port;
pub use port::{PortDescriptor, PortDirection};

pub mod message;
pub use message::{MessageKind, MidiMessage};

mod codec;
pub use codec::{Codec, Strictness, DEFAULT_MAX_SYSEX_LEN};

mod parser;
pub use parser::RunningStatusParser;
