//! Cross-platform MIDI I/O.
//!
//! Selects among OS MIDI backends, enumerates ports, and opens input and
//! output handles that exchange validated [`MidiMessage`]s.
//!
//! Feature gates: `midi-io` (OS backends via midir), `jack` and `winrt`
//! (alternative midir backends).

pub mod error;
pub use error::{Error, Result};

pub mod backend;
pub use backend::{
    Backend, BackendError, BackendResult, DummyBackend, InputSink, LoopbackBackend, TimedMessage,
};
#[cfg(feature = "midi-io")]
pub use backend::MidirBackend;

mod config;
pub use config::{Config, IgnoreTypes, DEFAULT_CLIENT_NAME, DEFAULT_INPUT_QUEUE_SIZE};

mod registry;
pub use registry::BackendRegistry;

mod catalog;

mod io;
pub use io::{Endpoint, InputHandle, OutputHandle, PortSelector};

mod system;
pub use system::{MidiSystem, MidiSystemBuilder};

pub use unimidi_core::{
    Api, Codec, MessageError, MessageKind, MidiMessage, PortDescriptor, PortDirection,
    RunningStatusParser, Strictness,
};
