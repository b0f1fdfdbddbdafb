//! # unimidi - Cross-platform MIDI I/O
//!
//! One API over the operating system MIDI subsystems.
//!
//! ## Architecture
//!
//! unimidi is an umbrella crate that coordinates:
//! - **unimidi-core** - Message types, validation codec, running-status parser
//! - **unimidi-io** - Backend selection, port enumeration, input and output handles
//!
//! ## Quick Start
//!
//! ```no_run
//! use unimidi::prelude::*;
//!
//! let midi = MidiSystem::global();
//! println!("Backends: {:?}", midi.available_apis());
//!
//! let mut out = midi.open_output(PortSelector::Default, None, None)?;
//! out.send(&MidiMessage::note_on(0, 60, 100))?;
//! # Ok::<(), unimidi::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `midi-io` (default) - OS backends via midir
//! - `jack` - JACK instead of the platform default on Unix
//! - `winrt` - WinRT instead of WinMM on Windows
//!
//! Without `midi-io` only the loopback and dummy backends exist.

/// Re-export of unimidi-core for direct access
pub use unimidi_core as core;

/// Re-export of unimidi-io for direct access
pub use unimidi_io as io;

// Messages and codec
pub use unimidi_core::{
    message, Api, Codec, MessageError, MessageKind, MidiMessage, PortDescriptor, PortDirection,
    RunningStatusParser, Strictness, DEFAULT_MAX_SYSEX_LEN,
};

// Backends and handles
pub use unimidi_io::{
    Backend, BackendError, BackendRegistry, Config, DummyBackend, Endpoint, Error, IgnoreTypes,
    InputHandle, InputSink, LoopbackBackend, MidiSystem, MidiSystemBuilder, OutputHandle,
    PortSelector, Result, TimedMessage,
};

#[cfg(feature = "midi-io")]
pub use unimidi_io::MidirBackend;

/// Available API names, in the order backends are tried by default.
///
/// Shorthand for [`MidiSystem::global`]`().available_apis()`.
pub fn available_apis() -> Vec<Api> {
    MidiSystem::global().available_apis()
}

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        Api, Error, IgnoreTypes, InputHandle, MessageKind, MidiMessage, MidiSystem,
        OutputHandle, PortDescriptor, PortDirection, PortSelector, Result, TimedMessage,
    };
}
