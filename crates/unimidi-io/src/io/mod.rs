//! Open MIDI endpoints.
//!
//! Handles are created by [`MidiSystem::open_input`](crate::MidiSystem::open_input)
//! and [`MidiSystem::open_output`](crate::MidiSystem::open_output). Each one
//! owns its native connection and an exclusive claim on the port; both are
//! released on `close` or drop.

mod input;
pub(crate) mod lease;
mod output;

pub use input::InputHandle;
pub use output::OutputHandle;

use std::fmt;
use unimidi_core::PortDescriptor;

/// What to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    /// The first port of the backend.
    Default,
    /// A port from an earlier enumeration. The name at its index is
    /// re-checked before connecting.
    Port(PortDescriptor),
    /// A new port other applications can connect to.
    Virtual(String),
}

impl From<PortDescriptor> for PortSelector {
    fn from(port: PortDescriptor) -> Self {
        PortSelector::Port(port)
    }
}

impl From<&PortDescriptor> for PortSelector {
    fn from(port: &PortDescriptor) -> Self {
        PortSelector::Port(port.clone())
    }
}

/// What a handle is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Port(PortDescriptor),
    Virtual(String),
}

impl Endpoint {
    pub fn name(&self) -> &str {
        match self {
            Endpoint::Port(port) => &port.name,
            Endpoint::Virtual(name) => name,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Endpoint::Virtual(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Port(port) => write!(f, "'{}'", port.name),
            Endpoint::Virtual(name) => write!(f, "'{}' (virtual)", name),
        }
    }
}
