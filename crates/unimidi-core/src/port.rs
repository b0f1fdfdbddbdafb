//! Port descriptors produced by enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a port an application uses.
///
/// `Readable` ports deliver messages to us (MIDI inputs), `Writable` ports
/// accept messages from us (MIDI outputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Readable,
    Writable,
}

impl PortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Readable => "readable",
            PortDirection::Writable => "writable",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A port as seen in one enumeration snapshot.
///
/// `index` is only meaningful against the snapshot that produced it; any
/// hot-plug event may shift it. Opening re-checks the name at that index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub name: String,
    pub index: usize,
    pub direction: PortDirection,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, index: usize, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            index,
            direction,
        }
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.direction == PortDirection::Readable
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.direction == PortDirection::Writable
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.direction)
    }
}
