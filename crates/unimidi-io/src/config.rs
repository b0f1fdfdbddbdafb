//! Process-level configuration, fixed once backends are loaded.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use unimidi_core::{Api, Codec, MidiMessage, Strictness, DEFAULT_MAX_SYSEX_LEN};

pub const DEFAULT_INPUT_QUEUE_SIZE: usize = 100;
pub const DEFAULT_CLIENT_NAME: &str = "unimidi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backends tried first, in this order. The rest follow in registry order.
    pub preferred_apis: Vec<Api>,
    /// Backends never loaded, even when compiled in.
    pub disallowed_apis: Vec<Api>,
    pub allow_virtual_ports: bool,
    /// Handed to each backend's load hook, e.g. to locate a shared library.
    pub backend_search_paths: Vec<PathBuf>,
    pub client_name: String,
    pub strictness: Strictness,
    pub max_sysex_len: usize,
    /// Per-handle capacity of the input queue.
    pub input_queue_size: usize,
    /// Initial filter for new input handles.
    pub ignore: IgnoreTypes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_apis: Vec::new(),
            disallowed_apis: Vec::new(),
            allow_virtual_ports: true,
            backend_search_paths: Vec::new(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            strictness: Strictness::Permissive,
            max_sysex_len: DEFAULT_MAX_SYSEX_LEN,
            input_queue_size: DEFAULT_INPUT_QUEUE_SIZE,
            ignore: IgnoreTypes::default(),
        }
    }
}

impl Config {
    pub fn codec(&self) -> Codec {
        Codec::new(self.strictness, self.max_sysex_len)
    }

    #[inline]
    pub fn is_disallowed(&self, api: Api) -> bool {
        self.disallowed_apis.contains(&api)
    }
}

/// Message classes an input handle discards before queueing.
///
/// All three are dropped by default, matching what most hardware users want.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreTypes {
    pub sysex: bool,
    /// MIDI time code, clock and tick.
    pub time: bool,
    pub active_sensing: bool,
}

impl Default for IgnoreTypes {
    fn default() -> Self {
        Self::ALL
    }
}

impl IgnoreTypes {
    pub const NONE: IgnoreTypes = IgnoreTypes {
        sysex: false,
        time: false,
        active_sensing: false,
    };

    pub const ALL: IgnoreTypes = IgnoreTypes {
        sysex: true,
        time: true,
        active_sensing: true,
    };

    pub fn ignores(&self, message: &MidiMessage) -> bool {
        (self.sysex && message.is_sysex())
            || (self.time && message.is_timing())
            || (self.active_sensing && message.is_active_sensing())
    }

    pub(crate) fn to_bits(self) -> u8 {
        (self.sysex as u8) | (self.time as u8) << 1 | (self.active_sensing as u8) << 2
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        Self {
            sysex: bits & 0b001 != 0,
            time: bits & 0b010 != 0,
            active_sensing: bits & 0b100 != 0,
        }
    }
}
