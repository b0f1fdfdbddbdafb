//! MIDI backend identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An OS-level MIDI subsystem.
///
/// Numeric codes follow RtMidi's enumeration so values exchanged with other
/// tools keep their meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,
    #[serde(rename = "core")]
    CoreMidi,
    Alsa,
    Jack,
    #[serde(rename = "winmm")]
    WindowsMm,
    #[serde(rename = "winuwp")]
    WindowsUwp,
    Dummy,
}

impl Api {
    pub const ALL: [Api; 7] = [
        Api::Unspecified,
        Api::CoreMidi,
        Api::Alsa,
        Api::Jack,
        Api::WindowsMm,
        Api::WindowsUwp,
        Api::Dummy,
    ];

    #[inline]
    pub fn code(self) -> i32 {
        match self {
            Api::Unspecified => 0,
            Api::CoreMidi => 1,
            Api::Alsa => 2,
            Api::Jack => 3,
            Api::WindowsMm => 4,
            Api::WindowsUwp => 5,
            Api::Dummy => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|api| api.code() == code)
    }

    /// Short identifier, e.g. `"alsa"`. Empty for [`Api::Unspecified`].
    pub fn name(self) -> &'static str {
        match self {
            Api::Unspecified => "",
            Api::CoreMidi => "core",
            Api::Alsa => "alsa",
            Api::Jack => "jack",
            Api::WindowsMm => "winmm",
            Api::WindowsUwp => "winuwp",
            Api::Dummy => "dummy",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Api::Unspecified => "Unknown",
            Api::CoreMidi => "CoreMidi",
            Api::Alsa => "ALSA",
            Api::Jack => "Jack",
            Api::WindowsMm => "Windows MultiMedia",
            Api::WindowsUwp => "Windows UWP",
            Api::Dummy => "Dummy",
        }
    }

    /// Case-insensitive lookup by short identifier. Never returns `Unspecified`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|api| api.name().eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn is_specified(self) -> bool {
        self != Api::Unspecified
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
