use std::fmt;

use serde::{Deserialize, Serialize};

/// What a cue does to its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    /// The light does not change its current state.
    #[default]
    Hold = 0,
    /// The light turns off.
    Off = 1,
    /// The light is on or off at random, decided at playback.
    Random = 2,
    /// The light turns on.
    On = 3,
}

impl Mode {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Hold),
            1 => Some(Self::Off),
            2 => Some(Self::Random),
            3 => Some(Self::On),
            _ => None,
        }
    }

    pub fn as_digit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_digit())
    }
}
