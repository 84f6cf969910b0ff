//! Sound catalogue identifiers

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one ambient or background track
///
/// The set is closed: every tier of [`crate::AudioSourceConfig`] is keyed by
/// it, and strings outside of it never resolve to anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    Rain,
    Ocean,
    Forest,
    River,
    Birds,
    Wind,
    Fireplace,
    Meditation,
    Piano,
    Ambient,
    /// Music played by the persistent background player
    Background,
}

impl SoundId {
    /// Every sound, in catalogue order
    pub const ALL: [SoundId; 11] = [
        SoundId::Rain,
        SoundId::Ocean,
        SoundId::Forest,
        SoundId::River,
        SoundId::Birds,
        SoundId::Wind,
        SoundId::Fireplace,
        SoundId::Meditation,
        SoundId::Piano,
        SoundId::Ambient,
        SoundId::Background,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundId::Rain => "rain",
            SoundId::Ocean => "ocean",
            SoundId::Forest => "forest",
            SoundId::River => "river",
            SoundId::Birds => "birds",
            SoundId::Wind => "wind",
            SoundId::Fireplace => "fireplace",
            SoundId::Meditation => "meditation",
            SoundId::Piano => "piano",
            SoundId::Ambient => "ambient",
            SoundId::Background => "background",
        }
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownSound(s.to_string()))
    }
}
