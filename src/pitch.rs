use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Sharp spellings only, so a rendered pitch never contains a double sharp.
const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Most rows a piano-roll grid will draw; the capped range clamps to this.
pub const MAX_GRID_ROWS: usize = 48;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised pitch \"{0}\"")]
pub struct ParsePitchError(String);

/// A pitch is stored as its MIDI number (C4 = 60, A4 = 69).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pitch(u8);

impl Pitch {
    pub fn from_midi(midi: u8) -> Self {
        Self(midi.min(127))
    }

    pub fn midi(&self) -> u8 {
        self.0
    }

    /// Chromatic step within the octave, 0 (C) to 11 (B).
    pub fn chroma(&self) -> u8 {
        self.0 % 12
    }

    pub fn octave(&self) -> i32 {
        self.0 as i32 / 12 - 1
    }

    /// Equal-tempered frequency, A4 = 440 Hz.
    pub fn freq(&self) -> f32 {
        440.0 * 2.0_f32.powf((self.0 as f32 - 69.0) / 12.0)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAMES[self.chroma() as usize], self.octave())
    }
}

impl FromStr for Pitch {
    type Err = ParsePitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePitchError(s.to_string());
        let t = s.trim();
        let mut chars = t.chars();
        let letter = chars.next().ok_or_else(err)?;
        let mut semis: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(err()),
        };
        let rest = chars.as_str();
        let mut accidentals = 0;
        for c in rest.chars() {
            match c {
                '#' | 's' => semis += 1,
                'b' => semis -= 1,
                _ => break,
            }
            accidentals += 1;
        }
        let octave: i32 = rest[accidentals..].parse().map_err(|_| err())?;
        if !(-1..=9).contains(&octave) {
            return Err(err());
        }
        let midi = (octave + 1) * 12 + semis;
        if !(0..=127).contains(&midi) {
            return Err(err());
        }
        Ok(Self(midi as u8))
    }
}

// Settings files spell pitches the way the UI does ("C3"), not as raw MIDI
// numbers.
impl Serialize for Pitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pitch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// All semitone-spaced pitches from `high` down to `low`, both inclusive.
/// Empty when the bounds are not strictly ordered.
pub fn chromatic_range(low: Pitch, high: Pitch) -> Vec<Pitch> {
    if low.midi() >= high.midi() {
        return Vec::new();
    }
    (low.midi()..=high.midi()).rev().map(Pitch::from_midi).collect()
}

/// As [chromatic_range], but clamps the high bound down so the result fits
/// the grid's row budget. Only the renderer path uses this.
pub fn chromatic_range_capped(low: Pitch, high: Pitch) -> Vec<Pitch> {
    if low.midi() >= high.midi() {
        return Vec::new();
    }
    let capped = high
        .midi()
        .min(low.midi().saturating_add(MAX_GRID_ROWS as u8 - 1));
    chromatic_range(low, Pitch::from_midi(capped))
}
