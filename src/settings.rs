use std::fs::OpenOptions;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;
use crate::player::Instrument;
use crate::scale::Scale;

pub const TEMPO_RANGE: RangeInclusive<f32> = 40.0..=240.0;

/// The user-facing knobs, loadable from and savable to a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub low: Pitch,
    pub high: Pitch,
    pub tempo: f32,
    pub scale: Scale,
    pub instrument: Instrument,
    pub click: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            low: Pitch::from_midi(48),  // C3
            high: Pitch::from_midi(72), // C5
            tempo: 120.0,
            scale: Scale::Major,
            instrument: Instrument::ElectricPiano,
            click: true,
        }
    }
}

impl Settings {
    pub fn from_file(p: &str) -> anyhow::Result<Self> {
        let f = OpenOptions::new().read(true).open(p)?;
        let rv = serde_yaml::from_reader(f)?;
        Ok(rv)
    }

    pub fn save(&self, p: &str) -> anyhow::Result<()> {
        let f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(p)?;
        serde_yaml::to_writer(f, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_startup_state() {
        let s = Settings::default();
        assert_eq!(s.low.to_string(), "C3");
        assert_eq!(s.high.to_string(), "C5");
        assert_eq!(s.tempo, 120.0);
        assert_eq!(s.scale, Scale::Major);
        assert_eq!(s.instrument, Instrument::ElectricPiano);
        assert!(s.click);
    }

    #[test]
    fn yaml_round_trip_keeps_pitch_spellings() {
        let mut s = Settings::default();
        s.low = "F#2".parse().unwrap();
        s.scale = Scale::SpanishGypsy;
        s.instrument = Instrument::BassSynth;
        let text = serde_yaml::to_string(&s).unwrap();
        assert!(text.contains("F#2"), "{text}");
        assert!(text.contains("spanish_gypsy"), "{text}");
        let back: Settings = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.low, s.low);
        assert_eq!(back.scale, s.scale);
        assert_eq!(back.instrument, s.instrument);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let s: Settings = serde_yaml::from_str("tempo: 90\nscale: blues\n").unwrap();
        assert_eq!(s.tempo, 90.0);
        assert_eq!(s.scale, Scale::Blues);
        assert_eq!(s.low.to_string(), "C3");
    }
}
