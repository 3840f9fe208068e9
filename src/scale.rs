use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::pitch::Pitch;

/// The twenty selectable scales, all rooted on C.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    Minor,
    HarmonicMinor,
    MelodicMinor,
    PentatonicMajor,
    PentatonicMinor,
    Blues,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    Chromatic,
    WholeTone,
    DiminishedHalf,
    DiminishedWhole,
    DoubleHarmonicMinor,
    SpanishGypsy,
    Enigma,
    Prometheus,
}

impl Scale {
    /// Semitone offsets from the root. The trailing 12 closes the octave in
    /// the traditional spelling of these tables; membership tests work mod
    /// 12, so it never matches anything 0 doesn't already cover.
    pub fn steps(&self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11, 12],
            Self::Minor => &[0, 2, 3, 5, 7, 8, 10, 12],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11, 12],
            Self::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11, 12],
            Self::PentatonicMajor => &[0, 2, 4, 7, 9, 12],
            Self::PentatonicMinor => &[0, 3, 5, 7, 10, 12],
            Self::Blues => &[0, 3, 5, 6, 7, 10, 12],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10, 12],
            Self::Phrygian => &[0, 1, 3, 5, 7, 8, 10, 12],
            Self::Lydian => &[0, 2, 4, 6, 7, 9, 11, 12],
            Self::Mixolydian => &[0, 2, 4, 5, 7, 9, 10, 12],
            Self::Locrian => &[0, 1, 3, 5, 6, 8, 10, 12],
            Self::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            Self::WholeTone => &[0, 2, 4, 6, 8, 10, 12],
            Self::DiminishedHalf => &[0, 1, 3, 4, 6, 7, 9, 10, 12],
            Self::DiminishedWhole => &[0, 2, 3, 5, 6, 8, 9, 11, 12],
            Self::DoubleHarmonicMinor => &[0, 1, 4, 5, 7, 8, 11, 12],
            Self::SpanishGypsy => &[0, 1, 4, 5, 7, 8, 10, 12],
            Self::Enigma => &[0, 1, 4, 6, 8, 10, 11, 12],
            Self::Prometheus => &[0, 2, 4, 6, 9, 10, 12],
        }
    }

    pub fn admits(&self, pitch: Pitch) -> bool {
        self.steps().contains(&pitch.chroma())
    }

    /// The in-scale subset of a chromatic range, order preserved.
    pub fn filter(&self, range: &[Pitch]) -> Vec<Pitch> {
        range.iter().copied().filter(|p| self.admits(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::chromatic_range;
    use strum::IntoEnumIterator;

    #[test]
    fn names_parse_in_snake_case() {
        assert_eq!("major".parse::<Scale>().unwrap(), Scale::Major);
        assert_eq!(
            "double_harmonic_minor".parse::<Scale>().unwrap(),
            Scale::DoubleHarmonicMinor
        );
        assert!("nonsense".parse::<Scale>().is_err());
        assert_eq!(Scale::iter().count(), 20);
    }

    #[test]
    fn step_tables_are_sorted_and_octave_closed() {
        for scale in Scale::iter() {
            let steps = scale.steps();
            assert!(steps.windows(2).all(|w| w[0] < w[1]), "{scale}");
            assert_eq!(steps.first(), Some(&0), "{scale}");
            assert_eq!(steps.last(), Some(&12), "{scale}");
        }
    }

    #[test]
    fn c_major_filter_of_two_octaves() {
        let low: Pitch = "C3".parse().unwrap();
        let high: Pitch = "C5".parse().unwrap();
        let filtered = Scale::Major.filter(&chromatic_range(low, high));
        let names: Vec<String> = filtered.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            [
                "C5", "B4", "A4", "G4", "F4", "E4", "D4", "C4", "B3", "A3", "G3", "F3", "E3",
                "D3", "C3"
            ]
        );
    }

    #[test]
    fn narrow_range_can_miss_a_scale_entirely() {
        // C#4 and D4 are both skipped by the C pentatonic minor scale.
        let low: Pitch = "C#4".parse().unwrap();
        let high: Pitch = "D4".parse().unwrap();
        let filtered = Scale::PentatonicMinor.filter(&chromatic_range(low, high));
        assert!(filtered.is_empty());
    }

    #[test]
    fn chromatic_admits_everything() {
        let low: Pitch = "C3".parse().unwrap();
        let high: Pitch = "C4".parse().unwrap();
        let range = chromatic_range(low, high);
        assert_eq!(Scale::Chromatic.filter(&range).len(), range.len());
    }
}
