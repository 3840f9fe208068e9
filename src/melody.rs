use std::fmt;

use fundsp::funutd::Rnd;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pitch::{self, Pitch};
use crate::scale::Scale;

/// Four measures of 4/4, counted in sixteenth notes.
pub const TOTAL_SIXTEENTHS: usize = 64;

/// The fill loop always terminates well before this; the ceiling only
/// guards against a future change breaking that.
const MAX_ITERATIONS: usize = TOTAL_SIXTEENTHS + 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Invalid range: low pitch must be strictly below high pitch.")]
    InvalidRange,
    #[error("Scale contains no notes in range.")]
    EmptyScale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationUnit {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 5] = [
        Self::Whole,
        Self::Half,
        Self::Quarter,
        Self::Eighth,
        Self::Sixteenth,
    ];

    /// Size in sixteenth-note units.
    pub fn sixteenths(&self) -> usize {
        match self {
            Self::Whole => 16,
            Self::Half => 8,
            Self::Quarter => 4,
            Self::Eighth => 2,
            Self::Sixteenth => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Whole => "Whole",
            Self::Half => "Half",
            Self::Quarter => "Quarter",
            Self::Eighth => "Eighth",
            Self::Sixteenth => "16th",
        }
    }

    /// Sounding length at the given tempo.
    pub fn seconds(&self, bpm: f32) -> f64 {
        self.sixteenths() as f64 * 60.0 / (bpm as f64 * 4.0)
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A sixteenth-unit offset broken into the measure:beat:sixteenth address
/// the transport schedules by. Fixed 4/4 meter, four sixteenths per beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePosition {
    pub measure: usize,
    pub beat: usize,
    pub sixteenth: usize,
}

impl TimePosition {
    pub fn from_sixteenths(s: usize) -> Self {
        Self {
            measure: s / 16,
            beat: (s % 16) / 4,
            sixteenth: (s % 16) % 4,
        }
    }

    pub fn to_sixteenths(&self) -> usize {
        self.measure * 16 + self.beat * 4 + self.sixteenth
    }
}

impl fmt::Display for TimePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.measure, self.beat, self.sixteenth)
    }
}

/// One generated note. `index` is the stable 0-based generation-order id
/// the renderer uses to correlate playback highlights.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub duration: DurationUnit,
    pub start: usize,
    pub index: usize,
}

impl NoteEvent {
    pub fn position(&self) -> TimePosition {
        TimePosition::from_sixteenths(self.start)
    }

    pub fn end(&self) -> usize {
        self.start + self.duration.sixteenths()
    }
}

/// A generated 4-measure melody plus the pitch rows it was generated
/// against. Immutable once built; regenerating replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Melody {
    events: Vec<NoteEvent>,
    scale_pitches: Vec<Pitch>,
    grid_rows: Vec<Pitch>,
}

impl Melody {
    /// Fill the 64-unit budget greedily: prefer an exact-fit duration so
    /// the last measure closes, otherwise choose uniformly among the
    /// durations that still fit, with the pitch drawn uniformly from the
    /// in-scale set. The smallest duration is one unit and divides 64, so
    /// the loop always lands on exactly zero remaining.
    pub fn generate(
        low: Pitch,
        high: Pitch,
        scale: Scale,
        rng: &mut Rnd,
    ) -> Result<Self, GenerateError> {
        let range = pitch::chromatic_range(low, high);
        if range.is_empty() {
            return Err(GenerateError::InvalidRange);
        }
        let scale_pitches = scale.filter(&range);
        if scale_pitches.is_empty() {
            return Err(GenerateError::EmptyScale);
        }

        let mut events = Vec::new();
        let mut remaining = TOTAL_SIXTEENTHS;
        while remaining > 0 && events.len() < MAX_ITERATIONS {
            if remaining == 1 {
                events.push(NoteEvent {
                    pitch: pick(rng, &scale_pitches),
                    duration: DurationUnit::Sixteenth,
                    start: TOTAL_SIXTEENTHS - 1,
                    index: events.len(),
                });
                remaining = 0;
                break;
            }

            let candidates: Vec<DurationUnit> = DurationUnit::ALL
                .iter()
                .copied()
                .filter(|d| d.sixteenths() <= remaining)
                .collect();
            if candidates.is_empty() {
                // Unreachable while the catalog keeps a one-unit duration.
                remaining = 0;
                break;
            }

            let duration = candidates
                .iter()
                .copied()
                .find(|d| d.sixteenths() == remaining)
                .unwrap_or_else(|| pick(rng, &candidates));

            events.push(NoteEvent {
                pitch: pick(rng, &scale_pitches),
                duration,
                start: TOTAL_SIXTEENTHS - remaining,
                index: events.len(),
            });
            remaining -= duration.sixteenths();
        }

        Ok(Self {
            events,
            scale_pitches,
            grid_rows: pitch::chromatic_range_capped(low, high),
        })
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// In-scale pitches the notes were drawn from, high to low.
    pub fn scale_pitches(&self) -> &[Pitch] {
        &self.scale_pitches
    }

    /// Chromatic rows for the grid, high to low, capped to the row budget.
    pub fn grid_rows(&self) -> &[Pitch] {
        &self.grid_rows
    }
}

fn pick<T: Copy>(rng: &mut Rnd, items: &[T]) -> T {
    items[(rng.u64() % items.len() as u64) as usize]
}
