use std::time::Instant;

use fundsp::funutd::Rnd;
use fundsp::hacker32::*;
use fundsp::realseq::SequencerBackend;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::melody::{Melody, NoteEvent, TOTAL_SIXTEENTHS, TimePosition};

/// The three selectable presets, mirrored from the synth patches the
/// sequencer started life with.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum Instrument {
    #[default]
    ElectricPiano,
    BassSynth,
    Marimba,
}

impl Instrument {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ElectricPiano => "Electric Piano",
            Self::BassSynth => "Electric Bass",
            Self::Marimba => "Marimba/Mallet",
        }
    }

    /// A freshly built mono voice at the given frequency. One unit per
    /// triggered note; the sequencer owns it until the note ends.
    pub fn build(&self, freq: f32) -> Box<dyn AudioUnit> {
        match self {
            Self::ElectricPiano => {
                let fm = (sine_hz(freq * 0.5) * (freq * 3.0) + dc(freq)) >> square();
                let env = envelope(|t| {
                    if t < 0.005 {
                        t / 0.005
                    } else {
                        0.1 + 0.9 * (-(t - 0.005) / 0.8).exp()
                    }
                });
                Box::new(fm * env * 0.2)
            }
            Self::BassSynth => {
                let peak = (freq * 8.0).min(3000.0);
                let cutoff = envelope(move |t| 200.0 + peak * (-t / 0.1).exp());
                let amp = envelope(|t| {
                    if t < 0.005 {
                        t / 0.005
                    } else {
                        0.3 + 0.7 * (-(t - 0.005) / 0.1).exp()
                    }
                });
                Box::new(((saw_hz(freq) | cutoff | dc(0.7)) >> lowpass()) * amp * 0.3)
            }
            Self::Marimba => {
                let strike = envelope(move |t| freq * (1.0 + 2.0 * (-t / 0.05).exp()));
                let amp = envelope(|t| (-t / 0.4).exp());
                Box::new((strike >> sine()) * amp * 0.35)
            }
        }
    }
}

/// Metronome tick: a short pitched thump, accented on the downbeat.
fn click_unit(freq: f32, gain: f32) -> Box<dyn AudioUnit> {
    let strike = envelope(move |t| freq * (1.0 + 1.5 * (-t / 0.005).exp()));
    let amp = envelope(|t| (-t / 0.05).exp());
    Box::new((strike >> sine()) * amp * gain)
}

struct Playback {
    /// Sixteenth-units elapsed since start; monotonic, never wrapped.
    pos: f64,
    last_tick: Instant,
    cursor: usize,
    lap: usize,
    /// (event index, absolute sixteenth-unit end) of sounding notes.
    highlights: Vec<(usize, f64)>,
}

/// Owns the one live fundsp sequencer and the note events pending in it.
/// Starting, stopping, or re-scheduling always releases every pending
/// event before installing the new state, so nothing ever plays against a
/// stale melody.
pub struct Player {
    seq: Sequencer,
    rng: Rnd,
    pending: Vec<EventId>,
    instrument: Instrument,
    click: bool,
    last_column: Option<usize>,
    playback: Option<Playback>,
}

impl Player {
    pub fn new(sample_rate: f64) -> Self {
        let mut seq = Sequencer::new(false, 1);
        seq.set_sample_rate(sample_rate);
        Self {
            seq,
            rng: Rnd::from_u64(0),
            pending: Vec::new(),
            instrument: Instrument::ElectricPiano,
            click: false,
            last_column: None,
            playback: None,
        }
    }

    /// The audio-thread half of the sequencer; chain this into the output
    /// net exactly once.
    pub fn backend(&mut self) -> SequencerBackend {
        self.seq.backend()
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Swapping instruments mid-playback stops the transport first.
    /// Returns true if it did.
    pub fn set_instrument(&mut self, instrument: Instrument) -> bool {
        let was_playing = self.is_playing();
        if was_playing {
            self.stop();
        }
        self.instrument = instrument;
        was_playing
    }

    pub fn click(&self) -> bool {
        self.click
    }

    pub fn set_click(&mut self, click: bool) {
        self.click = click;
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn start(&mut self) {
        self.release_pending();
        self.last_column = None;
        self.playback = Some(Playback {
            pos: 0.0,
            last_tick: Instant::now(),
            cursor: 0,
            lap: 0,
            highlights: Vec::new(),
        });
    }

    /// Stop scheduling and reset the position. Release tails fade on
    /// their own; they are not awaited.
    pub fn stop(&mut self) {
        self.release_pending();
        self.last_column = None;
        self.playback = None;
    }

    fn release_pending(&mut self) {
        for id in self.pending.drain(..) {
            self.seq.edit_relative(id, 0.0, 0.01);
        }
    }

    /// Event indices currently sounding, for note highlighting.
    pub fn highlighted(&self) -> Vec<usize> {
        match &self.playback {
            Some(pb) => pb.highlights.iter().map(|&(index, _)| index).collect(),
            None => Vec::new(),
        }
    }

    /// Quarter-note column 0..16 for the playhead bar.
    pub fn quarter_column(&self) -> Option<usize> {
        self.playback
            .as_ref()
            .map(|pb| (pb.pos / 4.0) as usize % (TOTAL_SIXTEENTHS / 4))
    }

    pub fn position(&self) -> Option<TimePosition> {
        self.playback
            .as_ref()
            .map(|pb| TimePosition::from_sixteenths(pb.pos as usize % TOTAL_SIXTEENTHS))
    }

    /// Cooperative transport tick, called from the UI loop.
    pub fn tick(&mut self, melody: &Melody, tempo: f32) {
        let now = Instant::now();
        let dt = match &mut self.playback {
            Some(pb) => {
                let dt = now.duration_since(pb.last_tick).as_secs_f64();
                pb.last_tick = now;
                dt
            }
            None => return,
        };
        self.advance(dt, melody, tempo);
    }

    /// Advance the transport by `dt` seconds, triggering every event whose
    /// start time has been crossed and looping over the four measures.
    fn advance(&mut self, dt: f64, melody: &Melody, tempo: f32) {
        let Some(mut pb) = self.playback.take() else {
            return;
        };
        if melody.is_empty() {
            self.playback = Some(pb);
            return;
        }

        pb.pos += dt * tempo as f64 * 4.0 / 60.0;

        loop {
            let event = &melody.events()[pb.cursor];
            let abs_start = (pb.lap * TOTAL_SIXTEENTHS + event.start) as f64;
            if pb.pos < abs_start {
                break;
            }
            self.trigger_note(event, tempo);
            pb.highlights
                .push((event.index, abs_start + event.duration.sixteenths() as f64));
            pb.cursor += 1;
            if pb.cursor == melody.len() {
                pb.cursor = 0;
                pb.lap += 1;
            }
        }
        pb.highlights.retain(|&(_, end)| end > pb.pos);

        if self.click {
            let column = (pb.pos / 4.0) as usize % (TOTAL_SIXTEENTHS / 4);
            if self.last_column != Some(column) {
                self.last_column = Some(column);
                self.trigger_click(column % 4 == 0);
            }
        }

        self.playback = Some(pb);
    }

    fn trigger_note(&mut self, event: &NoteEvent, tempo: f32) {
        let mut unit = self.instrument.build(event.pitch.freq());
        unit.ping(false, AttoHash::new(self.rng.u64()));
        let dur = event.duration.seconds(tempo);
        let id = self.seq.push_relative(0.0, dur, Fade::Smooth, 0.002, 0.02, unit);
        self.remember(id);
    }

    fn trigger_click(&mut self, accent: bool) {
        // C7 on the downbeat, G6 elsewhere.
        let (freq, gain, dur) = if accent {
            (2093.0, 0.5, 0.1)
        } else {
            (1568.0, 0.35, 0.06)
        };
        let id = self
            .seq
            .push_relative(0.0, dur, Fade::Smooth, 0.001, 0.02, click_unit(freq, gain));
        self.remember(id);
    }

    fn remember(&mut self, id: EventId) {
        self.pending.push(id);
        // Long-finished events need no release edit; forget the oldest.
        if self.pending.len() > 256 {
            self.pending.drain(..128);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::Pitch;
    use crate::scale::Scale;

    fn test_melody() -> Melody {
        let low: Pitch = "C3".parse().unwrap();
        let high: Pitch = "C5".parse().unwrap();
        Melody::generate(low, high, Scale::Major, &mut Rnd::from_u64(11)).unwrap()
    }

    fn advance_seconds(player: &mut Player, melody: &Melody, tempo: f32, seconds: f64) {
        let mut remaining = seconds;
        while remaining > 0.0 {
            let step = remaining.min(0.01);
            player.advance(step, melody, tempo);
            remaining -= step;
        }
    }

    #[test]
    fn instrument_names_parse() {
        assert_eq!(
            "electric_piano".parse::<Instrument>().unwrap(),
            Instrument::ElectricPiano
        );
        assert_eq!("marimba".parse::<Instrument>().unwrap(), Instrument::Marimba);
        assert!("theremin".parse::<Instrument>().is_err());
    }

    #[test]
    fn one_lap_triggers_every_event_exactly_once() {
        let melody = test_melody();
        let mut player = Player::new(44100.0);
        player.start();
        // Four measures at 120 BPM last 8 seconds; stop just short of the
        // loop boundary so lap two's first event hasn't fired yet.
        advance_seconds(&mut player, &melody, 120.0, 7.95);
        assert_eq!(player.pending.len(), melody.len());
    }

    #[test]
    fn playback_loops_past_the_fourth_measure() {
        let melody = test_melody();
        let mut player = Player::new(44100.0);
        player.start();
        advance_seconds(&mut player, &melody, 120.0, 8.1);
        assert!(player.pending.len() > melody.len());
        assert_eq!(player.quarter_column(), Some(0));
    }

    #[test]
    fn first_event_is_highlighted_at_the_start() {
        let melody = test_melody();
        let mut player = Player::new(44100.0);
        player.start();
        player.advance(0.001, &melody, 120.0);
        assert_eq!(player.highlighted(), vec![0]);
        assert_eq!(player.quarter_column(), Some(0));
    }

    #[test]
    fn stop_releases_everything_and_resets_position() {
        let melody = test_melody();
        let mut player = Player::new(44100.0);
        player.start();
        advance_seconds(&mut player, &melody, 120.0, 1.0);
        assert!(player.is_playing());
        player.stop();
        assert!(!player.is_playing());
        assert!(player.pending.is_empty());
        assert!(player.highlighted().is_empty());
        assert_eq!(player.quarter_column(), None);
        assert_eq!(player.position(), None);
    }

    #[test]
    fn instrument_change_stops_playback() {
        let melody = test_melody();
        let mut player = Player::new(44100.0);
        player.start();
        player.advance(0.1, &melody, 120.0);
        assert!(player.set_instrument(Instrument::Marimba));
        assert!(!player.is_playing());
        assert_eq!(player.instrument(), Instrument::Marimba);
        // And changing while stopped doesn't report a stop.
        assert!(!player.set_instrument(Instrument::BassSynth));
    }

    #[test]
    fn click_fires_once_per_quarter_note() {
        let melody = test_melody();
        let mut player = Player::new(44100.0);
        player.set_click(true);
        player.start();
        // Two beats at 120 BPM = 1 second; expect two clicks on top of the
        // notes that started in that window.
        advance_seconds(&mut player, &melody, 120.0, 0.95);
        let notes_started = melody
            .events()
            .iter()
            .filter(|e| (e.start as f64) < 0.95 * 8.0)
            .count();
        assert_eq!(player.pending.len(), notes_started + 2);
    }

    #[test]
    fn voices_build_for_every_instrument() {
        for instrument in [
            Instrument::ElectricPiano,
            Instrument::BassSynth,
            Instrument::Marimba,
        ] {
            let unit = instrument.build(220.0);
            assert_eq!(unit.inputs(), 0);
            assert_eq!(unit.outputs(), 1);
        }
    }
}
