use std::io::stdout;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use fundsp::funutd::Rnd;
use fundsp::hacker::*;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::widgets::{Paragraph, Widget};
use strum::IntoEnumIterator;

use crate::command_box::CommandBox;
use crate::grid::PianoRoll;
use crate::melody::Melody;
use crate::panel::{EventHandler, FrameRenderable};
use crate::pitch::Pitch;
use crate::player::{Instrument, Player};
use crate::scale::Scale;
use crate::settings::{Settings, TEMPO_RANGE};

/// Argument shape of a command, used to build autocomplete hints.
pub enum Arg {
    None,
    Pitch,
    Bpm,
    ScaleName,
    InstrumentName,
    Toggle,
    Seed,
    Path,
}

impl Arg {
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Pitch => "<pitch>",
            Self::Bpm => "<bpm>",
            Self::ScaleName => "<scale>",
            Self::InstrumentName => "<instrument>",
            Self::Toggle => "on|off",
            Self::Seed => "[seed]",
            Self::Path => "<path>",
        }
    }
}

#[derive(Debug, PartialEq)]
enum AppCommand {
    Exit,
    Generate(Option<u64>),
    Play,
    Stop,
    Clear,
    SetLow(String),
    SetHigh(String),
    SetTempo(String),
    SetScale(String),
    SetInstrument(String),
    SetClick(String),
    Load(String),
    Save(String),
}

impl AppCommand {
    fn list_commands() -> Vec<(String, Arg)> {
        vec![
            ("generate".into(), Arg::Seed),
            ("play".into(), Arg::None),
            ("stop".into(), Arg::None),
            ("clear".into(), Arg::None),
            ("set low".into(), Arg::Pitch),
            ("set high".into(), Arg::Pitch),
            ("set tempo".into(), Arg::Bpm),
            ("set scale".into(), Arg::ScaleName),
            ("set instrument".into(), Arg::InstrumentName),
            ("set click".into(), Arg::Toggle),
            ("load".into(), Arg::Path),
            ("save".into(), Arg::Path),
            ("exit".into(), Arg::None),
        ]
    }
}

impl TryFrom<&str> for AppCommand {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        match (
            parts.first().copied(),
            parts.get(1).copied(),
            parts.get(2).copied(),
        ) {
            (Some("exit") | Some("quit"), None, None) => Ok(Self::Exit),
            (Some("generate"), None, None) => Ok(Self::Generate(None)),
            (Some("generate"), Some(seed), None) => seed
                .parse()
                .map(|s| Self::Generate(Some(s)))
                .map_err(|_| format!("seed must be an integer, got \"{seed}\"")),
            (Some("play"), None, None) => Ok(Self::Play),
            (Some("stop"), None, None) => Ok(Self::Stop),
            (Some("clear"), None, None) => Ok(Self::Clear),
            (Some("set"), Some("low"), Some(p)) => Ok(Self::SetLow(p.into())),
            (Some("set"), Some("high"), Some(p)) => Ok(Self::SetHigh(p.into())),
            (Some("set"), Some("tempo"), Some(t)) => Ok(Self::SetTempo(t.into())),
            (Some("set"), Some("scale"), Some(s)) => Ok(Self::SetScale(s.into())),
            (Some("set"), Some("instrument"), Some(i)) => Ok(Self::SetInstrument(i.into())),
            (Some("set"), Some("click"), Some(c)) => Ok(Self::SetClick(c.into())),
            (Some("load"), Some(p), None) => Ok(Self::Load(p.into())),
            (Some("save"), Some(p), None) => Ok(Self::Save(p.into())),
            _ => Err(format!("unrecognised command \"{value}\"")),
        }
    }
}

pub struct App {
    _net: Net,
    rng: Rnd,
    player: Player,
    melody: Melody,
    settings: Settings,
    cbox: CommandBox,
    status: String,
}

impl App {
    pub fn new(mut net: Net, sample_rate: f64) -> Self {
        let mut player = Player::new(sample_rate);
        net.chain(Box::new(player.backend()));
        net.chain(Box::new(pan(0.0)));
        net.commit();

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut cbox = CommandBox::new();
        cbox.set_autocomplete(AppCommand::list_commands());

        let settings = Settings::default();
        player.set_click(settings.click);

        Self {
            _net: net,
            rng: Rnd::from_u64(seed),
            player,
            melody: Melody::default(),
            settings,
            cbox,
            status: format!(
                "{} ready. Ready to generate!",
                Instrument::default().describe()
            ),
        }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let mut term = ratatui::init();
        execute!(stdout(), EnableBracketedPaste)?;

        loop {
            term.draw(|frame| self.draw(frame))?;

            if self.process_events()? || self.run_commands()? {
                break;
            }

            self.player.tick(&self.melody, self.settings.tempo);
        }
        Ok(())
    }

    fn process_events(&mut self) -> anyhow::Result<bool> {
        if !event::poll(Duration::from_millis(16))? {
            return Ok(false);
        }
        match event::read()? {
            Event::Key(kev) if kev.kind == KeyEventKind::Press => {
                if kev.modifiers.contains(KeyModifiers::CONTROL) && kev.code == KeyCode::Char('c')
                {
                    return Ok(true);
                }
                self.cbox.handle_key(kev)?;
            }
            Event::Paste(text) => {
                self.cbox.handle_paste(text)?;
            }
            _ => (),
        }
        Ok(false)
    }

    fn run_commands(&mut self) -> anyhow::Result<bool> {
        self.cbox.update_autocomplete();
        let Some(line) = self.cbox.get_command() else {
            return Ok(false);
        };

        let cmd = match AppCommand::try_from(line.as_str()) {
            Ok(cmd) => cmd,
            Err(m) => {
                self.cbox.push_error(format!("Error: {m}"));
                return Ok(false);
            }
        };

        match cmd {
            AppCommand::Exit => return Ok(true),
            AppCommand::Generate(seed) => self.generate(seed),
            AppCommand::Play => self.play(),
            AppCommand::Stop => {
                self.player.stop();
                self.set_status("Stopped.");
            }
            AppCommand::Clear => {
                self.player.stop();
                self.melody = Melody::default();
                self.set_status("Sequence output will appear here.");
            }
            AppCommand::SetLow(p) => self.set_bound(&p, true),
            AppCommand::SetHigh(p) => self.set_bound(&p, false),
            AppCommand::SetTempo(t) => self.set_tempo(&t),
            AppCommand::SetScale(s) => match s.parse::<Scale>() {
                Ok(scale) => {
                    self.settings.scale = scale;
                    self.set_status(format!("Scale set to {scale}."));
                }
                Err(_) => {
                    let known: Vec<String> = Scale::iter().map(|s| s.to_string()).collect();
                    self.cbox.push_error(format!(
                        "Unknown scale \"{s}\"; expected one of: {}",
                        known.join(", ")
                    ));
                }
            },
            AppCommand::SetInstrument(i) => match i.parse::<Instrument>() {
                Ok(instrument) => {
                    self.settings.instrument = instrument;
                    if self.player.set_instrument(instrument) {
                        self.cbox.push_output("Playback stopped.".into());
                    }
                    self.set_status(format!(
                        "{} selected. Ready to generate!",
                        instrument.describe()
                    ));
                }
                Err(_) => {
                    let known: Vec<String> = Instrument::iter().map(|i| i.to_string()).collect();
                    self.cbox.push_error(format!(
                        "Unknown instrument \"{i}\"; expected one of: {}",
                        known.join(", ")
                    ));
                }
            },
            AppCommand::SetClick(c) => match c.as_str() {
                "on" => {
                    self.settings.click = true;
                    self.player.set_click(true);
                    self.set_status("Metronome on.");
                }
                "off" => {
                    self.settings.click = false;
                    self.player.set_click(false);
                    self.set_status("Metronome off.");
                }
                other => self
                    .cbox
                    .push_error(format!("set click takes \"on\" or \"off\", got \"{other}\"")),
            },
            AppCommand::Load(path) => match Settings::from_file(&path) {
                Ok(settings) => {
                    if self.player.set_instrument(settings.instrument) {
                        self.cbox.push_output("Playback stopped.".into());
                    }
                    self.player.set_click(settings.click);
                    self.settings = settings;
                    self.set_status(format!("Loaded settings from \"{path}\"."));
                }
                Err(e) => self.cbox.push_error(format!("Failed to load \"{path}\": {e}")),
            },
            AppCommand::Save(path) => match self.settings.save(&path) {
                Ok(()) => self.set_status(format!("Saved settings to \"{path}\".")),
                Err(e) => self.cbox.push_error(format!("Failed to save \"{path}\": {e}")),
            },
        }

        Ok(false)
    }

    fn generate(&mut self, seed: Option<u64>) {
        if let Some(seed) = seed {
            self.rng = Rnd::from_u64(seed);
        }
        self.player.stop();
        self.set_status("Generating...");

        let Settings {
            low, high, scale, ..
        } = self.settings;
        match Melody::generate(low, high, scale, &mut self.rng) {
            Ok(melody) => {
                self.melody = melody;
                self.list_measures();
                self.set_status(format!(
                    "Generated sequence using the {scale} scale in the range {low} to {high}."
                ));
            }
            Err(e) => {
                // the previous melody (if any) is kept
                self.cbox.push_error(format!("Error: {e}"));
                self.set_status(format!("Error: {e}"));
            }
        }
    }

    fn list_measures(&mut self) {
        for measure in 0..4 {
            let notes: Vec<String> = self
                .melody
                .events()
                .iter()
                .filter(|e| e.start / 16 == measure)
                .map(|e| format!("{} {}", e.pitch, e.duration.label()))
                .collect();
            self.cbox
                .push_output(format!("m{}: {}", measure + 1, notes.join(", ")));
        }
    }

    fn play(&mut self) {
        if self.melody.is_empty() {
            self.set_status("Error: Sequence not generated yet. Run 'generate' first.");
            return;
        }
        if self.player.is_playing() {
            self.player.stop();
            self.set_status("Stopped.");
        } else {
            self.player.start();
            self.set_status("Playing...");
        }
    }

    fn set_bound(&mut self, text: &str, low: bool) {
        match text.parse::<Pitch>() {
            Ok(pitch) => {
                let label = if low {
                    self.settings.low = pitch;
                    "Low"
                } else {
                    self.settings.high = pitch;
                    "High"
                };
                self.set_status(format!("{label} pitch set to {pitch}."));
            }
            Err(e) => self.cbox.push_error(format!("Error: {e}")),
        }
    }

    fn set_tempo(&mut self, text: &str) {
        match text.parse::<f32>() {
            Ok(bpm) if TEMPO_RANGE.contains(&bpm) => {
                self.settings.tempo = bpm;
                self.set_status(format!("Tempo set to {bpm} BPM."));
            }
            _ => self.cbox.push_error(format!(
                "Tempo must be a number between {} and {} BPM.",
                TEMPO_RANGE.start(),
                TEMPO_RANGE.end()
            )),
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        ratatui::restore();
        let _ = execute!(stdout(), DisableBracketedPaste);
    }
}

impl FrameRenderable for App {
    fn draw_into(&self, frame: &mut Frame, area: Rect) {
        let [workspace, status, bottom] = Layout::new(
            Direction::Vertical,
            vec![
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(12),
            ],
        )
        .areas(area);

        let highlights = self.player.highlighted();
        let roll = PianoRoll {
            melody: &self.melody,
            highlights: &highlights,
            playhead: self.player.quarter_column(),
        };
        roll.draw_into(frame, workspace);

        let line = match self.player.position() {
            Some(pos) => format!("{pos} | {}", self.status),
            None => self.status.clone(),
        };
        Paragraph::new(line).render(status, frame.buffer_mut());

        self.cbox.draw_into(frame, bottom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(AppCommand::try_from("exit"), Ok(AppCommand::Exit));
        assert_eq!(AppCommand::try_from("play"), Ok(AppCommand::Play));
        assert_eq!(
            AppCommand::try_from("generate"),
            Ok(AppCommand::Generate(None))
        );
        assert_eq!(
            AppCommand::try_from("generate 42"),
            Ok(AppCommand::Generate(Some(42)))
        );
        assert_eq!(
            AppCommand::try_from("set low C3"),
            Ok(AppCommand::SetLow("C3".into()))
        );
        assert_eq!(
            AppCommand::try_from("set tempo 90"),
            Ok(AppCommand::SetTempo("90".into()))
        );
        assert_eq!(
            AppCommand::try_from("save prefs.yaml"),
            Ok(AppCommand::Save("prefs.yaml".into()))
        );
    }

    #[test]
    fn test_command_parsing_rejects_garbage() {
        assert!(AppCommand::try_from("generate banana").is_err());
        assert!(AppCommand::try_from("set low").is_err());
        assert!(AppCommand::try_from("frobnicate").is_err());
        assert!(AppCommand::try_from("").is_err());
    }

    fn test_app() -> App {
        let mut net = Net::new(0, 2);
        // commit() needs a live backend; leak one so the channel stays open
        std::mem::forget(net.backend());
        App::new(net, 44100.0)
    }

    #[test]
    fn test_generate_populates_melody() {
        let mut app = test_app();
        app.generate(Some(7));
        assert!(!app.melody.is_empty());
        assert!(app.status.starts_with("Generated sequence"));
    }

    #[test]
    fn test_generate_error_keeps_previous_melody() {
        let mut app = test_app();
        app.generate(Some(7));
        let before = app.melody.clone();

        app.settings.high = app.settings.low;
        app.generate(Some(8));

        assert!(app.status.starts_with("Error:"));
        assert_eq!(app.melody.events(), before.events());
    }

    #[test]
    fn test_metronome_starts_enabled_and_in_sync() {
        let app = test_app();
        assert!(app.settings.click);
        assert_eq!(app.player.click(), app.settings.click);
    }

    #[test]
    fn test_tempo_out_of_range_rejected() {
        let mut app = test_app();
        app.set_tempo("300");
        assert_eq!(app.settings.tempo, Settings::default().tempo);
        app.set_tempo("90");
        assert_eq!(app.settings.tempo, 90.0);
    }
}
