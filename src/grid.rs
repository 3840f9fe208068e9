use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Painter, Shape};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::melody::{Melody, TOTAL_SIXTEENTHS};
use crate::panel::FrameRenderable;

/// Pitch-label gutter width in cells.
const LABEL_WIDTH: usize = 5;

// The sequencer palette.
const ROW_IN_SCALE: Color = Color::Rgb(62, 62, 111);
const ROW_IN_SCALE_ALT: Color = Color::Rgb(54, 54, 92);
const ROW_IN_SCALE_DARK: Color = Color::Rgb(44, 44, 78);
const ROW_OFF_SCALE: Color = Color::Rgb(26, 26, 46);
const PLAYHEAD: Color = Color::Rgb(94, 94, 143);
const NOTE: Color = Color::Rgb(135, 206, 250);
const NOTE_ACTIVE: Color = Color::Rgb(255, 255, 180);

/// One frame of the piano roll: chromatic rows against 64 sixteenth-note
/// columns, with note blocks overlaid and the playhead column brightened.
pub struct PianoRoll<'a> {
    pub melody: &'a Melody,
    pub highlights: &'a [usize],
    pub playhead: Option<usize>,
}

impl Shape for PianoRoll<'_> {
    fn draw(&self, painter: &mut Painter) {
        let rows = self.melody.grid_rows();

        // Row backgrounds; header row 0 is left to the measure labels.
        for (row, pitch) in rows.iter().enumerate() {
            let y = row + 1;
            let in_scale = self.melody.scale_pitches().contains(pitch);
            let black_key = pitch.to_string().contains('#');
            for s in 0..TOTAL_SIXTEENTHS {
                let quarter = s / 4;
                let color = if self.playhead == Some(quarter) {
                    PLAYHEAD
                } else if !in_scale {
                    ROW_OFF_SCALE
                } else if black_key {
                    ROW_IN_SCALE_DARK
                } else if quarter % 2 == 1 {
                    ROW_IN_SCALE_ALT
                } else {
                    ROW_IN_SCALE
                };
                painter.paint(LABEL_WIDTH + s, y, color);
            }
        }

        for event in self.melody.events() {
            // A pitch can fall outside the capped row range; skip it.
            let Some(row) = rows.iter().position(|p| *p == event.pitch) else {
                continue;
            };
            let color = if self.highlights.contains(&event.index) {
                NOTE_ACTIVE
            } else {
                NOTE
            };
            for s in event.start..event.end() {
                painter.paint(LABEL_WIDTH + s, row + 1, color);
            }
        }
    }
}

impl FrameRenderable for PianoRoll<'_> {
    fn draw_into(&self, frame: &mut Frame, area: Rect) {
        let block = Block::new()
            .borders(Borders::ALL)
            .title("Sequencer Track (4 Measures)");
        let inner = block.inner(area);
        block.render(area, frame.buffer_mut());

        let rows = self.melody.grid_rows();
        if rows.is_empty() {
            Paragraph::new("Sequence output will appear here.")
                .render(inner, frame.buffer_mut());
            return;
        }

        let w = (LABEL_WIDTH + TOTAL_SIXTEENTHS) as u16;
        let h = (rows.len() + 1) as u16;
        let [_, grid_area, _] = Layout::new(
            Direction::Horizontal,
            vec![
                Constraint::Min(0),
                Constraint::Length(w),
                Constraint::Min(0),
            ],
        )
        .areas(inner);
        let [_, grid_area, _] = Layout::new(
            Direction::Vertical,
            vec![
                Constraint::Min(0),
                Constraint::Length(h),
                Constraint::Min(0),
            ],
        )
        .areas(grid_area);

        Canvas::default()
            .x_bounds([0.0, w as f64])
            .y_bounds([0.0, h as f64])
            .marker(Marker::Block)
            .paint(|ctx| {
                ctx.draw(self);

                for (row, pitch) in rows.iter().enumerate() {
                    let in_scale = self.melody.scale_pitches().contains(pitch);
                    let style = if in_scale {
                        Style::default().fg(Color::White)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    let cy = (h as usize - row - 1) as f64 - 0.5;
                    ctx.print(0.0, cy, Line::styled(pitch.to_string(), style));
                }

                // Measure numbers across the header row.
                for measure in 0..4usize {
                    let cx = (LABEL_WIDTH + measure * 16 + 7) as f64;
                    ctx.print(cx, h as f64 - 0.5, Line::from((measure + 1).to_string()));
                }
            })
            .render(grid_area, frame.buffer_mut());
    }
}
