use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::app::Arg;
use crate::panel::{EventHandler, FrameRenderable};

pub struct CommandBox {
    response: VecDeque<String>,
    buf: String,
    ready: bool,
    cursor_position: usize,
    commands: Vec<(String, Arg)>,
    hint: Option<String>,
}

impl CommandBox {
    pub fn new() -> Self {
        Self {
            response: VecDeque::new(),
            buf: String::new(),
            ready: false,
            cursor_position: 0,
            commands: Vec::new(),
            hint: None,
        }
    }

    pub fn set_autocomplete(&mut self, commands: Vec<(String, Arg)>) {
        self.commands = commands;
    }

    pub fn update_autocomplete(&mut self) {
        self.hint = if self.buf.is_empty() {
            None
        } else {
            self.commands
                .iter()
                .find(|(name, _)| name.starts_with(&self.buf))
                .map(|(name, arg)| {
                    let placeholder = arg.placeholder();
                    if placeholder.is_empty() {
                        name.clone()
                    } else {
                        format!("{name} {placeholder}")
                    }
                })
        };
    }

    pub fn get_command(&mut self) -> Option<String> {
        if self.ready {
            let cmd = std::mem::take(&mut self.buf);
            self.cursor_position = 0;
            self.ready = false;
            Some(cmd)
        } else {
            None
        }
    }

    pub fn push_output(&mut self, resp: String) {
        self.push_line(format!("<< {resp}"));
    }

    pub fn push_error(&mut self, resp: String) {
        self.push_line(format!("!! {resp}"));
    }

    fn push_line(&mut self, line: String) {
        self.response.push_back(line);
        while self.response.len() > 200 {
            let _ = self.response.pop_front();
        }
    }

    /// The cursor counts chars; string edits need the byte offset.
    fn byte_index(&self) -> usize {
        self.buf
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.buf.len())
    }

    fn char_count(&self) -> usize {
        self.buf.chars().count()
    }
}

impl EventHandler for CommandBox {
    fn handle_key(&mut self, kev: KeyEvent) -> anyhow::Result<bool> {
        match kev {
            KeyEvent { code: KeyCode::Char(c), kind: KeyEventKind::Press, .. } => {
                let idx = self.byte_index();
                self.buf.insert(idx, c);
                self.cursor_position += 1;
            },
            KeyEvent { code: KeyCode::Tab, kind: KeyEventKind::Press, .. } => {
                if let Some((name, _)) = self
                    .commands
                    .iter()
                    .find(|(name, _)| name.starts_with(&self.buf) && *name != self.buf)
                {
                    self.buf = format!("{name} ");
                    self.cursor_position = self.char_count();
                }
            },
            KeyEvent { code: KeyCode::Enter, kind: KeyEventKind::Press, .. } => {
                self.response.push_back(format!(">> {}", self.buf));
                self.ready = true;
            },
            KeyEvent { code: KeyCode::Esc, kind: KeyEventKind::Press, .. } => {
                self.buf = String::new();
                self.cursor_position = 0;
            },
            KeyEvent { code: KeyCode::Left, kind: KeyEventKind::Press, .. } => {
                self.cursor_position = self.cursor_position.saturating_sub(1);
            },
            KeyEvent { code: KeyCode::Right, kind: KeyEventKind::Press, .. } => {
                self.cursor_position = self.cursor_position.saturating_add(1).min(self.char_count());
            },
            KeyEvent { code: KeyCode::Backspace, kind: KeyEventKind::Press, .. } => {
                if self.cursor_position > 0 {
                    self.cursor_position -= 1;
                    let idx = self.byte_index();
                    self.buf.remove(idx);
                }
            }
            KeyEvent { code: KeyCode::Delete, kind: KeyEventKind::Press, .. } => {
                let idx = self.byte_index();
                if idx < self.buf.len() {
                    self.buf.remove(idx);
                }
            }
            _ => (),
        };

        Ok(false)
    }

    fn handle_paste(&mut self, s: String) -> anyhow::Result<bool> {
        let idx = self.byte_index();
        self.buf.insert_str(idx, &s);
        self.cursor_position += s.chars().count();
        Ok(false)
    }
}

impl FrameRenderable for CommandBox {
    fn draw_into(&self, frame: &mut Frame, area: Rect) {
        let block = Block::new().borders(Borders::ALL);
        let inner = block.inner(area);
        block.render(area, frame.buffer_mut());
        let area = inner;

        let mut lines: VecDeque<_> = self.response.iter().map(|r| Line::from(r.clone())).collect();
        let resp_h = area.height as usize;
        while lines.len() < resp_h {
            lines.push_front(Line::from(""));
        }
        while lines.len() >= resp_h {
            lines.pop_front();
        }

        let mut spans = vec![Span::raw(format!(">> {}", self.buf))];
        if let Some(hint) = &self.hint {
            if let Some(rest) = hint.strip_prefix(&self.buf) {
                spans.push(Span::styled(
                    rest.to_string(),
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
        }
        lines.push_back(Line::from(spans));
        let lines: Vec<_> = lines.into_iter().collect();
        let para = Paragraph::new(lines);
        para.render(area, frame.buffer_mut());

        let cx = area.x + 3 + (self.cursor_position as u16);
        let cy = area.y + area.height - 1;
        frame.set_cursor_position((cx, cy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(cbox: &mut CommandBox, code: KeyCode) {
        cbox.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    #[test]
    fn multibyte_chars_keep_the_cursor_on_boundaries() {
        let mut cbox = CommandBox::new();
        press(&mut cbox, KeyCode::Char('é'));
        press(&mut cbox, KeyCode::Char('x'));
        assert_eq!(cbox.buf, "éx");
        assert_eq!(cbox.cursor_position, 2);

        press(&mut cbox, KeyCode::Left);
        press(&mut cbox, KeyCode::Char('ß'));
        assert_eq!(cbox.buf, "éßx");

        press(&mut cbox, KeyCode::Backspace);
        assert_eq!(cbox.buf, "éx");
        press(&mut cbox, KeyCode::Delete);
        assert_eq!(cbox.buf, "é");
    }

    #[test]
    fn backspace_at_the_start_is_a_no_op() {
        let mut cbox = CommandBox::new();
        press(&mut cbox, KeyCode::Char('é'));
        press(&mut cbox, KeyCode::Left);
        press(&mut cbox, KeyCode::Backspace);
        assert_eq!(cbox.buf, "é");
        assert_eq!(cbox.cursor_position, 0);
    }

    #[test]
    fn paste_advances_by_chars_not_bytes() {
        let mut cbox = CommandBox::new();
        cbox.handle_paste("héllo".to_string()).unwrap();
        assert_eq!(cbox.cursor_position, 5);
        press(&mut cbox, KeyCode::Char('!'));
        assert_eq!(cbox.buf, "héllo!");
    }

    #[test]
    fn enter_hands_the_line_to_get_command() {
        let mut cbox = CommandBox::new();
        for c in "play".chars() {
            press(&mut cbox, KeyCode::Char(c));
        }
        assert_eq!(cbox.get_command(), None);
        press(&mut cbox, KeyCode::Enter);
        assert_eq!(cbox.get_command(), Some("play".to_string()));
        assert_eq!(cbox.cursor_position, 0);
    }
}
