use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

/// Terminal input seam. Handlers return true to request shutdown.
pub trait EventHandler {
    fn handle_key(&mut self, kev: KeyEvent) -> anyhow::Result<bool> {
        let _ = kev;
        Ok(false)
    }
    fn handle_paste(&mut self, s: String) -> anyhow::Result<bool> {
        let _ = s;
        Ok(false)
    }
}

pub trait FrameRenderable {
    fn draw(&self, frame: &mut Frame) {
        self.draw_into(frame, frame.area())
    }
    fn draw_into(&self, frame: &mut Frame, area: Rect);
}
