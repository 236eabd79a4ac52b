use crossterm::event::{Event as CEvent, KeyCode, MouseEventKind};

use super::{PaneEffect, step};
use crate::render::RenderedContent;

const WHEEL_LINES: isize = 3;
/// Border plus right padding around the text.
const HORIZONTAL_CHROME: u16 = 4;
const VERTICAL_CHROME: u16 = 2;

#[derive(Debug, Clone, Default)]
pub struct ContentPane {
    content: RenderedContent,
    scroll: usize,
    width: u16,
    height: u16,
}

impl ContentPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_content(&mut self, content: RenderedContent) {
        self.content = content;
        self.scroll = 0;
    }

    pub fn content(&self) -> &RenderedContent {
        &self.content
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Target width for the next render; never zero.
    pub fn text_width(&self) -> usize {
        self.width.saturating_sub(HORIZONTAL_CHROME).max(1) as usize
    }

    fn body_rows(&self) -> usize {
        self.height.saturating_sub(VERTICAL_CHROME).max(1) as usize
    }

    pub fn max_scroll(&self) -> usize {
        self.content.line_count().saturating_sub(self.body_rows())
    }

    pub fn apply(&mut self, event: &CEvent) -> PaneEffect {
        let page = self.body_rows() as isize;
        match event {
            CEvent::Key(key) => match key.code {
                KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
                KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
                KeyCode::PageDown => self.scroll_by(page),
                KeyCode::PageUp => self.scroll_by(-page),
                KeyCode::Home | KeyCode::Char('g') => self.scroll_to(0),
                KeyCode::End | KeyCode::Char('G') => self.scroll_to(self.max_scroll()),
                _ => PaneEffect::Ignored,
            },
            CEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => self.scroll_by(WHEEL_LINES),
                MouseEventKind::ScrollUp => self.scroll_by(-WHEEL_LINES),
                _ => PaneEffect::Ignored,
            },
            _ => PaneEffect::Ignored,
        }
    }

    fn scroll_by(&mut self, delta: isize) -> PaneEffect {
        self.scroll = step(self.scroll, delta, self.max_scroll() + 1);
        PaneEffect::Consumed
    }

    fn scroll_to(&mut self, line: usize) -> PaneEffect {
        self.scroll = line.min(self.max_scroll());
        PaneEffect::Consumed
    }
}
