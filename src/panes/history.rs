use crossterm::event::{Event as CEvent, KeyCode, KeyEvent, KeyModifiers, MouseEventKind};

use super::{PaneEffect, step};
use crate::domain::CommitRecord;

pub const BASE_TITLE: &str = "What is the first good commit?";

/// Rows used by one list item: title line plus description line.
const ITEM_HEIGHT: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct HistoryPane {
    records: Vec<CommitRecord>,
    visible: Vec<usize>,
    index: usize,
    offset: usize,
    width: u16,
    height: u16,
    branch: Option<String>,
    filter: String,
    editing_filter: bool,
}

impl HistoryPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_records(&mut self, records: Vec<CommitRecord>) {
        self.records = records;
        self.index = 0;
        self.offset = 0;
        self.refilter();
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records passing the current filter, in log order.
    pub fn visible_records(&self) -> impl Iterator<Item = &CommitRecord> {
        self.visible.iter().filter_map(|idx| self.records.get(*idx))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn highlighted(&self) -> Option<&CommitRecord> {
        self.visible
            .get(self.index)
            .and_then(|idx| self.records.get(*idx))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.branch = Some(branch.into());
    }

    pub fn title(&self) -> String {
        match self.branch.as_deref() {
            Some(branch) => format!("{branch}: {BASE_TITLE}"),
            None => BASE_TITLE.to_string(),
        }
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.ensure_visible();
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_editing_filter(&self) -> bool {
        self.editing_filter
    }

    pub fn begin_filter(&mut self) {
        self.editing_filter = true;
    }

    /// Items that fit between the borders.
    pub fn page_items(&self) -> usize {
        (self.height.saturating_sub(2) as usize / ITEM_HEIGHT).max(1)
    }

    pub fn apply(&mut self, event: &CEvent) -> PaneEffect {
        match event {
            CEvent::Key(key) if self.editing_filter => self.apply_filter_key(*key),
            CEvent::Key(key) => self.apply_key(*key),
            CEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => self.move_by(1),
                MouseEventKind::ScrollUp => self.move_by(-1),
                _ => PaneEffect::Ignored,
            },
            _ => PaneEffect::Ignored,
        }
    }

    fn apply_key(&mut self, key: KeyEvent) -> PaneEffect {
        let page = self.page_items() as isize;
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
            KeyCode::PageDown => self.move_by(page),
            KeyCode::PageUp => self.move_by(-page),
            KeyCode::Home | KeyCode::Char('g') => self.move_to(0),
            KeyCode::End | KeyCode::Char('G') => self.move_to(self.visible.len().saturating_sub(1)),
            KeyCode::Esc if !self.filter.is_empty() => {
                self.set_filter(String::new());
                PaneEffect::Consumed
            }
            _ => PaneEffect::Ignored,
        }
    }

    fn apply_filter_key(&mut self, key: KeyEvent) -> PaneEffect {
        match key.code {
            KeyCode::Enter => self.editing_filter = false,
            KeyCode::Esc => {
                self.editing_filter = false;
                self.set_filter(String::new());
            }
            KeyCode::Backspace => {
                let mut filter = self.filter.clone();
                filter.pop();
                self.set_filter(filter);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let mut filter = self.filter.clone();
                filter.push(c);
                self.set_filter(filter);
            }
            _ => return PaneEffect::Ignored,
        }
        PaneEffect::Consumed
    }

    fn set_filter(&mut self, filter: String) {
        let keep = self.visible.get(self.index).copied();
        self.filter = filter;
        self.refilter();
        self.index = keep
            .and_then(|record_idx| self.visible.iter().position(|idx| *idx == record_idx))
            .unwrap_or(0);
        self.ensure_visible();
    }

    fn refilter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                needle.is_empty() || record.filter_value().to_lowercase().contains(&needle)
            })
            .map(|(idx, _)| idx)
            .collect();
        if self.index >= self.visible.len() {
            self.index = self.visible.len().saturating_sub(1);
        }
        self.ensure_visible();
    }

    fn move_by(&mut self, delta: isize) -> PaneEffect {
        if self.visible.is_empty() {
            return PaneEffect::Ignored;
        }
        self.index = step(self.index, delta, self.visible.len());
        self.ensure_visible();
        PaneEffect::Consumed
    }

    fn move_to(&mut self, index: usize) -> PaneEffect {
        if self.visible.is_empty() {
            return PaneEffect::Ignored;
        }
        self.index = index.min(self.visible.len() - 1);
        self.ensure_visible();
        PaneEffect::Consumed
    }

    fn ensure_visible(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            self.index = 0;
            self.offset = 0;
            return;
        }

        let rows = self.page_items();
        let max_offset = len.saturating_sub(rows);
        let mut offset = self.offset.min(max_offset);
        if self.index < offset {
            offset = self.index;
        } else if self.index >= offset + rows {
            offset = self.index + 1 - rows;
        }
        self.offset = offset.min(max_offset);
    }
}
