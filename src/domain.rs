use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

impl CommitRecord {
    pub fn short_hash(&self) -> &str {
        match self.hash.char_indices().nth(10) {
            Some((idx, _)) => &self.hash[..idx],
            None => &self.hash,
        }
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.author, self.message)
    }

    pub fn description(&self) -> String {
        format!("{} {}", self.date, self.short_hash())
    }

    pub fn filter_value(&self) -> String {
        format!("{} {}", self.author, self.message)
    }
}

/// Two-slot commit selection. `select` shifts `current` into `previous`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    current: Option<CommitRecord>,
    previous: Option<CommitRecord>,
}

impl SelectionState {
    pub fn select(&mut self, record: CommitRecord) {
        self.previous = self.current.take();
        self.current = Some(record);
    }

    pub fn ready_for_diff(&self) -> bool {
        match (&self.current, &self.previous) {
            (Some(current), Some(previous)) => current.hash != previous.hash,
            _ => false,
        }
    }

    /// Hashes in diff argument order, when a diff is allowed.
    pub fn diff_refs(&self) -> Option<(String, String)> {
        if !self.ready_for_diff() {
            return None;
        }
        let current = self.current.as_ref()?;
        let previous = self.previous.as_ref()?;
        Some((current.hash.clone(), previous.hash.clone()))
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
    }

    pub fn current(&self) -> Option<&CommitRecord> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&CommitRecord> {
        self.previous.as_ref()
    }

    pub fn status_text(&self) -> String {
        let current = self
            .current
            .as_ref()
            .map(|record| record.message.as_str())
            .unwrap_or("(none)");
        let previous = self
            .previous
            .as_ref()
            .map(|record| record.message.as_str())
            .unwrap_or("(none)");
        format!("selected: {current}, prev: {previous}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePane {
    #[default]
    History,
    Content,
}

impl ActivePane {
    pub fn toggled(self) -> Self {
        match self {
            Self::History => Self::Content,
            Self::Content => Self::History,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

impl Dimensions {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Each pane gets half of the terminal width and the full height.
    pub fn pane_size(self) -> (u16, u16) {
        (self.width / 2, self.height)
    }
}
