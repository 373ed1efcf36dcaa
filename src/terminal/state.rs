use ratatui::widgets::ListState;

use crate::domain::search::{FileType, SearchFilters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Term,
    FileType,
    StartDate,
    EndDate,
    List,
}

impl Focus {
    const ORDER: [Focus; 5] = [
        Focus::Term,
        Focus::FileType,
        Focus::StartDate,
        Focus::EndDate,
        Focus::List,
    ];

    pub fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn is_text_field(self) -> bool {
        matches!(self, Focus::Term | Focus::StartDate | Focus::EndDate)
    }
}

/// Terminal-only state: form inputs, focus and list cursor. Everything that
/// matters beyond drawing lives in `App`.
#[derive(Debug, Default)]
pub struct UiState {
    pub term: String,
    pub file_type: FileType,
    pub start_date: String,
    pub end_date: String,

    pub focus: Focus,
    pub list_state: ListState,

    /// Shown while a blocking backend call runs.
    pub busy: Option<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> anyhow::Result<SearchFilters> {
        SearchFilters::from_inputs(&self.term, self.file_type, &self.start_date, &self.end_date)
    }

    /// The text field under focus, if any.
    pub fn field_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Term => Some(&mut self.term),
            Focus::StartDate => Some(&mut self.start_date),
            Focus::EndDate => Some(&mut self.end_date),
            Focus::FileType | Focus::List => None,
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.list_state.selected()
    }

    pub fn move_cursor(&mut self, delta: i32, len: usize) {
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let cur = self.list_state.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, len as i32 - 1) as usize;
        self.list_state.select(Some(next));
    }

    /// After a new result list: cursor on the first row, focus on the list
    /// when there is something to pick.
    pub fn reset_results(&mut self, len: usize) {
        if len == 0 {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(0));
            self.focus = Focus::List;
        }
    }

    pub fn reset_form(&mut self) {
        *self = Self::default();
    }
}
