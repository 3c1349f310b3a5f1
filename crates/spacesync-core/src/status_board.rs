//! State behind the progress reporter.
//!
//! Callers append timestamped notes and set the phase; every change marks
//! the board dirty. The reporter task renders only dirty boards, which is
//! what keeps external writes bounded no matter how many notes arrive.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of a run shown on the status surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Preparing,
    Roles,
    Categories,
    Channels,
    RollingBack,
    Complete,
    Failed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Preparing => "Preparing",
            Phase::Roles => "Syncing roles",
            Phase::Categories => "Syncing categories",
            Phase::Channels => "Syncing channels",
            Phase::RollingBack => "Rolling back",
            Phase::Complete => "Complete",
            Phase::Failed => "Failed",
        }
    }

    /// RGB accent color for the surface
    pub fn color(&self) -> u32 {
        match self {
            Phase::Preparing => 0x95a5a6,
            Phase::Roles | Phase::Categories | Phase::Channels => 0x3498db,
            Phase::RollingBack => 0xe67e22,
            Phase::Complete => 0x2ecc71,
            Phase::Failed => 0xe74c3c,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// One rendering of the board, ready to write to the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRender {
    pub title: String,
    pub phase: Phase,
    pub color: u32,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct StatusBoard {
    title: String,
    notes: VecDeque<Note>,
    line_cap: usize,
    phase: Phase,
    summary: Option<String>,
    dirty: bool,
}

impl StatusBoard {
    /// A board keeping at most `line_cap` notes (minimum one)
    pub fn new(title: impl Into<String>, line_cap: usize) -> Self {
        let line_cap = line_cap.max(1);
        Self {
            title: title.into(),
            notes: VecDeque::with_capacity(line_cap),
            line_cap,
            phase: Phase::Preparing,
            summary: None,
            dirty: true,
        }
    }

    pub fn note(&mut self, text: impl Into<String>) {
        self.note_at(Utc::now(), text);
    }

    /// Append a note with an explicit timestamp, evicting the oldest past the cap
    pub fn note_at(&mut self, at: DateTime<Utc>, text: impl Into<String>) {
        while self.notes.len() >= self.line_cap {
            self.notes.pop_front();
        }
        self.notes.push_back(Note {
            at,
            text: text.into(),
        });
        self.dirty = true;
    }

    pub fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.dirty = true;
        }
    }

    /// Closing line shown under the notes, e.g. the created/updated/deleted counts
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
        self.dirty = true;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Render and clear the pending-flush flag, or `None` if nothing changed
    pub fn take_dirty(&mut self) -> Option<BoardRender> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.render())
    }

    pub fn render(&self) -> BoardRender {
        let mut lines: Vec<String> = self
            .notes
            .iter()
            .map(|n| format!("`{}` {}", n.at.format("%H:%M:%S"), n.text))
            .collect();
        if let Some(summary) = &self.summary {
            lines.push(String::new());
            lines.push(summary.clone());
        }
        BoardRender {
            title: format!("{} | {}", self.title, self.phase.label()),
            phase: self.phase,
            color: self.phase.color(),
            body: lines.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_notes_are_evicted() {
        let mut board = StatusBoard::new("Sync", 3);
        for i in 0..5 {
            board.note(format!("note {}", i));
        }
        let texts: Vec<&str> = board.notes().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["note 2", "note 3", "note 4"]);
    }

    #[test]
    fn test_take_dirty_clears_flag() {
        let mut board = StatusBoard::new("Sync", 5);
        assert!(board.take_dirty().is_some());
        assert!(board.take_dirty().is_none());

        board.note("created role Officer");
        board.note("created category Clan Wars");
        let render = board.take_dirty();
        assert!(render.is_some());
        assert!(board.take_dirty().is_none());
    }

    #[test]
    fn test_phase_drives_title_and_color() {
        let mut board = StatusBoard::new("Sync", 5);
        board.take_dirty();
        board.set_phase(Phase::Failed);
        let render = board.take_dirty();
        let render = render.as_ref();
        assert_eq!(render.map(|r| r.color), Some(0xe74c3c));
        assert_eq!(render.map(|r| r.title.as_str()), Some("Sync | Failed"));

        board.set_phase(Phase::Failed);
        assert!(!board.is_dirty());
    }

    #[test]
    fn test_summary_is_rendered_last() {
        let mut board = StatusBoard::new("Sync", 5);
        board.note("created role Officer");
        board.set_summary("1 created, 0 updated, 0 deleted");
        let body = board.render().body;
        assert!(body.ends_with("1 created, 0 updated, 0 deleted"));
    }
}
