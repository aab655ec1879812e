//! Match log
//!
//! User-visible history of a match: setup failures, hits, kills, flag
//! captures. Setup errors are reported here instead of interrupting the
//! simulation loop. Entries also mirror to the `log` facade at debug level.

use serde::{Deserialize, Serialize};

/// Describes the kind of entry added to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    /// Information about the game setup
    Setup,
    /// Basic game information
    General,
    /// Positive participant changes
    ParticipantPositive,
    /// Negative participant changes
    ParticipantNegative,
    /// Additional game information
    Debug,
    /// Participant chat entries
    Chat,
}

/// One entry in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
}

/// Log history manager. Entries are stored in chronological order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameLog {
    entries: Vec<LogEntry>,
}

impl GameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: LogKind, text: impl Into<String>) {
        let text = text.into();
        log::debug!("game log [{kind:?}]: {text}");
        self.entries.push(LogEntry { kind, text });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_chronological_order() {
        let mut log = GameLog::new();
        log.add(LogKind::Setup, "board loaded");
        log.add(LogKind::General, "game started");
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].text, "board loaded");
        assert_eq!(log.entries()[1].kind, LogKind::General);
    }
}
