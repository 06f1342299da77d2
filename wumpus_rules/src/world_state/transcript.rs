//! Run transcripts - the persisted record of every executed action.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entities::Cell;
use crate::error::RulesError;
use crate::mechanics::Action;

/// One executed action and the cell the agent stood in when taking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub cell: Cell,
    pub action: Action,
}

/// Ordered log of a run. Each line reads `(row,col): ActionName`, with rows
/// counted from the bottom of the grid like [`Cell::x`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action taken while standing in `cell`.
    pub fn record(&mut self, cell: Cell, action: Action) {
        self.entries.push(TranscriptEntry { cell, action });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render one entry as a transcript line.
    pub fn format_entry(&self, entry: &TranscriptEntry) -> String {
        format!(
            "({},{}): {}",
            entry.cell.x,
            entry.cell.y,
            entry.action.display_name()
        )
    }

    /// All transcript lines in order.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| self.format_entry(e)).collect()
    }

    /// Write the transcript to a file, one line per action.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), RulesError> {
        let path = path.as_ref();
        let io_error = |source| RulesError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_string()).map_err(io_error)
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", self.format_entry(entry))?;
        }
        Ok(())
    }
}
