use serde::{Deserialize, Serialize};

/// Persisted resume point for a run.
///
/// `last_postcode` is a position inside `last_file` only; it carries no
/// meaning on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub last_file: String,
    #[serde(default)]
    pub last_postcode: String,
    #[serde(default)]
    pub completed: bool,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the resume point to `postcode` within `file`.
    pub fn record(&mut self, file: &str, postcode: &str) {
        if self.last_file != file {
            self.last_file = file.to_string();
        }
        self.last_postcode = postcode.to_string();
    }

    /// Forget the in-file position once a file has been fully processed.
    pub fn finish_file(&mut self) {
        self.last_postcode.clear();
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }
}

/// Tracks the highest file index the ledger has been moved to.
///
/// Results inside a batch complete in any order, so a record is only allowed
/// to move the ledger when its index is past everything recorded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileCursor {
    high_water: Option<usize>,
}

impl FileCursor {
    /// Cursor for a file where processing starts at `start`; everything
    /// before `start` is treated as already recorded.
    pub fn starting_at(start: usize) -> Self {
        Self {
            high_water: start.checked_sub(1),
        }
    }

    /// Returns true and raises the mark if `index` is past it.
    pub fn advance(&mut self, index: usize) -> bool {
        match self.high_water {
            Some(mark) if index <= mark => false,
            _ => {
                self.high_water = Some(index);
                true
            }
        }
    }

    pub fn high_water(&self) -> Option<usize> {
        self.high_water
    }
}
