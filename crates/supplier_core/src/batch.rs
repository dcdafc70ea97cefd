use std::collections::HashSet;

use crate::ResultSet;

/// A postcode waiting to be looked up, with its position in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPostcode {
    pub index: usize,
    pub postcode: String,
}

/// One unit of concurrent dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    pub entries: Vec<PendingPostcode>,
    /// Entries passed over because they were already resolved.
    pub skipped: Vec<PendingPostcode>,
}

/// Walks one file's postcodes and cuts them into batches of at most `width`.
///
/// Batches are produced lazily so that records committed by an earlier batch
/// are skipped by later ones within the same file.
#[derive(Debug, Clone)]
pub struct BatchPlanner<'a> {
    postcodes: &'a [String],
    next: usize,
    width: usize,
}

impl<'a> BatchPlanner<'a> {
    /// `width` is clamped to at least one.
    pub fn new(postcodes: &'a [String], start: usize, width: usize) -> Self {
        Self {
            postcodes,
            next: start.min(postcodes.len()),
            width: width.max(1),
        }
    }

    /// Returns the next batch, or `None` once the file is exhausted.
    ///
    /// A returned batch may have no entries if everything it covered was
    /// skipped.
    pub fn next_batch(&mut self, resolved: &ResultSet) -> Option<Batch> {
        if self.next >= self.postcodes.len() {
            return None;
        }

        let postcodes = self.postcodes;
        let mut batch = Batch::default();
        let mut in_batch = HashSet::new();
        while batch.entries.len() < self.width && self.next < postcodes.len() {
            let index = self.next;
            self.next += 1;
            let postcode = &postcodes[index];
            let pending = PendingPostcode {
                index,
                postcode: postcode.clone(),
            };
            if resolved.contains(postcode) || !in_batch.insert(postcode.as_str()) {
                batch.skipped.push(pending);
            } else {
                batch.entries.push(pending);
            }
        }
        Some(batch)
    }

    pub fn remaining(&self) -> usize {
        self.postcodes.len() - self.next
    }
}
