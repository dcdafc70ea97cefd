use std::collections::HashSet;

use crate::PostcodeRecord;

/// Committed records in commit order, plus the skip-set keyed by postcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    records: Vec<PostcodeRecord>,
    seen: HashSet<String>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from previously stored records. The first record for a postcode wins.
    pub fn from_records(records: impl IntoIterator<Item = PostcodeRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.insert(record);
        }
        set
    }

    /// Insert a record; returns `false` if the postcode is already present.
    pub fn insert(&mut self, record: PostcodeRecord) -> bool {
        if !self.seen.insert(record.postcode.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, postcode: &str) -> bool {
        self.seen.contains(postcode)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PostcodeRecord] {
        &self.records
    }
}
