use serde::{Deserialize, Serialize};

/// Sentinel stored in any field the lookup could not resolve.
pub const NOT_FOUND: &str = "Not Found";

/// Resolved supplier details for one postcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostcodeRecord {
    pub postcode: String,
    pub supplier: String,
    pub phone: String,
    pub link: String,
}

impl PostcodeRecord {
    /// A record with every field set to [`NOT_FOUND`].
    pub fn not_found(postcode: impl Into<String>) -> Self {
        Self {
            postcode: postcode.into(),
            supplier: NOT_FOUND.to_string(),
            phone: NOT_FOUND.to_string(),
            link: NOT_FOUND.to_string(),
        }
    }

    /// True when a supplier name was scraped, even if phone or link are missing.
    pub fn is_found(&self) -> bool {
        !self.supplier.is_empty() && self.supplier != NOT_FOUND
    }
}
