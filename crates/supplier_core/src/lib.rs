//! Supplier core: pure data model and batch arithmetic for resumable lookups.
//!
//! Nothing in this crate touches the network or the filesystem. The engine
//! crate drives these types and persists them.
mod batch;
mod progress;
mod record;
mod results;
mod resume;

pub use batch::{Batch, BatchPlanner, PendingPostcode};
pub use progress::{FileCursor, ProgressState};
pub use record::{PostcodeRecord, NOT_FOUND};
pub use results::ResultSet;
pub use resume::{resume_file_index, resume_postcode_index};
