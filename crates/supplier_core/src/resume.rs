use crate::ProgressState;

/// Index of the file to resume from. `file_names` must already be sorted.
///
/// An empty or unknown `last_file` starts from the first file.
pub fn resume_file_index(file_names: &[String], progress: &ProgressState) -> usize {
    if progress.last_file.is_empty() {
        return 0;
    }
    file_names
        .iter()
        .position(|name| *name == progress.last_file)
        .unwrap_or(0)
}

/// Index of the first postcode to process in `file_name`.
///
/// Resumes at the entry after `last_postcode` when the ledger points into this
/// file; returns `postcodes.len()` if that was the final entry.
pub fn resume_postcode_index(
    postcodes: &[String],
    file_name: &str,
    progress: &ProgressState,
) -> usize {
    if progress.last_file != file_name || progress.last_postcode.is_empty() {
        return 0;
    }
    postcodes
        .iter()
        .position(|postcode| *postcode == progress.last_postcode)
        .map(|idx| idx + 1)
        .unwrap_or(0)
}
