use std::path::PathBuf;
use std::sync::Arc;

use supplier_core::{
    resume_file_index, resume_postcode_index, BatchPlanner, FileCursor, PendingPostcode,
    PostcodeRecord, ProgressState, ResultSet,
};
use supplier_logging::{supplier_debug, supplier_error, supplier_info};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::input::{list_input_files, read_postcodes, InputError};
use crate::persist::{PersistError, ProgressLedger, ResultStore};
use crate::retry::{lookup_with_retries, RetryPolicy};
use crate::SupplierLookup;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub progress_path: PathBuf,
    pub results_path: PathBuf,
    pub retry: RetryPolicy,
    /// Upper bound on lookups in flight; also the batch width.
    pub max_concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("ALLCODECSV"),
            progress_path: PathBuf::from("progress.json"),
            results_path: PathBuf::from("water_suppliers_results.json"),
            retry: RetryPolicy::default(),
            max_concurrency: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub files_processed: usize,
    pub looked_up: usize,
    pub committed: usize,
    pub skipped: usize,
    pub not_found: usize,
    /// The ledger was already marked complete; nothing was done.
    pub already_complete: bool,
}

/// Startup failures. Anything after startup is logged, not returned.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load progress")]
    Progress(#[source] PersistError),
    #[error("failed to load existing results")]
    Results(#[source] PersistError),
    #[error("failed to list input files")]
    Input(#[from] InputError),
}

/// Drives retry-wrapped lookups over the input corpus in bounded batches and
/// checkpoints progress as records are committed.
pub struct BatchScheduler {
    config: RunConfig,
    lookup: Arc<dyn SupplierLookup>,
    ledger: ProgressLedger,
    store: ResultStore,
}

impl BatchScheduler {
    pub fn new(config: RunConfig, lookup: Arc<dyn SupplierLookup>) -> Self {
        let ledger = ProgressLedger::new(config.progress_path.clone());
        let store = ResultStore::new(config.results_path.clone());
        Self {
            config,
            lookup,
            ledger,
            store,
        }
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let mut progress = self.ledger.load().map_err(RunError::Progress)?;
        let mut results = self.store.load().map_err(RunError::Results)?;
        let mut summary = RunSummary::default();

        if progress.completed {
            supplier_info!(
                "Progress file {:?} marks the run as completed; nothing to do",
                self.ledger.path()
            );
            summary.already_complete = true;
            return Ok(summary);
        }

        supplier_info!(
            "Loaded {} existing results from {:?}",
            results.len(),
            self.store.path()
        );

        let files = list_input_files(&self.config.input_dir)?;
        let names: Vec<String> = files.iter().map(|file| file.name.clone()).collect();
        let start_file = resume_file_index(&names, &progress);

        for (file_idx, file) in files.iter().enumerate().skip(start_file) {
            supplier_info!("Processing file: {}", file.name);

            let postcodes = match read_postcodes(&file.path) {
                Ok(postcodes) => postcodes,
                Err(err) => {
                    supplier_error!("Error reading CSV file {:?}: {}", file.path, err);
                    continue;
                }
            };

            let start = resume_postcode_index(&postcodes, &file.name, &progress);
            if start > 0 {
                match postcodes.get(start) {
                    Some(next) => supplier_info!(
                        "Resuming from postcode {} (after {})",
                        next,
                        progress.last_postcode
                    ),
                    None => supplier_info!(
                        "All postcodes in {} were already processed",
                        file.name
                    ),
                }
            }

            let mut cursor = FileCursor::starting_at(start);
            let mut planner = BatchPlanner::new(&postcodes, start, self.config.max_concurrency);
            while let Some(batch) = planner.next_batch(&results) {
                for skipped in &batch.skipped {
                    supplier_info!(
                        "Skipping already processed postcode: {}",
                        skipped.postcode
                    );
                }
                summary.skipped += batch.skipped.len();
                if batch.entries.is_empty() {
                    continue;
                }
                supplier_debug!(
                    "{}: batch of {} at indices {:?}, ledger at {:?}",
                    file.name,
                    batch.entries.len(),
                    batch.entries.iter().map(|p| p.index).collect::<Vec<_>>(),
                    cursor.high_water()
                );

                let mut ledger_moved = false;
                for (pending, record) in self.dispatch(batch.entries).await {
                    summary.looked_up += 1;
                    if !record.is_found() {
                        summary.not_found += 1;
                        continue;
                    }
                    if !results.insert(record) {
                        continue;
                    }
                    summary.committed += 1;
                    if cursor.advance(pending.index) {
                        progress.record(&file.name, &pending.postcode);
                        ledger_moved = true;
                    }
                }

                // The ledger must never point past records that are not on disk.
                if ledger_moved && self.save_results(&results) {
                    self.save_progress(&progress);
                }
            }

            if self.save_results(&results) {
                supplier_info!("Saved {} results after {}", results.len(), file.name);
            }
            summary.files_processed += 1;

            if file_idx + 1 < files.len() {
                progress.finish_file();
                self.save_progress(&progress);
            }
        }

        progress.mark_completed();
        self.save_progress(&progress);

        supplier_info!(
            "Processing completed: {} files, {} lookups, {} committed, {} not found, {} skipped",
            summary.files_processed,
            summary.looked_up,
            summary.committed,
            summary.not_found,
            summary.skipped
        );
        Ok(summary)
    }

    /// Runs one batch concurrently and waits for all of it.
    ///
    /// Results are returned in completion order, not input order.
    async fn dispatch(&self, entries: Vec<PendingPostcode>) -> Vec<(PendingPostcode, PostcodeRecord)> {
        let mut tasks = JoinSet::new();
        for pending in entries {
            let lookup = Arc::clone(&self.lookup);
            let policy = self.config.retry.clone();
            tasks.spawn(async move {
                let record = lookup_with_retries(lookup.as_ref(), &pending.postcode, &policy).await;
                (pending, record)
            });
        }

        let mut completed = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => completed.push(pair),
                Err(err) => supplier_error!("Lookup task failed: {}", err),
            }
        }
        completed
    }

    fn save_progress(&self, progress: &ProgressState) {
        if let Err(err) = self.ledger.save(progress) {
            supplier_error!(
                "Error saving progress to {:?}: {}",
                self.ledger.path(),
                err
            );
        }
    }

    fn save_results(&self, results: &ResultSet) -> bool {
        match self.store.save(results) {
            Ok(()) => {
                supplier_debug!("Results saved to {:?}", self.store.path());
                true
            }
            Err(err) => {
                supplier_error!(
                    "Error writing results to {:?}: {}",
                    self.store.path(),
                    err
                );
                false
            }
        }
    }
}
