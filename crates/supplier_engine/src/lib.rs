//! Supplier engine: lookup client, retry loop, persistence and the batch scheduler.
mod input;
mod lookup;
mod persist;
mod retry;
mod scheduler;
mod scrape;
mod types;

pub use input::{list_input_files, read_postcodes, InputError, InputFile};
pub use lookup::{
    extract_envelope_html, LookupSettings, ReqwestLookup, SupplierLookup, DEFAULT_ENDPOINT,
};
pub use persist::{
    ensure_output_dir, read_json_or_default, write_json_pretty, AtomicFileWriter, PersistError,
    ProgressLedger, ResultStore,
};
pub use retry::{lookup_with_retries, RetryPolicy};
pub use scheduler::{BatchScheduler, RunConfig, RunError, RunSummary};
pub use scrape::{scrape_supplier, ScrapedFields};
pub use types::{LookupError, LookupFailure};
