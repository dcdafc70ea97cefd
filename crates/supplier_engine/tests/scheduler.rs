use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use supplier_core::{PostcodeRecord, ProgressState, NOT_FOUND};
use supplier_engine::{
    BatchScheduler, LookupError, RetryPolicy, RunConfig, RunError, SupplierLookup,
};
use tempfile::TempDir;

/// Answers every postcode with a supplier unless told otherwise, and records
/// what it was asked and how many calls overlapped.
#[derive(Default)]
struct RecordingLookup {
    missing: HashSet<String>,
    hanging: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingLookup {
    fn with_missing(missing: &[&str]) -> Self {
        Self {
            missing: missing.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn called_set(&self) -> BTreeSet<String> {
        self.calls().into_iter().collect()
    }
}

#[async_trait::async_trait]
impl SupplierLookup for RecordingLookup {
    async fn lookup(&self, postcode: &str) -> Result<PostcodeRecord, LookupError> {
        self.calls.lock().unwrap().push(postcode.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hanging.contains(postcode) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.missing.contains(postcode) {
            return Ok(PostcodeRecord::not_found(postcode));
        }
        Ok(PostcodeRecord {
            postcode: postcode.to_string(),
            supplier: format!("Supplier for {postcode}"),
            phone: "0345 000 0000".to_string(),
            link: NOT_FOUND.to_string(),
        })
    }
}

struct Workspace {
    _temp: TempDir,
    input_dir: PathBuf,
    config: RunConfig,
}

impl Workspace {
    fn new() -> Self {
        supplier_logging::initialize_for_tests();
        let temp = TempDir::new().unwrap();
        let input_dir = temp.path().join("codes");
        fs::create_dir(&input_dir).unwrap();
        let config = RunConfig {
            input_dir: input_dir.clone(),
            progress_path: temp.path().join("progress.json"),
            results_path: temp.path().join("results.json"),
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
            max_concurrency: 3,
        };
        Self {
            _temp: temp,
            input_dir,
            config,
        }
    }

    fn add_file(&self, name: &str, postcodes: &[String]) {
        let mut content = String::new();
        for postcode in postcodes {
            content.push_str(&format!("\"{postcode}\"\n"));
        }
        fs::write(self.input_dir.join(name), content).unwrap();
    }

    fn write_progress(&self, progress: &ProgressState) {
        fs::write(
            &self.config.progress_path,
            serde_json::to_string_pretty(progress).unwrap(),
        )
        .unwrap();
    }

    fn progress(&self) -> ProgressState {
        read_progress(&self.config.progress_path).expect("progress file")
    }

    fn results(&self) -> Vec<PostcodeRecord> {
        let text = fs::read_to_string(&self.config.results_path).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn scheduler(&self, lookup: Arc<RecordingLookup>) -> BatchScheduler {
        BatchScheduler::new(self.config.clone(), lookup)
    }
}

fn read_progress(path: &Path) -> Option<ProgressState> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

fn codes(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| format!("P{i}")).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn not_found_postcode_is_never_committed() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &strings(&["AB1 2CD", "EF3 4GH"]));
    let lookup = Arc::new(RecordingLookup::with_missing(&["AB1 2CD"]));

    let summary = ws.scheduler(lookup.clone()).run().await.unwrap();

    let calls = lookup.calls();
    assert_eq!(calls.iter().filter(|c| *c == "AB1 2CD").count(), 3);
    assert_eq!(calls.iter().filter(|c| *c == "EF3 4GH").count(), 1);

    let results = ws.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].postcode, "EF3 4GH");

    let progress = ws.progress();
    assert_eq!(progress.last_file, "a.csv");
    assert_eq!(progress.last_postcode, "EF3 4GH");
    assert!(progress.completed);
    assert_eq!(summary.committed, 1);
    assert_eq!(summary.not_found, 1);
}

#[tokio::test]
async fn known_postcodes_are_never_looked_up() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=4));
    let existing = vec![PostcodeRecord {
        postcode: "P2".to_string(),
        supplier: "Known Water".to_string(),
        phone: NOT_FOUND.to_string(),
        link: NOT_FOUND.to_string(),
    }];
    fs::write(
        &ws.config.results_path,
        serde_json::to_string(&existing).unwrap(),
    )
    .unwrap();
    let lookup = Arc::new(RecordingLookup::default());

    let summary = ws.scheduler(lookup.clone()).run().await.unwrap();

    assert!(!lookup.calls().contains(&"P2".to_string()));
    assert_eq!(summary.skipped, 1);
    let results = ws.results();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].supplier, "Known Water");
    let unique: HashSet<_> = results.iter().map(|r| r.postcode.clone()).collect();
    assert_eq!(unique.len(), results.len());
}

#[tokio::test]
async fn resumes_immediately_after_last_postcode() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=12));
    ws.write_progress(&ProgressState {
        last_file: "a.csv".to_string(),
        last_postcode: "P6".to_string(),
        completed: false,
    });
    let lookup = Arc::new(RecordingLookup::default());

    ws.scheduler(lookup.clone()).run().await.unwrap();

    let calls = lookup.calls();
    let first_batch: BTreeSet<_> = calls[..3].iter().cloned().collect();
    assert_eq!(first_batch, codes(7..=9).into_iter().collect());
    assert_eq!(lookup.called_set(), codes(7..=12).into_iter().collect());
}

#[tokio::test]
async fn last_postcode_of_file_moves_on_to_next_file() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=3));
    ws.add_file("b.csv", &codes(4..=5));
    ws.write_progress(&ProgressState {
        last_file: "a.csv".to_string(),
        last_postcode: "P3".to_string(),
        completed: false,
    });
    let lookup = Arc::new(RecordingLookup::default());

    ws.scheduler(lookup.clone()).run().await.unwrap();

    assert_eq!(lookup.called_set(), codes(4..=5).into_iter().collect());
    let progress = ws.progress();
    assert_eq!(progress.last_file, "b.csv");
    assert_eq!(progress.last_postcode, "P5");
    assert!(progress.completed);
}

#[tokio::test]
async fn interrupted_run_resumes_after_last_committed_batch() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=12));

    let stalled = Arc::new(RecordingLookup {
        hanging: codes(7..=12).into_iter().collect(),
        ..RecordingLookup::default()
    });
    let scheduler = ws.scheduler(stalled);
    let run = tokio::spawn(async move { scheduler.run().await });

    let mut reached = false;
    for _ in 0..500 {
        if read_progress(&ws.config.progress_path)
            .is_some_and(|progress| progress.last_postcode == "P6")
        {
            reached = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    run.abort();
    let _ = run.await;
    assert!(reached, "second batch never checkpointed");

    let lookup = Arc::new(RecordingLookup::default());
    ws.scheduler(lookup.clone()).run().await.unwrap();

    let called = lookup.called_set();
    assert_eq!(called, codes(7..=12).into_iter().collect());
    assert!(ws.progress().completed);

    let stored: BTreeSet<String> = ws.results().into_iter().map(|r| r.postcode).collect();
    assert_eq!(stored, codes(1..=12).into_iter().collect());
}

#[tokio::test]
async fn completed_run_performs_no_lookups() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=5));
    let first = Arc::new(RecordingLookup::with_missing(&["P3"]));
    ws.scheduler(first).run().await.unwrap();
    assert!(ws.progress().completed);

    let second = Arc::new(RecordingLookup::default());
    let summary = ws.scheduler(second.clone()).run().await.unwrap();
    assert!(summary.already_complete);
    assert!(second.calls().is_empty());
}

#[tokio::test]
async fn never_more_than_bound_lookups_in_flight() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=10));
    let lookup = Arc::new(RecordingLookup {
        delay: Duration::from_millis(20),
        ..RecordingLookup::default()
    });

    let summary = ws.scheduler(lookup.clone()).run().await.unwrap();

    assert_eq!(summary.looked_up, 10);
    assert_eq!(lookup.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn clears_in_file_position_between_files() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=2));
    ws.add_file("b.csv", &codes(3..=4));
    // P3 and P4 never resolve, so b.csv never moves the ledger.
    let lookup = Arc::new(RecordingLookup::with_missing(&["P3", "P4"]));

    let summary = ws.scheduler(lookup).run().await.unwrap();

    let progress = ws.progress();
    assert_eq!(progress.last_file, "a.csv");
    assert!(progress.last_postcode.is_empty());
    assert!(progress.completed);
    assert_eq!(summary.files_processed, 2);
    assert_eq!(ws.results().len(), 2);
}

#[tokio::test]
async fn unreadable_file_is_skipped() {
    let ws = Workspace::new();
    fs::write(ws.input_dir.join("a.csv"), b"\xff\xfe\n").unwrap();
    ws.add_file("b.csv", &codes(1..=2));
    let lookup = Arc::new(RecordingLookup::default());

    let summary = ws.scheduler(lookup.clone()).run().await.unwrap();

    assert_eq!(summary.files_processed, 1);
    assert_eq!(lookup.called_set(), codes(1..=2).into_iter().collect());
    assert!(ws.progress().completed);
}

/// Snapshots the ledger and the results file each time a lookup starts.
struct DiskWatcher {
    progress_path: PathBuf,
    results_path: PathBuf,
    seen: Mutex<Vec<(Option<String>, Vec<String>)>>,
}

#[async_trait::async_trait]
impl SupplierLookup for DiskWatcher {
    async fn lookup(&self, postcode: &str) -> Result<PostcodeRecord, LookupError> {
        let last = read_progress(&self.progress_path).map(|progress| progress.last_postcode);
        let stored = fs::read_to_string(&self.results_path)
            .ok()
            .and_then(|text| serde_json::from_str::<Vec<PostcodeRecord>>(&text).ok())
            .map_or_else(Vec::new, |records| {
                records.into_iter().map(|record| record.postcode).collect()
            });
        self.seen.lock().unwrap().push((last, stored));
        Ok(PostcodeRecord {
            postcode: postcode.to_string(),
            supplier: "Dwr Cymru".to_string(),
            phone: NOT_FOUND.to_string(),
            link: NOT_FOUND.to_string(),
        })
    }
}

#[tokio::test]
async fn ledger_never_points_past_records_on_disk() {
    let mut ws = Workspace::new();
    ws.config.max_concurrency = 1;
    ws.add_file("a.csv", &codes(1..=4));
    let watcher = Arc::new(DiskWatcher {
        progress_path: ws.config.progress_path.clone(),
        results_path: ws.config.results_path.clone(),
        seen: Mutex::new(Vec::new()),
    });

    BatchScheduler::new(ws.config.clone(), watcher.clone())
        .run()
        .await
        .unwrap();

    let seen = watcher.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (None, Vec::new()),
            (Some("P1".to_string()), strings(&["P1"])),
            (Some("P2".to_string()), strings(&["P1", "P2"])),
            (Some("P3".to_string()), strings(&["P1", "P2", "P3"])),
        ]
    );
    assert_eq!(ws.results().len(), 4);
}

#[tokio::test]
async fn missing_input_dir_fails_startup() {
    let ws = Workspace::new();
    fs::remove_dir(&ws.input_dir).unwrap();
    let err = ws
        .scheduler(Arc::new(RecordingLookup::default()))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Input(_)));
}

#[tokio::test]
async fn corrupt_progress_fails_startup() {
    let ws = Workspace::new();
    ws.add_file("a.csv", &codes(1..=1));
    fs::write(&ws.config.progress_path, "not json").unwrap();
    let lookup = Arc::new(RecordingLookup::default());

    let err = ws.scheduler(lookup.clone()).run().await.unwrap_err();
    assert!(matches!(err, RunError::Progress(_)));
    assert!(lookup.calls().is_empty());

    // The cause is reachable through `source`, not repeated in the message.
    assert_eq!(err.to_string(), "failed to load progress");
    let cause = std::error::Error::source(&err).expect("cause").to_string();
    assert!(cause.contains("progress.json"), "{cause}");
}
