//! Integration tests for coalesced rebuilds and change filtering.

use foldex::watcher::{ChangeFilter, Rebuild, RebuildWorker};
use foldex::{ChangeEvent, ChangeKind, FileSystemWatcher, IgnoreRuleSet, WalkOptions, WatcherConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// Rebuild job that blocks until the test releases it.
struct GatedJob {
    calls: AtomicUsize,
    started: Notify,
    release: Semaphore,
}

impl GatedJob {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            started: Notify::new(),
            release: Semaphore::new(0),
        })
    }
}

impl Rebuild for GatedJob {
    async fn rebuild(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.acquire().await?.forget();
        Ok(())
    }
}

async fn wait_started(job: &GatedJob) {
    tokio::time::timeout(Duration::from_secs(5), job.started.notified())
        .await
        .expect("rebuild did not start");
}

#[tokio::test]
async fn test_single_flight_with_one_follow_up() {
    let job = GatedJob::new();
    let worker = RebuildWorker::spawn(job.clone());

    assert!(worker.request());
    wait_started(&job).await;

    // One rebuild in flight; the first extra request queues, the rest fold into it
    let queued: Vec<bool> = (0..5).map(|_| worker.request()).collect();
    assert_eq!(queued, vec![true, false, false, false, false]);

    job.release.add_permits(1);
    wait_started(&job).await;
    job.release.add_permits(1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(job.calls.load(Ordering::SeqCst), 2);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_idle_requests_each_run() {
    let job = GatedJob::new();
    job.release.add_permits(10);
    let worker = RebuildWorker::spawn(job.clone());

    for expected in 1..=3 {
        assert!(worker.request());
        wait_started(&job).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(job.calls.load(Ordering::SeqCst), expected);
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn test_requests_after_shutdown_are_refused() {
    let job = GatedJob::new();
    let worker = RebuildWorker::spawn(job.clone());
    let handle = worker.handle();

    worker.shutdown().await;
    assert!(!handle.request());
    assert_eq!(job.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_filter_uses_active_rules() {
    let compiler = foldex::RuleCompiler::new();
    let rules = compiler.compile(["vendor*"], foldex::MatchOptions::default());
    let filter = ChangeFilter::new("/proj", rules, WalkOptions::default());

    assert!(!filter.accepts(&ChangeEvent::new("/proj/vendor-x/lib", ChangeKind::Removed)));
    assert!(filter.accepts(&ChangeEvent::new("/proj/lib/old", ChangeKind::Removed)));
    assert!(!filter.accepts(&ChangeEvent::new("/proj/lib/old.rs", ChangeKind::Removed)));
    assert!(!filter.accepts(&ChangeEvent::new("/proj/lib/untitled folder 2", ChangeKind::Removed)));
}

#[test]
fn test_filter_hidden_entries() {
    let options = WalkOptions {
        ignore_hidden: true,
        ..WalkOptions::default()
    };
    let filter = ChangeFilter::new("/proj", IgnoreRuleSet::empty(), options);
    assert!(!filter.accepts(&ChangeEvent::new("/proj/.hidden/sub", ChangeKind::Removed)));
    assert!(filter.accepts(&ChangeEvent::new("/proj/shown", ChangeKind::Removed)));
}

#[tokio::test]
async fn test_watcher_reports_new_directory() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let root = std::fs::canonicalize(temp_dir.path()).unwrap();

    let (_watcher, mut events) =
        FileSystemWatcher::new(&root, WatcherConfig { debounce_ms: 50 }).unwrap();

    // Give the backend a moment to register the watch
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::create_dir(root.join("made")).unwrap();

    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            if event.path.ends_with("made") {
                return Some(event);
            }
        }
        None
    })
    .await
    .expect("no event within timeout")
    .expect("event stream closed");

    assert_eq!(found.kind, ChangeKind::Changed);
}
