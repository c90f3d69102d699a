//! Progress state for bounded-concurrency batches.
//!
//! The tracker only records state; callers decide how to report it (tool
//! output, tracing events).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::StreamExt;
use serde::Serialize;

const FAILURE_SNIPPET: usize = 50;

/// State of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Already available; nothing to do.
    Existing,
    /// In flight.
    Processing,
    /// Done.
    Completed,
    /// Failed with the first 50 characters of the error.
    Failed(String),
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing => f.write_str("existing"),
            Self::Processing => f.write_str("processing"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// A failed item with its full error.
#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    /// Item ID.
    pub id: String,
    /// 1-based position, 0 when unknown.
    pub index: usize,
    /// Error text.
    pub error: String,
}

/// Point-in-time counts.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    /// Items in the batch.
    pub total: usize,
    /// Items already available.
    pub existing: usize,
    /// Items in flight.
    pub processing: usize,
    /// Items done.
    pub completed: usize,
    /// Items failed.
    pub failed: usize,
    /// `existing + completed + failed`.
    pub processed: usize,
    /// Seconds since the tracker was created.
    pub elapsed_secs: f64,
    /// Estimated seconds remaining.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<f64>,
    /// Failures in the order they happened.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_items: Vec<FailedItem>,
}

#[derive(Debug, Default)]
struct State {
    status: HashMap<String, ItemStatus>,
    index: HashMap<String, usize>,
    progress: HashMap<String, (u64, u64)>,
    failed: Vec<(String, String)>,
}

/// Thread-safe per-item status board.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    started: Instant,
    state: Mutex<State>,
}

impl ProgressTracker {
    /// Track a batch of `total` items.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self { total, started: Instant::now(), state: Mutex::new(State::default()) }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the 1-based position of an item.
    pub fn set_index(&self, id: &str, index: usize) {
        self.state().index.insert(id.to_string(), index);
    }

    /// Mark an item as already available.
    pub fn set_existing(&self, id: &str) {
        self.state().status.insert(id.to_string(), ItemStatus::Existing);
    }

    /// Mark an item as in flight.
    pub fn set_processing(&self, id: &str) {
        self.state().status.insert(id.to_string(), ItemStatus::Processing);
    }

    /// Record unit progress (bytes, pages) for an in-flight item.
    pub fn update_progress(&self, id: &str, current: u64, total: u64) {
        self.state().progress.insert(id.to_string(), (current, total));
    }

    /// Mark an item as done.
    pub fn set_completed(&self, id: &str) {
        let mut state = self.state();
        state.status.insert(id.to_string(), ItemStatus::Completed);
        state.progress.remove(id);
    }

    /// Mark an item as failed.
    pub fn set_failed(&self, id: &str, error: &str) {
        let snippet: String = error.chars().take(FAILURE_SNIPPET).collect();
        let mut state = self.state();
        state.status.insert(id.to_string(), ItemStatus::Failed(snippet));
        state.progress.remove(id);
        state.failed.push((id.to_string(), error.to_string()));
    }

    /// Current status of an item.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<ItemStatus> {
        self.state().status.get(id).cloned()
    }

    /// Unit progress of an in-flight item.
    #[must_use]
    pub fn item_progress(&self, id: &str) -> Option<(u64, u64)> {
        self.state().progress.get(id).copied()
    }

    /// Snapshot of every count.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state();
        let count = |pred: fn(&ItemStatus) -> bool| state.status.values().filter(|s| pred(s)).count();

        let existing = count(|s| matches!(s, ItemStatus::Existing));
        let processing = count(|s| matches!(s, ItemStatus::Processing));
        let completed = count(|s| matches!(s, ItemStatus::Completed));
        let failed = count(|s| matches!(s, ItemStatus::Failed(_)));
        let processed = existing + completed + failed;

        let elapsed = self.started.elapsed();
        let failed_items = state
            .failed
            .iter()
            .map(|(id, error)| FailedItem {
                id: id.clone(),
                index: state.index.get(id).copied().unwrap_or(0),
                error: error.clone(),
            })
            .collect();

        ProgressSnapshot {
            total: self.total,
            existing,
            processing,
            completed,
            failed,
            processed,
            elapsed_secs: elapsed.as_secs_f64(),
            eta_secs: eta(elapsed, processed, self.total).map(|d| d.as_secs_f64()),
            failed_items,
        }
    }
}

fn eta(elapsed: Duration, processed: usize, total: usize) -> Option<Duration> {
    if processed == 0 || processed >= total {
        return None;
    }
    let per_item = elapsed.as_secs_f64() / processed as f64;
    Some(Duration::from_secs_f64(per_item * (total - processed) as f64))
}

/// Outcome of [`run_parallel`].
#[derive(Debug)]
pub struct ParallelRun<R> {
    /// Successful results in input order, with their IDs.
    pub results: Vec<(String, R)>,
    /// Repeated IDs that were run only once.
    pub duplicates: usize,
    /// Final tracker state.
    pub progress: ProgressSnapshot,
}

/// Run `task` over `ids` with at most `concurrency` in flight.
///
/// Each distinct ID runs once, at the position of its first occurrence.
/// Failures are recorded on the tracker and do not stop the batch.
pub async fn run_parallel<R, E, F, Fut>(ids: &[String], concurrency: usize, task: F) -> ParallelRun<R>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: fmt::Display,
{
    let mut seen = HashSet::new();
    let unique: Vec<(usize, String)> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| seen.insert(id.as_str()))
        .map(|(i, id)| (i, id.clone()))
        .collect();
    let duplicates = ids.len() - unique.len();
    let tracker = ProgressTracker::new(unique.len());

    let mut results: Vec<(usize, String, R)> = futures::stream::iter(unique)
        .map(|(i, id)| {
            let tracker = &tracker;
            let task = &task;
            async move {
                let id = &id;
                tracker.set_index(id, i + 1);
                tracker.set_processing(id);
                match task(id.clone()).await {
                    Ok(value) => {
                        tracker.set_completed(id);
                        Some((i, id.clone(), value))
                    }
                    Err(e) => {
                        tracing::warn!(%id, error = %e, "batch item failed");
                        tracker.set_failed(id, &e.to_string());
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|r| async move { r })
        .collect()
        .await;

    results.sort_by_key(|(i, _, _)| *i);
    let progress = tracker.snapshot();
    tracing::info!(
        total = progress.total,
        completed = progress.completed,
        failed = progress.failed,
        duplicates,
        "batch finished"
    );

    ParallelRun {
        results: results.into_iter().map(|(_, id, r)| (id, r)).collect(),
        duplicates,
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let tracker = ProgressTracker::new(4);
        tracker.set_existing("a");
        tracker.set_processing("b");
        tracker.update_progress("b", 512, 1024);
        tracker.set_completed("c");
        tracker.set_index("d", 4);
        tracker.set_failed("d", &"x".repeat(80));

        assert_eq!(tracker.item_progress("b"), Some((512, 1024)));
        assert_eq!(tracker.status("d").unwrap().to_string(), format!("failed: {}", "x".repeat(50)));

        let snap = tracker.snapshot();
        assert_eq!((snap.existing, snap.processing, snap.completed, snap.failed), (1, 1, 1, 1));
        assert_eq!(snap.processed, 3);
        assert_eq!(snap.failed_items[0].index, 4);
        assert_eq!(snap.failed_items[0].error.len(), 80);
    }

    #[test]
    fn test_completion_clears_unit_progress() {
        let tracker = ProgressTracker::new(1);
        tracker.update_progress("a", 1, 2);
        tracker.set_completed("a");
        assert_eq!(tracker.item_progress("a"), None);
        assert!(tracker.snapshot().eta_secs.is_none());
    }

    #[test]
    fn test_eta() {
        assert_eq!(eta(Duration::from_secs(10), 0, 4), None);
        assert_eq!(eta(Duration::from_secs(10), 2, 4), Some(Duration::from_secs(10)));
        assert_eq!(eta(Duration::from_secs(10), 4, 4), None);
    }

    #[tokio::test]
    async fn test_run_parallel_keeps_order_and_failures() {
        let ids: Vec<String> = (1..=6).map(|i| format!("W{i}")).collect();
        let run = run_parallel(&ids, 3, |id| async move {
            if id == "W4" { Err(format!("{id} not found")) } else { Ok(id.len()) }
        })
        .await;

        let got: Vec<&str> = run.results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(got, ["W1", "W2", "W3", "W5", "W6"]);
        assert_eq!(run.progress.completed, 5);
        assert_eq!(run.progress.failed, 1);
        assert_eq!(run.progress.failed_items[0].id, "W4");
        assert_eq!(run.progress.failed_items[0].index, 4);
        assert_eq!(run.duplicates, 0);
    }

    #[tokio::test]
    async fn test_run_parallel_runs_duplicates_once() {
        let ids: Vec<String> = ["W1", "W2", "W1", "W3", "W2"].map(String::from).to_vec();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let run = run_parallel(&ids, 2, |id| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move { if id == "W2" { Err("gone") } else { Ok(id) } }
        })
        .await;

        assert_eq!(calls.into_inner(), 3);
        assert_eq!(run.duplicates, 2);
        assert_eq!(run.progress.total, 3);
        assert_eq!(run.progress.completed + run.progress.failed, run.progress.total);
        assert_eq!(run.progress.failed_items.len(), 1);
        assert_eq!(run.progress.failed_items[0].index, 2);
        let got: Vec<&str> = run.results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(got, ["W1", "W3"]);
    }
}
