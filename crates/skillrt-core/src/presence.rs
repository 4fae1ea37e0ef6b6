//! Background presence tracking.
//!
//! [`PresenceTracker`] wraps a refresh function with a staleness-triggered,
//! single-flight scheduler: foreground callers invoke [`PresenceTracker::trigger`]
//! on every request and it returns immediately, starting at most one
//! background refresh when the last success is older than `max_age`.
//! [`PresenceBook`] holds the per-skill [`PresenceRecord`]s the standard
//! registry refresh writes.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use skillrt_types::error::SkillError;
use skillrt_types::presence::PresenceRecord;
use skillrt_types::skill::SkillDef;
use tokio::sync::watch;

use crate::skill::registry::{RefreshReport, SkillRegistry};

// ---------------------------------------------------------------------------
// Presence book
// ---------------------------------------------------------------------------

/// Per-skill presence records, written only by the tracker's refresh.
#[derive(Debug, Default)]
pub struct PresenceBook {
    records: DashMap<SkillDef, PresenceRecord>,
    last_report: RwLock<Option<RefreshReport>>,
}

impl PresenceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a refresh report's observations into the book.
    pub fn apply(&self, report: &RefreshReport) {
        for obs in &report.observations {
            let mut record = self.records.entry(obs.def.clone()).or_default();
            let from = record.status;
            if !record.observe(&obs.observation, report.finished_at) {
                tracing::debug!(
                    skill = %obs.def,
                    %from,
                    to = %obs.observation.status(),
                    "Ignoring disallowed presence transition"
                );
            }
        }
        let mut last = self.last_report.write().unwrap_or_else(|e| e.into_inner());
        *last = Some(report.clone());
    }

    pub fn get(&self, def: &SkillDef) -> Option<PresenceRecord> {
        self.records.get(def).map(|r| r.value().clone())
    }

    /// Every record, ordered by definition.
    pub fn entries(&self) -> Vec<(SkillDef, PresenceRecord)> {
        let mut entries: Vec<_> = self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn last_report(&self) -> Option<RefreshReport> {
        self.last_report
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// The refresh operation a tracker schedules.
pub type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), SkillError>> + Send + Sync>;

#[derive(Debug, Default)]
struct TrackerState {
    running: bool,
    closed: bool,
    last_success: Option<Instant>,
}

struct TrackerInner {
    refresh: RefreshFn,
    max_age: Duration,
    state: Mutex<TrackerState>,
    /// Bumped after every completed refresh, success or not.
    done: watch::Sender<u64>,
    runs: AtomicU64,
}

impl TrackerInner {
    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_stale(&self, state: &TrackerState) -> bool {
        state
            .last_success
            .is_none_or(|at| at.elapsed() >= self.max_age)
    }

    /// Run the refresh once. The caller must have set `running`.
    async fn run_refresh(&self) -> Result<(), SkillError> {
        let started = Instant::now();
        let result = match AssertUnwindSafe((self.refresh)()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(panic = %message, "Presence refresh panicked");
                Err(SkillError::Io(format!("refresh panicked: {message}")))
            }
        };

        {
            let mut state = self.state();
            state.running = false;
            if result.is_ok() {
                state.last_success = Some(Instant::now());
            }
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.done.send_modify(|n| *n += 1);

        match &result {
            Ok(()) => tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Presence refresh completed"
            ),
            Err(e) => tracing::warn!(error = %e, "Presence refresh failed"),
        }
        result
    }
}

/// Single-flight, staleness-triggered background refresh scheduler.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct PresenceTracker {
    inner: Arc<TrackerInner>,
}

impl PresenceTracker {
    pub fn new(refresh: RefreshFn, max_age: Duration) -> Self {
        let (done, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackerInner {
                refresh,
                max_age,
                state: Mutex::new(TrackerState::default()),
                done,
                runs: AtomicU64::new(0),
            }),
        }
    }

    /// The standard tracker: refresh the registry and record what it saw.
    ///
    /// A refresh counts as failed only when every source failed.
    pub fn for_registry(
        registry: Arc<SkillRegistry>,
        book: Arc<PresenceBook>,
        max_age: Duration,
    ) -> Self {
        let refresh: RefreshFn = Arc::new(move || {
            let registry = Arc::clone(&registry);
            let book = Arc::clone(&book);
            async move {
                let report = registry.refresh().await;
                book.apply(&report);
                if report.failed {
                    return Err(report.first_error().unwrap_or(SkillError::SourceUnavailable {
                        source_id: "registry".to_owned(),
                        reason: "every source failed".to_owned(),
                    }));
                }
                if let Some(err) = report.first_error() {
                    tracing::warn!(error = %err, "Partial registry refresh");
                }
                Ok(())
            }
            .boxed()
        });
        Self::new(refresh, max_age)
    }

    /// Start a background refresh if none is running and the last success is
    /// stale. Returns whether one was started. Never blocks.
    pub fn trigger(&self) -> bool {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!("Presence trigger outside a tokio runtime, ignoring");
                return false;
            }
        };

        {
            let mut state = self.inner.state();
            if state.closed || state.running || !self.inner.is_stale(&state) {
                return false;
            }
            state.running = true;
        }

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            let _ = inner.run_refresh().await;
        });
        true
    }

    /// Run a refresh inline, after any in-flight one finishes.
    pub async fn force(&self) -> Result<(), SkillError> {
        let mut done = self.inner.done.subscribe();
        loop {
            {
                let mut state = self.inner.state();
                if !state.running {
                    state.running = true;
                    break;
                }
            }
            if done.changed().await.is_err() {
                break;
            }
        }
        self.inner.run_refresh().await
    }

    /// Stop accepting triggers and wait for any in-flight refresh.
    pub async fn close(&self) {
        self.inner.state().closed = true;
        self.wait_idle().await;
    }

    /// Wait until no refresh is running.
    pub async fn wait_idle(&self) {
        let mut done = self.inner.done.subscribe();
        while self.is_running() {
            if done.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state().running
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.inner.state().last_success
    }

    /// Completed refreshes, including failures.
    pub fn refresh_count(&self) -> u64 {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// A receiver that changes after every completed refresh.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.done.subscribe()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::registry::fixtures::{LenHasher, ScriptedSource};
    use skillrt_types::presence::PresenceStatus;
    use skillrt_types::skill::{SkillFilter, SkillKind};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn counting_refresh(count: Arc<AtomicUsize>, gate: Option<Arc<Notify>>) -> RefreshFn {
        Arc::new(move || {
            let count = Arc::clone(&count);
            let gate = gate.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                Ok::<(), SkillError>(())
            }
            .boxed()
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_triggers_run_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let tracker = PresenceTracker::new(
            counting_refresh(Arc::clone(&count), Some(Arc::clone(&gate))),
            Duration::from_secs(3600),
        );

        assert!(tracker.trigger());
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.trigger() })
            })
            .collect();
        for handle in handles {
            assert!(!handle.await.unwrap());
        }

        gate.notify_one();
        tracker.wait_idle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.refresh_count(), 1);
        assert!(tracker.last_success().is_some());
    }

    #[tokio::test]
    async fn fresh_success_suppresses_trigger() {
        let count = Arc::new(AtomicUsize::new(0));
        let tracker =
            PresenceTracker::new(counting_refresh(Arc::clone(&count), None), Duration::from_secs(3600));

        tracker.force().await.unwrap();
        assert!(!tracker.trigger());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_max_age_always_triggers() {
        let count = Arc::new(AtomicUsize::new(0));
        let tracker =
            PresenceTracker::new(counting_refresh(Arc::clone(&count), None), Duration::ZERO);

        assert!(tracker.trigger());
        tracker.wait_idle().await;
        assert!(tracker.trigger());
        tracker.wait_idle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    fn failing_scan() -> BoxFuture<'static, Result<(), SkillError>> {
        async { Err(SkillError::Io("disk on fire".to_owned())) }.boxed()
    }

    fn exploding_scan() -> BoxFuture<'static, Result<(), SkillError>> {
        async { panic!("scan exploded") }.boxed()
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_success() {
        let refresh: RefreshFn = Arc::new(failing_scan);
        let tracker = PresenceTracker::new(refresh, Duration::from_secs(3600));

        assert!(tracker.force().await.is_err());
        assert!(tracker.last_success().is_none());
        // Still stale, so a trigger starts another attempt.
        assert!(tracker.trigger());
        tracker.wait_idle().await;
        assert_eq!(tracker.refresh_count(), 2);
    }

    #[tokio::test]
    async fn panicking_refresh_is_contained() {
        let refresh: RefreshFn = Arc::new(exploding_scan);
        let tracker = PresenceTracker::new(refresh, Duration::from_secs(3600));

        assert!(tracker.trigger());
        tracker.wait_idle().await;

        assert!(!tracker.is_running());
        assert!(tracker.last_success().is_none());
        let err = tracker.force().await.unwrap_err();
        assert!(err.to_string().contains("scan exploded"));
    }

    #[tokio::test]
    async fn close_waits_and_disables_trigger() {
        let count = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let tracker = PresenceTracker::new(
            counting_refresh(Arc::clone(&count), Some(Arc::clone(&gate))),
            Duration::ZERO,
        );

        assert!(tracker.trigger());
        let closer = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.close().await })
        };
        gate.notify_one();
        closer.await.unwrap();

        assert!(tracker.is_closed());
        assert!(!tracker.is_running());
        assert!(!tracker.trigger());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn trigger_outside_runtime_is_noop() {
        let count = Arc::new(AtomicUsize::new(0));
        let tracker = PresenceTracker::new(counting_refresh(count, None), Duration::ZERO);
        assert!(!tracker.trigger());
        assert!(!tracker.is_running());
    }

    #[tokio::test]
    async fn registry_tracker_records_presence() {
        let source = ScriptedSource::new("fs", SkillKind::Filesystem);
        source.set_skills(&[("pdf", "p"), ("docx", "d")]);
        let registry = Arc::new(SkillRegistry::new(
            vec![source.clone()],
            Box::new(LenHasher),
        ));
        let book = Arc::new(PresenceBook::new());
        let tracker =
            PresenceTracker::for_registry(Arc::clone(&registry), Arc::clone(&book), Duration::ZERO);

        tracker.force().await.unwrap();
        let pdf = registry.resolve_name("pdf", &SkillFilter::all()).unwrap();
        assert_eq!(book.get(&pdf.def).unwrap().status, PresenceStatus::Present);

        source.set_skills(&[("docx", "d")]);
        tracker.force().await.unwrap();
        let record = book.get(&pdf.def).unwrap();
        assert_eq!(record.status, PresenceStatus::Missing);
        assert!(record.missing_since.is_some());

        source.fail("unmounted");
        assert!(tracker.force().await.is_err());
        let docx = registry.resolve_name("docx", &SkillFilter::all()).unwrap();
        assert_eq!(book.get(&docx.def).unwrap().status, PresenceStatus::Error);
        assert!(book.last_report().unwrap().failed);
        assert_eq!(book.entries().len(), 2);
    }

    #[tokio::test]
    async fn failed_source_then_removed_skill_stays_error() {
        let source = ScriptedSource::new("fs", SkillKind::Filesystem);
        let other = ScriptedSource::new("extra", SkillKind::Filesystem);
        source.set_skills(&[("pdf", "p")]);
        other.set_skills(&[("docx", "d")]);
        let registry = Arc::new(SkillRegistry::new(
            vec![source.clone(), other.clone()],
            Box::new(LenHasher),
        ));
        let book = Arc::new(PresenceBook::new());
        let tracker =
            PresenceTracker::for_registry(Arc::clone(&registry), Arc::clone(&book), Duration::ZERO);

        tracker.force().await.unwrap();
        let pdf = registry.resolve_name("pdf", &SkillFilter::all()).unwrap();

        source.fail("unmounted");
        tracker.force().await.unwrap();
        assert_eq!(book.get(&pdf.def).unwrap().status, PresenceStatus::Error);

        source.set_skills(&[]);
        tracker.force().await.unwrap();
        let record = book.get(&pdf.def).unwrap();
        assert_eq!(record.status, PresenceStatus::Error);
        assert!(record.missing_since.is_none());
        let edges: Vec<String> = record
            .transitions
            .iter()
            .map(|t| format!("{}->{}", t.from, t.to))
            .collect();
        assert_eq!(edges, vec!["unknown->present", "present->error"]);

        source.set_skills(&[("pdf", "p")]);
        tracker.force().await.unwrap();
        assert_eq!(book.get(&pdf.def).unwrap().status, PresenceStatus::Present);
    }
}
