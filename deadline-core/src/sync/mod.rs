//! Runs reconciliation passes against a live remote store.

pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::constants::{CREDENTIAL_FAILURE_THRESHOLD, DEFAULT_PACING, REMOTE_TIMEOUT};
use crate::deadline::Deadline;
use crate::error::{DeadlineError, DeadlineResult};
use crate::event::RemoteEvent;
use crate::reconcile::{MutationKind, ReconcileContext, SideEffectSink, SyncPlan, reconcile};
use crate::remote::{CalendarRef, RemoteStore};

pub use state::{MemoryStateStore, SyncState, SyncStateStore};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Deadlines are mirrored into the first calendar whose name starts with this.
    pub calendar_prefix: String,
    /// Delay after each mutating remote call.
    pub pacing: Duration,
}

impl SyncOptions {
    pub fn new(calendar_prefix: impl Into<String>) -> Self {
        SyncOptions {
            calendar_prefix: calendar_prefix.into(),
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// Result of a single pass, as returned by [`SyncDriver::request_sync`].
#[derive(Debug)]
pub struct SyncReport<S> {
    pub result: DeadlineResult<bool>,
    pub sink: S,
}

/// Drives reconciliation passes. Cloning shares the in-flight guard and state.
pub struct SyncDriver<R> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    remote: R,
    store: Box<dyn SyncStateStore>,
    state: Mutex<SyncState>,
    last_plan: Mutex<Option<SyncPlan>>,
    in_flight: AtomicBool,
    options: SyncOptions,
}

impl<R> Clone for SyncDriver<R> {
    fn clone(&self) -> Self {
        SyncDriver {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Clears the in-flight flag when the pass ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: RemoteStore> SyncDriver<R> {
    pub fn new(
        remote: R,
        store: impl SyncStateStore + 'static,
        options: SyncOptions,
    ) -> DeadlineResult<Self> {
        let state = store.load()?;
        debug!("Loaded sync state: {state:?}");
        Ok(SyncDriver {
            inner: Arc::new(Inner {
                remote,
                store: Box::new(store),
                state: Mutex::new(state),
                last_plan: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                options,
            }),
        })
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    /// Snapshot of the cross-pass state.
    pub async fn state(&self) -> SyncState {
        *self.inner.state.lock().await
    }

    /// Mutations of the last pass that reached the remote calendar.
    pub async fn last_plan(&self) -> Option<SyncPlan> {
        self.inner.last_plan.lock().await.clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Run one pass now.
    ///
    /// Returns `Ok(true)` when the calendar converged, `Ok(false)` when the pass was
    /// skipped (no calendar, transient remote failure). Fails with
    /// [`DeadlineError::SyncInProgress`] while another pass is running. A sink that
    /// cannot write its side effects fails the pass without touching the sync state.
    pub async fn run_once<S>(&self, open: &[Deadline], sink: &mut S) -> DeadlineResult<bool>
    where
        S: SideEffectSink + Send + ?Sized,
    {
        self.run_once_at(open, sink, Local::now()).await
    }

    /// [`run_once`](Self::run_once) with an explicit "now".
    pub async fn run_once_at<S>(
        &self,
        open: &[Deadline],
        sink: &mut S,
        now: DateTime<Local>,
    ) -> DeadlineResult<bool>
    where
        S: SideEffectSink + Send + ?Sized,
    {
        let _guard =
            InFlightGuard::acquire(&self.inner.in_flight).ok_or(DeadlineError::SyncInProgress)?;

        let outcome = self.pass(open, sink, now).await;
        let mut state = self.inner.state.lock().await;

        let result = match outcome {
            Ok(Some(plan)) => {
                let (inserted, deleted) = plan.counts();
                info!("Sync finished: {inserted} added, {deleted} deleted");
                state.last_successful_sync = Some(now.with_timezone(&Utc));
                state.consecutive_failures = 0;
                *self.inner.last_plan.lock().await = Some(plan);
                Ok(true)
            }
            Ok(None) => {
                state.consecutive_failures = 0;
                Ok(false)
            }
            Err(e) if e.is_transient() => {
                warn!("Sync skipped, will retry on the next pass: {e}");
                return Ok(false);
            }
            Err(e) if e.is_local() => {
                error!("Sync aborted, local files not updated: {e}");
                return Err(e);
            }
            Err(e) => {
                state.consecutive_failures += 1;
                error!(
                    "Sync failed ({} in a row): {e}",
                    state.consecutive_failures
                );
                if state.consecutive_failures > CREDENTIAL_FAILURE_THRESHOLD {
                    warn!("Too many failed passes, dropping cached credentials");
                    if let Err(invalidate_err) = self.inner.remote.invalidate_credentials().await {
                        warn!("Could not drop credentials: {invalidate_err}");
                    }
                    state.consecutive_failures = 0;
                }
                Err(e)
            }
        };

        self.inner.store.save(&state)?;
        result
    }

    /// Start a pass in the background unless one is already running.
    ///
    /// Returns `None` when a pass is in flight. The handle resolves to the pass
    /// result together with the sink; dropping it detaches the pass.
    pub fn request_sync<S>(&self, open: Vec<Deadline>, sink: S) -> Option<JoinHandle<SyncReport<S>>>
    where
        R: 'static,
        S: SideEffectSink + Send + 'static,
    {
        if self.is_syncing() {
            info!("Sync already running, request ignored");
            return None;
        }

        let driver = self.clone();
        Some(tokio::spawn(async move {
            let mut sink = sink;
            let result = driver.run_once(&open, &mut sink).await;
            SyncReport { result, sink }
        }))
    }

    async fn pass<S>(
        &self,
        open: &[Deadline],
        sink: &mut S,
        now: DateTime<Local>,
    ) -> DeadlineResult<Option<SyncPlan>>
    where
        S: SideEffectSink + Send + ?Sized,
    {
        let remote = &self.inner.remote;
        let prefix = &self.inner.options.calendar_prefix;

        let Some(calendar) = with_timeout(remote.find_calendar(prefix)).await? else {
            warn!("{}", DeadlineError::CalendarNotFound(prefix.clone()));
            return Ok(None);
        };
        debug!("Using calendar {} ({})", calendar.name, calendar.id);

        let events = self.list_all(&calendar).await?;
        let last_sync = self.inner.state.lock().await.last_successful_sync;

        let plan = reconcile(open, &events, &ReconcileContext::new(now, last_sync), sink)?;
        self.apply(&calendar, &plan).await?;

        Ok(Some(plan))
    }

    async fn list_all(&self, calendar: &CalendarRef) -> DeadlineResult<Vec<RemoteEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = with_timeout(
                self.inner
                    .remote
                    .list_events(calendar, page_token.as_deref()),
            )
            .await?;
            events.extend(page.events);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(events)
    }

    /// Apply mutations one at a time, inserts first.
    async fn apply(&self, calendar: &CalendarRef, plan: &SyncPlan) -> DeadlineResult<()> {
        let remote = &self.inner.remote;
        for mutation in &plan.mutations {
            match mutation.kind {
                MutationKind::Insert => {
                    let inserted = with_timeout(remote.insert_event(calendar, &mutation.event)).await?;
                    info!("Added {inserted}");
                }
                MutationKind::Delete => {
                    let id = mutation.event.id.as_deref().ok_or_else(|| {
                        DeadlineError::Invariant(format!(
                            "remote entry without identifier scheduled for deletion: {}",
                            mutation.event
                        ))
                    })?;
                    with_timeout(remote.delete_event(calendar, id)).await?;
                    info!("Deleted {}", mutation.event);
                }
            }
            if !self.inner.options.pacing.is_zero() {
                tokio::time::sleep(self.inner.options.pacing).await;
            }
        }
        Ok(())
    }
}

async fn with_timeout<T>(call: impl Future<Output = DeadlineResult<T>>) -> DeadlineResult<T> {
    timeout(REMOTE_TIMEOUT, call)
        .await
        .map_err(|_| DeadlineError::Transient(format!("no response within {}s", REMOTE_TIMEOUT.as_secs())))?
}
