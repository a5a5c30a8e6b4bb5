//! Room cleanup: inactivity and explicit-expiry sweeps, plus the periodic
//! scheduler that runs them.
//!
//! Both sweeps are idempotent and safe to interleave with live traffic.
//! At most one cleanup run is in flight at a time; an invocation that
//! finds a run already in progress is a no-op.

use crate::state::AppState;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Delete rooms that are older than the inactivity window, currently empty,
/// and whose last activity is also older than the window. Returns the codes
/// of deleted rooms.
pub fn sweep_inactive(state: &AppState, now: Instant) -> Vec<String> {
    let window = Duration::from_secs(state.config.room.inactivity_window_secs);
    let mut deleted = Vec::new();

    for room in state.registry.all() {
        if state.is_protected(&room.code) {
            continue;
        }
        let created_age = now.saturating_duration_since(room.created_at);
        let idle_age = now.saturating_duration_since(room.last_activity);
        if created_age > window && idle_age > window && state.room_is_empty(&room.code) {
            if state.delete_room(&room.code).is_some() {
                deleted.push(room.code);
            }
        }
    }

    if deleted.is_empty() {
        tracing::debug!("Inactivity sweep: nothing to delete");
    } else {
        tracing::info!(
            count = deleted.len(),
            rooms = %deleted.join(", "),
            "Inactivity sweep deleted rooms"
        );
    }
    deleted
}

/// Delete rooms whose explicit expiry deadline has passed, regardless of
/// whether they still have active members. Returns the codes deleted.
pub fn sweep_expired(state: &AppState, now: Instant) -> Vec<String> {
    let mut deleted = Vec::new();

    for room in state.registry.all() {
        if state.is_protected(&room.code) {
            continue;
        }
        if room.is_expired(now) {
            if state.delete_room(&room.code).is_some() {
                deleted.push(room.code);
            }
        }
    }

    if deleted.is_empty() {
        tracing::debug!("Expiry sweep: nothing to delete");
    } else {
        tracing::info!(
            count = deleted.len(),
            rooms = %deleted.join(", "),
            "Expiry sweep deleted rooms"
        );
    }
    deleted
}

/// Run both sweeps once. Backs the scheduled tick and the operator trigger.
/// Overlapping runs are dropped, not queued: a call that cannot take the
/// sweep lock reports zero deletions.
pub async fn run_all_cleanup(state: &AppState) -> usize {
    let _guard = match state.sweep_lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::debug!("Cleanup already in flight, dropping this run");
            return 0;
        }
    };

    let now = Instant::now();
    let inactive = sweep_inactive(state, now).len();
    let expired = sweep_expired(state, now).len();
    let total = inactive + expired;
    if total > 0 {
        tracing::info!(total, "Cleanup run finished");
    }
    total
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Periodic cleanup lifecycle, owned by the composition root. `start` is
/// idempotent; `stop` cancels the timer and waits for an in-flight sweep.
pub struct CleanupScheduler {
    state: Arc<AppState>,
    inner: Mutex<Option<Running>>,
}

impl CleanupScheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            inner: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut inner = self.inner.lock().expect("scheduler lock poisoned");
        if inner.is_some() {
            tracing::info!("Cleanup scheduler already running, skipping start");
            return;
        }

        let interval_secs = self.state.config.room.cleanup_interval_secs;
        let state = self.state.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        run_all_cleanup(&state).await;
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            tracing::info!("Room cleanup scheduler stopped");
        });

        *inner = Some(Running {
            shutdown: shutdown_tx,
            task,
        });
        tracing::info!(interval_secs, "Room cleanup scheduler started");
    }

    pub async fn stop(&self) {
        let running = self.inner.lock().expect("scheduler lock poisoned").take();
        if let Some(Running { shutdown, task }) = running {
            let _ = shutdown.send(());
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().expect("scheduler lock poisoned").is_some()
    }
}
