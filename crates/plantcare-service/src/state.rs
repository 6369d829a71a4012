//! Application state shared across handlers.
//!
//! # Session
//!
//! The dashboard keeps a single [`Session`] behind an async mutex. Nobody holds
//! the lock across a device request: the refresh task copies a
//! [`CycleContext`] out, polls the devices unlocked and relocks only to commit
//! the results. API handlers likewise lock only to read the mode or to commit
//! a change the controller accepted.
//!
//! # Broadcast Channel Behavior
//!
//! Every refresh cycle publishes a [`Snapshot`] on `snapshots_tx`:
//!
//! - **Buffer size**: Configurable via `server.broadcast_buffer` (default: 16)
//! - **Message loss**: A subscriber that falls behind skips the oldest snapshots
//! - **No blocking**: The refresh task never waits for WebSocket clients

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock, broadcast, watch};

use plantcare_core::{
    ClassifierHandle, CycleContext, CycleOptions, CycleOutcome, PlantDevice, Session, Snapshot,
    collect_cycle,
};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// Configuration, fixed at startup.
    pub config: Config,
    /// The controller and camera.
    pub device: Arc<dyn PlantDevice>,
    /// Disease classifier, loaded once at startup.
    pub classifier: ClassifierHandle,
    /// The dashboard session.
    pub session: Mutex<Session>,
    /// Broadcast channel for snapshots.
    pub snapshots_tx: broadcast::Sender<Arc<Snapshot>>,
    /// Most recent snapshot.
    pub latest: RwLock<Option<Arc<Snapshot>>>,
    /// Most recent camera frame.
    pub latest_frame: RwLock<Option<Bytes>>,
    /// Refresh loop control state.
    pub refresh: RefreshState,
}

impl AppState {
    /// Create new application state with a fresh session.
    pub fn new(
        config: Config,
        device: Arc<dyn PlantDevice>,
        classifier: ClassifierHandle,
    ) -> Arc<Self> {
        let (snapshots_tx, _) = broadcast::channel(config.server.broadcast_buffer.max(1));
        let session = Session::new(config.session_options());
        Arc::new(Self {
            config,
            device,
            classifier,
            session: Mutex::new(session),
            snapshots_tx,
            latest: RwLock::new(None),
            latest_frame: RwLock::new(None),
            refresh: RefreshState::new(),
        })
    }

    /// Run one refresh cycle and publish its snapshot.
    pub async fn refresh_once(&self) -> Arc<Snapshot> {
        let options = CycleOptions {
            auto_actuate: self.config.dashboard.auto_actuate,
            capture: true,
        };
        let cycle = self.refresh.next_cycle();

        let context = CycleContext::from_session(&*self.session.lock().await);
        let results = collect_cycle(
            self.device.as_ref(),
            &self.classifier,
            context,
            options,
            cycle,
        )
        .await;
        let outcome = results.commit(&mut *self.session.lock().await);

        self.publish(outcome).await
    }

    /// Store a cycle outcome as the latest state and broadcast it.
    pub async fn publish(&self, outcome: CycleOutcome) -> Arc<Snapshot> {
        let snapshot = Arc::new(outcome.snapshot);
        self.refresh
            .record_cycle(snapshot.timestamp, !snapshot.notices.is_empty());

        if let Some(frame) = outcome.frame {
            *self.latest_frame.write().await = Some(frame);
        }
        *self.latest.write().await = Some(Arc::clone(&snapshot));

        // No subscribers is fine.
        let _ = self.snapshots_tx.send(Arc::clone(&snapshot));
        snapshot
    }
}

/// State for tracking and controlling the refresh loop.
///
/// Each start bumps a generation number; a running loop exits as soon as the
/// generation differs from the one it was started with.
pub struct RefreshState {
    running: AtomicBool,
    /// When the loop was started (Unix timestamp).
    started_at: AtomicU64,
    generation_tx: watch::Sender<u64>,
    cycles: AtomicU64,
    degraded_cycles: AtomicU64,
    last_cycle_at: AtomicU64,
}

impl RefreshState {
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            running: AtomicBool::new(false),
            started_at: AtomicU64::new(0),
            generation_tx,
            cycles: AtomicU64::new(0),
            degraded_cycles: AtomicU64::new(0),
            last_cycle_at: AtomicU64::new(0),
        }
    }

    /// Check if the refresh loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the loop as started and return its generation and stop receiver.
    ///
    /// Returns `None` if the loop is already running.
    pub fn begin(&self) -> Option<(u64, watch::Receiver<u64>)> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
        self.started_at.store(now, Ordering::SeqCst);

        self.generation_tx.send_modify(|g| *g += 1);
        let rx = self.generation_tx.subscribe();
        let generation = *rx.borrow();
        Some((generation, rx))
    }

    /// Signal the running loop to stop. Returns `false` if it was not running.
    pub fn signal_stop(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.generation_tx.send_modify(|g| *g += 1);
        true
    }

    /// Get the loop start time.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        timestamp(self.started_at.load(Ordering::SeqCst))
    }

    /// Reserve the number of the next cycle (starting at 1).
    pub fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Number of cycles that produced at least one notice.
    pub fn degraded_cycles(&self) -> u64 {
        self.degraded_cycles.load(Ordering::SeqCst)
    }

    pub fn last_cycle_at(&self) -> Option<OffsetDateTime> {
        timestamp(self.last_cycle_at.load(Ordering::SeqCst))
    }

    fn record_cycle(&self, at: OffsetDateTime, degraded: bool) {
        self.last_cycle_at
            .store(at.unix_timestamp().max(1) as u64, Ordering::SeqCst);
        if degraded {
            self.degraded_cycles.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Default for RefreshState {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp(ts: u64) -> Option<OffsetDateTime> {
    if ts == 0 {
        None
    } else {
        OffsetDateTime::from_unix_timestamp(ts as i64).ok()
    }
}
