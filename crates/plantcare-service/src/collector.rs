//! Background refresh loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Background collector that runs a refresh cycle on every tick.
pub struct Collector {
    state: Arc<AppState>,
}

impl Collector {
    /// Create a new collector.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start the refresh loop.
    ///
    /// Returns `false` if it is already running. Returns immediately;
    /// collection happens in the background.
    pub async fn start(&self) -> bool {
        let Some((generation, stop_rx)) = self.state.refresh.begin() else {
            return false;
        };

        let period = self.state.config.dashboard.refresh_interval();
        info!("Starting refresh loop (interval: {} ms)", period.as_millis());

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            refresh_loop(state, period, generation, stop_rx).await;
        });
        true
    }
}

async fn refresh_loop(
    state: Arc<AppState>,
    period: std::time::Duration,
    generation: u64,
    mut stop_rx: watch::Receiver<u64>,
) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_degraded = 0u32;

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow_and_update() != generation {
                    break;
                }
                continue;
            }
        }

        if *stop_rx.borrow() != generation {
            break;
        }

        let snapshot = state.refresh_once().await;
        if snapshot.notices.is_empty() {
            if consecutive_degraded > 0 {
                info!("Devices responding again after {} degraded cycles", consecutive_degraded);
            }
            consecutive_degraded = 0;
            debug!("Cycle {} published", snapshot.cycle);
        } else {
            consecutive_degraded += 1;
            if consecutive_degraded == 1 {
                warn!(
                    "Cycle {} completed with {} notice(s)",
                    snapshot.cycle,
                    snapshot.notices.len()
                );
            }
        }
    }

    info!("Refresh loop stopped");
}
