//! Per-dashboard session context.
//!
//! A [`Session`] holds everything the refresh cycle and the manual controls
//! share: the control mode, the thresholds, and the moisture history. It is
//! passed explicitly to the functions that need it.

use time::OffsetDateTime;
use uuid::Uuid;

use plantcare_types::{Mode, ThresholdSet};

use crate::series::{DEFAULT_CAPACITY, MoistureSeries};
use crate::thresholds::ActuatorTargets;

/// Values a new session starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    /// Configured thresholds.
    pub thresholds: ThresholdSet,
    /// Capacity of the moisture series.
    pub history_len: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSet::default(),
            history_len: DEFAULT_CAPACITY,
        }
    }
}

/// State carried across refresh cycles.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: OffsetDateTime,
    pub mode: Mode,
    /// Thresholds last applied from the dashboard (or the configured ones).
    pub thresholds: ThresholdSet,
    /// Thresholds last fetched back from the controller.
    pub device_thresholds: Option<ThresholdSet>,
    pub moisture: MoistureSeries,
    /// Targets last dispatched by automatic actuation.
    pub last_auto: ActuatorTargets,
    options: SessionOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: OffsetDateTime::now_utc(),
            mode: Mode::default(),
            thresholds: options.thresholds,
            device_thresholds: None,
            moisture: MoistureSeries::new(options.history_len),
            last_auto: ActuatorTargets::default(),
            options,
        }
    }

    /// Replace this session with a fresh one built from the same options.
    pub fn reset(&mut self) {
        *self = Self::new(self.options);
    }

    /// Switch mode. Auto targets are stale after a manual period, so they are dropped.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.last_auto = ActuatorTargets::default();
    }

    /// Thresholds to evaluate against: the device's if known, else the configured ones.
    pub fn effective_thresholds(&self) -> ThresholdSet {
        self.device_thresholds.unwrap_or(self.thresholds)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}
