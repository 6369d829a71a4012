//! One dashboard refresh cycle.
//!
//! [`collect_cycle`] polls every sensor, fetches the controller's thresholds,
//! evaluates the actuator statuses, optionally drives the actuators, grabs a
//! camera frame and classifies it. Device calls are made one after another.
//! A failing call never aborts the cycle: the value is left out and a
//! [`Notice`] explains why.
//!
//! Collection only reads a [`CycleContext`] copied out of the session, so a
//! shared session does not have to stay locked while the devices answer.
//! [`CycleResults::commit`] then merges the results back. [`run_cycle`] does
//! both for callers that own their session.

use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use plantcare_types::{
    ActuatorStatus, Classification, Command, Mode, MoisturePoint, SensorKind, SensorReading,
    ThresholdSet,
};

use crate::classifier::{ClassifierHandle, ClassifierState};
use crate::error::Error;
use crate::session::Session;
use crate::thresholds::{ActuatorTargets, Evaluator, Readings};
use crate::traits::PlantDevice;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible message attached to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    /// What produced the notice, e.g. `"soil"` or `"camera"`.
    pub source: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, source: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            source: source.to_string(),
            message: message.into(),
        }
    }

    /// Downgrade an error to a notice. Network failures are warnings.
    pub fn from_error(source: &str, error: &Error) -> Self {
        let level = if error.is_unreachable() {
            NoticeLevel::Warning
        } else {
            NoticeLevel::Error
        };
        Self::new(level, source, error.to_string())
    }
}

/// Metadata of the frame captured this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub bytes: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// Everything the dashboard shows after one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub session_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub mode: Mode,
    pub readings: Readings,
    /// Flat list of the readings taken this cycle.
    pub sensors: Vec<SensorReading>,
    /// Thresholds the statuses were evaluated against.
    pub thresholds: ThresholdSet,
    pub status: ActuatorStatus,
    pub moisture: Vec<MoisturePoint>,
    pub frame: Option<FrameInfo>,
    pub classification: Option<Classification>,
    pub classifier: ClassifierState,
    pub notices: Vec<Notice>,
    /// Commands sent by automatic actuation this cycle.
    pub auto_dispatched: Vec<Command>,
}

/// Per-cycle switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOptions {
    /// Drive the actuators from the evaluated statuses while in auto mode.
    pub auto_actuate: bool,
    /// Capture a camera frame if a camera is configured.
    pub capture: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            auto_actuate: false,
            capture: true,
        }
    }
}

/// Result of a cycle: the snapshot plus the raw frame, if any.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub snapshot: Snapshot,
    pub frame: Option<Bytes>,
}

/// Session values a cycle reads before it talks to the devices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleContext {
    pub session_id: Uuid,
    pub mode: Mode,
    /// Thresholds to fall back on when the controller's cannot be read.
    pub thresholds: ThresholdSet,
    pub last_auto: ActuatorTargets,
}

impl CycleContext {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id,
            mode: session.mode,
            thresholds: session.effective_thresholds(),
            last_auto: session.last_auto,
        }
    }
}

/// What a cycle collected from the devices, not yet merged into a session.
#[derive(Debug, Clone)]
pub struct CycleResults {
    cycle: u64,
    context: CycleContext,
    timestamp: OffsetDateTime,
    readings: Readings,
    sensors: Vec<SensorReading>,
    device_thresholds: Option<ThresholdSet>,
    thresholds: ThresholdSet,
    status: ActuatorStatus,
    auto_dispatched: Vec<Command>,
    frame: Option<Bytes>,
    frame_info: Option<FrameInfo>,
    classification: Option<Classification>,
    classifier: ClassifierState,
    notices: Vec<Notice>,
}

impl CycleResults {
    /// Merge the results into `session` and build the snapshot.
    ///
    /// Nothing is recorded if the session was reset while the cycle ran.
    /// Auto targets are only recorded while the session is still in auto mode.
    pub fn commit(self, session: &mut Session) -> CycleOutcome {
        if session.id == self.context.session_id {
            if let Some(soil) = self.readings.soil {
                session.moisture.push(MoisturePoint {
                    timestamp: self.timestamp,
                    value: soil,
                });
            }
            if self.device_thresholds.is_some() {
                session.device_thresholds = self.device_thresholds;
            }
            if session.mode == Mode::Auto {
                for command in &self.auto_dispatched {
                    session.last_auto.record(*command);
                }
            }
        } else {
            debug!(
                "Session reset during cycle {}, results not recorded",
                self.cycle
            );
        }

        let snapshot = Snapshot {
            cycle: self.cycle,
            session_id: session.id,
            timestamp: self.timestamp,
            mode: self.context.mode,
            readings: self.readings,
            sensors: self.sensors,
            thresholds: self.thresholds,
            status: self.status,
            moisture: session.moisture.to_vec(),
            frame: self.frame_info,
            classification: self.classification,
            classifier: self.classifier,
            notices: self.notices,
            auto_dispatched: self.auto_dispatched,
        };

        CycleOutcome {
            snapshot,
            frame: self.frame,
        }
    }
}

/// Run one refresh cycle against `device` and merge it into `session`.
pub async fn run_cycle<D>(
    device: &D,
    classifier: &ClassifierHandle,
    session: &mut Session,
    options: CycleOptions,
    cycle: u64,
) -> CycleOutcome
where
    D: PlantDevice + ?Sized,
{
    let context = CycleContext::from_session(session);
    collect_cycle(device, classifier, context, options, cycle)
        .await
        .commit(session)
}

/// Poll the devices for one cycle without touching any session.
pub async fn collect_cycle<D>(
    device: &D,
    classifier: &ClassifierHandle,
    context: CycleContext,
    options: CycleOptions,
    cycle: u64,
) -> CycleResults
where
    D: PlantDevice + ?Sized,
{
    let now = OffsetDateTime::now_utc();
    let mut notices = Vec::new();
    let mut sensors = Vec::new();
    let mut readings = Readings::default();

    match device.read_soil().await {
        Ok(soil) => {
            readings.soil = Some(soil);
            sensors.push(SensorReading::new(SensorKind::Soil, soil as f64, now));
        }
        Err(e) => record_failure(&mut notices, "soil", &e),
    }

    match device.read_climate().await {
        Ok(climate) => {
            readings.climate = Some(climate);
            sensors.push(SensorReading::new(
                SensorKind::Temperature,
                climate.temperature as f64,
                now,
            ));
            sensors.push(SensorReading::new(
                SensorKind::Humidity,
                climate.humidity as f64,
                now,
            ));
        }
        Err(e) => record_failure(&mut notices, "climate", &e),
    }

    match device.read_light().await {
        Ok(light) => {
            readings.light = Some(light);
            sensors.push(SensorReading::new(SensorKind::Light, light.raw() as f64, now));
        }
        Err(e) => record_failure(&mut notices, "light", &e),
    }

    let device_thresholds = match device.read_thresholds().await {
        Ok(thresholds) => Some(thresholds),
        Err(e) => {
            record_failure(&mut notices, "thresholds", &e);
            None
        }
    };

    let thresholds = device_thresholds.unwrap_or(context.thresholds);
    let status = Evaluator::new(thresholds).evaluate(&readings, context.mode);

    let mut auto_dispatched = Vec::new();
    if options.auto_actuate && context.mode == Mode::Auto {
        let targets = ActuatorTargets::from_status(&status);
        for command in targets.changes_since(&context.last_auto) {
            match device.send_command(command).await {
                Ok(()) => {
                    debug!("Auto actuation: {}", command);
                    auto_dispatched.push(command);
                }
                Err(e) => record_failure(&mut notices, "auto", &e),
            }
        }
    }

    let mut frame = None;
    let mut frame_info = None;
    let mut classification = None;
    if options.capture && device.has_camera() {
        match device.capture().await {
            Ok(bytes) => {
                frame_info = Some(FrameInfo {
                    bytes: bytes.len(),
                    captured_at: OffsetDateTime::now_utc(),
                });
                match classifier.classify(bytes.clone()).await {
                    Some(Ok(c)) => classification = Some(c),
                    Some(Err(e)) => record_failure(&mut notices, "classifier", &e),
                    None => {}
                }
                frame = Some(bytes);
            }
            Err(e) => record_failure(&mut notices, "camera", &e),
        }
    }

    debug!(
        "Cycle {} complete: {} readings, {} notices",
        cycle,
        sensors.len(),
        notices.len()
    );

    CycleResults {
        cycle,
        context,
        timestamp: now,
        readings,
        sensors,
        device_thresholds,
        thresholds,
        status,
        auto_dispatched,
        frame,
        frame_info,
        classification,
        classifier: classifier.state(),
        notices,
    }
}

fn record_failure(notices: &mut Vec<Notice>, source: &str, error: &Error) {
    warn!("{} failed: {}", source, error);
    notices.push(Notice::from_error(source, error));
}
