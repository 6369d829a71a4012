//! Core types for PlantCare sensor data and control state.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Sensor channel reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorKind {
    /// Soil moisture in percent.
    Soil,
    /// Air temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Binary light presence from the LDR.
    Light,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Soil => "soil moisture",
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Light => "light",
        };
        f.write_str(name)
    }
}

/// A single scalar reading taken during one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    pub kind: SensorKind,
    pub value: f64,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl SensorReading {
    pub fn new(kind: SensorKind, value: f64, timestamp: OffsetDateTime) -> Self {
        Self {
            kind,
            value,
            timestamp,
        }
    }
}

/// Temperature and humidity as reported by the DHT sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Climate {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

/// Light presence decoded from the LDR endpoint.
///
/// The controller reports `0` when light falls on the sensor and `1` when it
/// is dark. Any other value is kept verbatim so it can be shown as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LightLevel {
    Present,
    Absent,
    Other(i64),
}

impl LightLevel {
    /// Decode the raw LDR value.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => LightLevel::Present,
            1 => LightLevel::Absent,
            other => LightLevel::Other(other),
        }
    }

    /// The raw value as sent by the controller.
    pub fn raw(&self) -> i64 {
        match self {
            LightLevel::Present => 0,
            LightLevel::Absent => 1,
            LightLevel::Other(v) => *v,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LightLevel::Present => "Sunlight Present",
            LightLevel::Absent => "No Sunlight",
            LightLevel::Other(_) => "Unknown light level",
        }
    }
}

/// Inclusive slider range for the soil moisture threshold.
pub const SOIL_RANGE: (u8, u8) = (0, 100);
/// Inclusive slider range for the temperature threshold.
pub const TEMP_RANGE: (f32, f32) = (10.0, 50.0);
/// Slider step for the temperature threshold.
pub const TEMP_STEP: f32 = 0.5;
/// Inclusive slider range for the humidity threshold.
pub const HUM_RANGE: (u8, u8) = (0, 100);

/// Thresholds used by the controller (and the evaluator) in auto mode.
///
/// Values are always within their slider ranges; use [`ThresholdSet::clamped`]
/// to build one from user input.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdSet {
    /// Pump turns on at or below this soil moisture (%).
    pub soil: u8,
    /// Fan turns on above this temperature (°C).
    pub temp: f32,
    /// Fan turns on above this humidity (%).
    pub hum: u8,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            soil: 55,
            temp: 27.5,
            hum: 75,
        }
    }
}

impl ThresholdSet {
    /// Build a threshold set, clamping every value into its slider range.
    ///
    /// Temperature is additionally snapped to the nearest 0.5 °C step.
    /// Non-finite inputs fall back to the range minimum.
    ///
    /// ```
    /// use plantcare_types::ThresholdSet;
    ///
    /// let t = ThresholdSet::clamped(140.0, 27.3, -5.0);
    /// assert_eq!(t.soil, 100);
    /// assert_eq!(t.temp, 27.5);
    /// assert_eq!(t.hum, 0);
    /// ```
    #[must_use]
    pub fn clamped(soil: f64, temp: f64, hum: f64) -> Self {
        Self {
            soil: clamp_percent(soil, SOIL_RANGE),
            temp: clamp_temp(temp),
            hum: clamp_percent(hum, HUM_RANGE),
        }
    }

    /// Query parameters for `/setthresholds`.
    pub fn query(&self) -> [(&'static str, String); 3] {
        [
            ("soil", self.soil.to_string()),
            ("temp", format!("{:.1}", self.temp)),
            ("hum", self.hum.to_string()),
        ]
    }
}

fn clamp_percent(value: f64, (min, max): (u8, u8)) -> u8 {
    if !value.is_finite() {
        return min;
    }
    value.round().clamp(min as f64, max as f64) as u8
}

fn clamp_temp(value: f64) -> f32 {
    let (min, max) = TEMP_RANGE;
    if !value.is_finite() {
        return min;
    }
    let step = TEMP_STEP as f64;
    let snapped = (value / step).round() * step;
    snapped.clamp(min as f64, max as f64) as f32
}

/// Control mode of the dashboard and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// The controller drives actuators from thresholds.
    #[default]
    Auto,
    /// Actuators only move on explicit commands.
    Manual,
}

impl Mode {
    /// Value of the `mode` query parameter for `/setmode`.
    pub fn as_param(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Auto => f.write_str("Auto"),
            Mode::Manual => f.write_str("Manual"),
        }
    }
}

impl FromStr for Mode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "manual" => Ok(Mode::Manual),
            other => Err(ParseError::InvalidValue {
                field: "mode",
                value: other.to_string(),
            }),
        }
    }
}

/// On/off state of a pump, fan or the camera flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn from_bool(on: bool) -> Self {
        if on { Switch::On } else { Switch::Off }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            Switch::On => "on",
            Switch::Off => "off",
        }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Switch::On => f.write_str("ON"),
            Switch::Off => f.write_str("OFF"),
        }
    }
}

/// Requested roof movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RoofCommand {
    Open,
    Close,
}

impl RoofCommand {
    pub fn as_param(&self) -> &'static str {
        match self {
            RoofCommand::Open => "open",
            RoofCommand::Close => "close",
        }
    }
}

/// Roof status derived from the light sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RoofStatus {
    Open,
    Closed,
    /// The light sensor reported a value outside `{0, 1}`.
    Unknown,
}

impl RoofStatus {
    /// The command that would bring the roof into this state, if any.
    pub fn command(&self) -> Option<RoofCommand> {
        match self {
            RoofStatus::Open => Some(RoofCommand::Open),
            RoofStatus::Closed => Some(RoofCommand::Close),
            RoofStatus::Unknown => None,
        }
    }
}

impl fmt::Display for RoofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoofStatus::Open => f.write_str("Open"),
            RoofStatus::Closed => f.write_str("Closed"),
            RoofStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Display status of one actuator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "mode", content = "state", rename_all = "snake_case")
)]
pub enum ChannelStatus<T> {
    /// Status computed from thresholds in auto mode.
    Auto(T),
    /// Manual mode suppresses threshold evaluation.
    ManualActive,
}

impl<T: Copy> ChannelStatus<T> {
    /// The evaluated state, if the channel is in auto mode.
    pub fn auto_state(&self) -> Option<T> {
        match self {
            ChannelStatus::Auto(state) => Some(*state),
            ChannelStatus::ManualActive => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for ChannelStatus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Auto(state) => write!(f, "{} (Auto)", state),
            ChannelStatus::ManualActive => f.write_str("Manual Mode Active"),
        }
    }
}

/// Per-channel display status for one refresh cycle.
///
/// A channel is `None` when its sensor could not be read this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActuatorStatus {
    pub pump: Option<ChannelStatus<Switch>>,
    pub fan: Option<ChannelStatus<Switch>>,
    pub roof: Option<ChannelStatus<RoofStatus>>,
}

/// An actuator command understood by the controller or camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "actuator", content = "state", rename_all = "lowercase")
)]
pub enum Command {
    Pump(Switch),
    Fan(Switch),
    Roof(RoofCommand),
    Flash(Switch),
}

impl Command {
    /// Endpoint path on the device.
    pub fn path(&self) -> &'static str {
        match self {
            Command::Pump(_) => "/manualpump",
            Command::Fan(_) => "/manualfan",
            Command::Roof(_) => "/manualroof",
            Command::Flash(Switch::On) => "/flashon",
            Command::Flash(Switch::Off) => "/flashoff",
        }
    }

    /// Query parameters sent with the command.
    pub fn query(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Command::Pump(s) | Command::Fan(s) => vec![("state", s.as_param())],
            Command::Roof(r) => vec![("state", r.as_param())],
            Command::Flash(_) => Vec::new(),
        }
    }

    /// Whether the command targets the camera module rather than the controller.
    pub fn targets_camera(&self) -> bool {
        matches!(self, Command::Flash(_))
    }

    /// Whether the command moves a plant actuator (only allowed in manual mode).
    pub fn is_actuator(&self) -> bool {
        !self.targets_camera()
    }

    /// Short confirmation text shown after the device accepted the command.
    pub fn confirmation(&self) -> &'static str {
        match self {
            Command::Pump(Switch::On) => "Pump turned ON",
            Command::Pump(Switch::Off) => "Pump turned OFF",
            Command::Fan(Switch::On) => "Fan turned ON",
            Command::Fan(Switch::Off) => "Fan turned OFF",
            Command::Roof(RoofCommand::Open) => "Opening the roof",
            Command::Roof(RoofCommand::Close) => "Closing the roof",
            Command::Flash(Switch::On) => "Flash turned ON",
            Command::Flash(Switch::Off) => "Flash turned OFF",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pump(s) => write!(f, "pump {}", s.as_param()),
            Command::Fan(s) => write!(f, "fan {}", s.as_param()),
            Command::Roof(r) => write!(f, "roof {}", r.as_param()),
            Command::Flash(s) => write!(f, "flash {}", s.as_param()),
        }
    }
}

/// Result of classifying one camera frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Classification {
    /// Display label, e.g. `"Tomato - Early blight"`.
    pub label: String,
    /// Probability of the predicted class, within `[0, 1]`.
    pub confidence: f32,
    /// Index of the predicted class in the model output.
    pub index: usize,
}

impl Classification {
    /// Whether the predicted class denotes a healthy plant.
    pub fn is_healthy(&self) -> bool {
        self.label.to_lowercase().contains("healthy")
    }

    /// Confidence as a percentage with one decimal, e.g. `"93.4%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// One point of the soil moisture chart.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoisturePoint {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    pub value: u8,
}
