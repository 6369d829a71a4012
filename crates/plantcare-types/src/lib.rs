//! Platform-agnostic types for the PlantCare greenhouse dashboard.
//!
//! This crate provides the data model shared by the device client
//! (plantcare-core) and the dashboard service (plantcare-service).
//!
//! # Features
//!
//! - Sensor readings, climate values and light levels
//! - Threshold sets with slider clamping
//! - Control mode, actuator commands and per-channel display status
//! - Classification results and disease label formatting
//! - Decoding of the controller's plain-text and JSON bodies
//!
//! # Example
//!
//! ```
//! use plantcare_types::{ThresholdSet, parse};
//!
//! let soil = parse::parse_soil("48\n").unwrap();
//! let thresholds = ThresholdSet::default();
//! assert!(soil <= thresholds.soil);
//! ```

pub mod error;
pub mod labels;
pub mod parse;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use labels::{LabelMap, format_label};
pub use types::{
    ActuatorStatus, ChannelStatus, Classification, Climate, Command, LightLevel, Mode,
    MoisturePoint, RoofCommand, RoofStatus, SensorKind, SensorReading, Switch, ThresholdSet,
};
