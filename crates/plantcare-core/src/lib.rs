//! Core library for the PlantCare greenhouse dashboard.
//!
//! This crate talks to the two boards of a PlantCare greenhouse over HTTP:
//! the plant controller (soil, climate and light sensors plus pump, fan and
//! roof actuators) and the optional camera module. On top of the device
//! client it provides threshold evaluation, the per-session moisture history,
//! disease classification of camera frames and the refresh cycle that ties
//! them together.
//!
//! # Features
//!
//! - **Device client**: plain-text and JSON endpoints with per-call timeouts
//! - **Threshold evaluation**: pump, fan and roof status from the latest readings
//! - **Manual control**: mode changes, threshold updates and actuator commands
//! - **Disease detection**: ONNX image classifier with a label map
//! - **Refresh cycle**: one sequential poll producing a [`Snapshot`]
//! - **Mock device**: in-memory controller for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use plantcare_core::{ClassifierHandle, CycleOptions, HttpPlant, Session, run_cycle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let plant = HttpPlant::new("http://192.168.1.50", Some("http://192.168.1.51"))?;
//!     let classifier = ClassifierHandle::disabled("no model");
//!     let mut session = Session::default();
//!
//!     let outcome = run_cycle(&plant, &classifier, &mut session, CycleOptions::default(), 1).await;
//!     println!("Soil: {:?}", outcome.snapshot.readings.soil);
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod client;
pub mod control;
pub mod device;
pub mod error;
pub mod mock;
pub mod refresh;
pub mod series;
pub mod session;
pub mod thresholds;
pub mod traits;

pub use plantcare_types as types;

pub use classifier::{ClassifierHandle, ClassifierState, ImageClassifier, OnnxClassifier};
pub use client::DeviceClient;
pub use control::{SessionReset, apply_thresholds, change_mode, reset_session, send_manual};
pub use device::{DeviceTimeouts, HttpPlant};
pub use error::{Error, Result, UnreachableReason};
pub use mock::MockPlant;
pub use refresh::{
    CycleContext, CycleOptions, CycleOutcome, CycleResults, Notice, NoticeLevel, Snapshot,
    collect_cycle, run_cycle,
};
pub use series::MoistureSeries;
pub use session::{Session, SessionOptions};
pub use thresholds::{ActuatorTargets, Evaluator, Readings};
pub use traits::PlantDevice;
