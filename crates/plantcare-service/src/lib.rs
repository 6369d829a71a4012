//! Web dashboard and HTTP REST API for a PlantCare greenhouse.
//!
//! This crate provides a service that:
//! - Polls the ESP32 controller and ESP32-CAM on a schedule
//! - Evaluates pump, fan and roof status against the session thresholds
//! - Classifies plant disease from camera frames
//! - Exposes a REST API for thresholds, mode and actuator commands
//! - Pushes every refresh snapshot over a WebSocket
//! - Serves a single-page dashboard at `/`
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/status` - Refresh loop, classifier and session status
//! - `GET /api/snapshot` - Latest refresh snapshot
//! - `GET /api/camera/frame` - Latest camera frame
//! - `POST /api/camera/flash` - Turn the camera flash on or off
//! - `GET|PUT /api/thresholds` - Read or apply thresholds
//! - `GET|PUT /api/mode` - Read or change the operating mode
//! - `POST /api/control/{pump,fan,roof}` - Manual actuator commands
//! - `POST /api/session/reset` - Start a fresh session
//! - `POST /api/refresh/{start,stop}` - Control the refresh loop
//! - `WS /api/ws` - Real-time snapshot stream
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/plantcare/dashboard.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [device]
//! controller = "http://192.168.1.50"
//! camera = "http://192.168.1.51"
//!
//! [dashboard]
//! refresh_interval_ms = 2000
//! history_len = 20
//!
//! [thresholds]
//! soil = 30
//! temp = 30.0
//! hum = 70
//!
//! [classifier]
//! model = "model.onnx"
//! categories = "categories.json"
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod dashboard;
pub mod state;
pub mod ws;

pub use collector::Collector;
pub use config::{
    ClassifierConfig, Config, ConfigError, DashboardConfig, DeviceConfig, ServerConfig,
    ThresholdsConfig, ValidationError,
};
pub use state::{AppState, RefreshState};
