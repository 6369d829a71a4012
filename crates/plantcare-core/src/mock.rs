//! Mock plant implementation for testing.
//!
//! [`MockPlant`] implements [`PlantDevice`] entirely in memory so the refresh
//! cycle and the dashboard API can be exercised without hardware.
//!
//! # Features
//!
//! - **Failure injection**: make individual endpoints fail as unreachable
//! - **Latency simulation**: delay every call to mimic a slow Wi-Fi link
//! - **Command log**: inspect every command and mode change that was sent

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use tokio::sync::RwLock;

use plantcare_types::{Climate, Command, LightLevel, Mode, ThresholdSet};

use crate::error::{Error, Result, UnreachableReason};
use crate::traits::PlantDevice;

/// Endpoints of the mock that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockEndpoint {
    Soil,
    Climate,
    Light,
    Thresholds,
    Mode,
    Command,
    Capture,
}

impl MockEndpoint {
    fn path(&self) -> &'static str {
        match self {
            MockEndpoint::Soil => "/sensor",
            MockEndpoint::Climate => "/dht",
            MockEndpoint::Light => "/ldr",
            MockEndpoint::Thresholds => "/setthresholds",
            MockEndpoint::Mode => "/setmode",
            MockEndpoint::Command => "/manual",
            MockEndpoint::Capture => "/capture",
        }
    }
}

/// A mock plant controller with an optional camera.
///
/// # Example
///
/// ```
/// use plantcare_core::{MockPlant, PlantDevice};
///
/// #[tokio::main]
/// async fn main() {
///     let plant = MockPlant::new();
///     plant.set_soil(40).await;
///     assert_eq!(plant.read_soil().await.unwrap(), 40);
/// }
/// ```
#[derive(Debug)]
pub struct MockPlant {
    soil: RwLock<u8>,
    climate: RwLock<Climate>,
    light: RwLock<i64>,
    thresholds: RwLock<ThresholdSet>,
    mode: RwLock<Mode>,
    frame: Option<Bytes>,
    failing: RwLock<HashSet<MockEndpoint>>,
    commands: RwLock<Vec<Command>>,
    mode_changes: RwLock<Vec<Mode>>,
    /// Simulated latency per call in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    call_count: AtomicU64,
}

impl Default for MockPlant {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlant {
    /// Create a mock with typical greenhouse values and no camera.
    pub fn new() -> Self {
        Self {
            soil: RwLock::new(60),
            climate: RwLock::new(Climate {
                temperature: 24.0,
                humidity: 55.0,
            }),
            light: RwLock::new(0),
            thresholds: RwLock::new(ThresholdSet::default()),
            mode: RwLock::new(Mode::Auto),
            frame: None,
            failing: RwLock::new(HashSet::new()),
            commands: RwLock::new(Vec::new()),
            mode_changes: RwLock::new(Vec::new()),
            latency_ms: AtomicU64::new(0),
            call_count: AtomicU64::new(0),
        }
    }

    /// Attach a camera that returns `frame` on every capture.
    #[must_use]
    pub fn with_frame(self, frame: Bytes) -> Self {
        Self {
            frame: Some(frame),
            ..self
        }
    }

    pub async fn set_soil(&self, value: u8) {
        *self.soil.write().await = value;
    }

    pub async fn set_climate(&self, temperature: f32, humidity: f32) {
        *self.climate.write().await = Climate {
            temperature,
            humidity,
        };
    }

    /// Set the raw LDR value (`0` light, `1` dark, anything else invalid).
    pub async fn set_light(&self, raw: i64) {
        *self.light.write().await = raw;
    }

    pub async fn set_thresholds(&self, thresholds: ThresholdSet) {
        *self.thresholds.write().await = thresholds;
    }

    /// Make an endpoint fail (or recover).
    pub async fn set_failing(&self, endpoint: MockEndpoint, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(endpoint);
        } else {
            set.remove(&endpoint);
        }
    }

    /// Make every endpoint fail (or recover).
    pub async fn set_offline(&self, offline: bool) {
        for endpoint in [
            MockEndpoint::Soil,
            MockEndpoint::Climate,
            MockEndpoint::Light,
            MockEndpoint::Thresholds,
            MockEndpoint::Mode,
            MockEndpoint::Command,
            MockEndpoint::Capture,
        ] {
            self.set_failing(endpoint, offline).await;
        }
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Commands received so far, oldest first.
    pub async fn commands(&self) -> Vec<Command> {
        self.commands.read().await.clone()
    }

    /// Mode changes received so far, oldest first.
    pub async fn mode_changes(&self) -> Vec<Mode> {
        self.mode_changes.read().await.clone()
    }

    /// Mode the controller is currently in.
    pub async fn mode(&self) -> Mode {
        *self.mode.read().await
    }

    /// Thresholds the controller currently holds.
    pub async fn thresholds(&self) -> ThresholdSet {
        *self.thresholds.read().await
    }

    /// Number of calls made against the mock, failed ones included.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn enter(&self, endpoint: MockEndpoint) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.failing.read().await.contains(&endpoint) {
            return Err(Error::DeviceUnreachable {
                url: format!("mock://plant{}", endpoint.path()),
                reason: UnreachableReason::Connect("mock endpoint offline".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlantDevice for MockPlant {
    async fn read_soil(&self) -> Result<u8> {
        self.enter(MockEndpoint::Soil).await?;
        Ok(*self.soil.read().await)
    }

    async fn read_climate(&self) -> Result<Climate> {
        self.enter(MockEndpoint::Climate).await?;
        Ok(*self.climate.read().await)
    }

    async fn read_light(&self) -> Result<LightLevel> {
        self.enter(MockEndpoint::Light).await?;
        Ok(LightLevel::from_raw(*self.light.read().await))
    }

    async fn read_thresholds(&self) -> Result<ThresholdSet> {
        self.enter(MockEndpoint::Thresholds).await?;
        Ok(*self.thresholds.read().await)
    }

    async fn write_thresholds(&self, thresholds: &ThresholdSet) -> Result<()> {
        self.enter(MockEndpoint::Thresholds).await?;
        *self.thresholds.write().await = *thresholds;
        Ok(())
    }

    async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.enter(MockEndpoint::Mode).await?;
        *self.mode.write().await = mode;
        self.mode_changes.write().await.push(mode);
        Ok(())
    }

    async fn send_command(&self, command: Command) -> Result<()> {
        if command.targets_camera() && !self.has_camera() {
            return Err(Error::CameraNotConfigured);
        }
        self.enter(MockEndpoint::Command).await?;
        self.commands.write().await.push(command);
        Ok(())
    }

    fn has_camera(&self) -> bool {
        self.frame.is_some()
    }

    async fn capture(&self) -> Result<Bytes> {
        let frame = self.frame.clone().ok_or(Error::CameraNotConfigured)?;
        self.enter(MockEndpoint::Capture).await?;
        Ok(frame)
    }
}

/// Encode a small solid-colour PNG, usable as a mock camera frame.
pub fn sample_frame(width: u32, height: u32, rgb: [u8; 3]) -> Result<Bytes> {
    let image = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| Error::malformed("sample frame", e))?;
    Ok(Bytes::from(buf.into_inner()))
}
