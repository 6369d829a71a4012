//! HTTP implementation of [`PlantDevice`].
//!
//! The plant controller and the camera module are two separate boards, each
//! with its own address. The camera is optional; without it, captures and
//! flash commands fail with [`Error::CameraNotConfigured`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use plantcare_types::{Climate, Command, LightLevel, Mode, ThresholdSet, parse};

use crate::client::{DeviceClient, NO_QUERY};
use crate::error::{Error, Result};
use crate::traits::PlantDevice;

/// Per-call timeouts for device requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTimeouts {
    /// Sensor reads, threshold fetches and camera captures.
    pub read: Duration,
    /// Mode changes, threshold updates and actuator commands.
    pub command: Duration,
}

impl Default for DeviceTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(5),
            command: Duration::from_secs(3),
        }
    }
}

/// Controller and camera reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPlant {
    controller: DeviceClient,
    camera: Option<DeviceClient>,
    timeouts: DeviceTimeouts,
}

impl HttpPlant {
    /// Create a plant from its controller URL and optional camera URL.
    pub fn new(controller_url: &str, camera_url: Option<&str>) -> Result<Self> {
        let controller = DeviceClient::new(controller_url)?;
        let camera = camera_url.map(DeviceClient::new).transpose()?;
        Ok(Self::from_clients(controller, camera))
    }

    /// Create a plant from prebuilt clients.
    pub fn from_clients(controller: DeviceClient, camera: Option<DeviceClient>) -> Self {
        Self {
            controller,
            camera,
            timeouts: DeviceTimeouts::default(),
        }
    }

    /// Override the default timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: DeviceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn controller(&self) -> &DeviceClient {
        &self.controller
    }

    pub fn camera(&self) -> Option<&DeviceClient> {
        self.camera.as_ref()
    }

    pub fn timeouts(&self) -> DeviceTimeouts {
        self.timeouts
    }

    fn camera_client(&self) -> Result<&DeviceClient> {
        self.camera.as_ref().ok_or(Error::CameraNotConfigured)
    }

    async fn read_text(&self, path: &str) -> Result<String> {
        self.controller
            .get_text(path, NO_QUERY, self.timeouts.read)
            .await
    }
}

#[async_trait]
impl PlantDevice for HttpPlant {
    async fn read_soil(&self) -> Result<u8> {
        let body = self.read_text("/sensor").await?;
        parse::parse_soil(&body).map_err(|e| Error::malformed("/sensor", e))
    }

    async fn read_climate(&self) -> Result<Climate> {
        let body = self.read_text("/dht").await?;
        parse::parse_climate(&body).map_err(|e| Error::malformed("/dht", e))
    }

    async fn read_light(&self) -> Result<LightLevel> {
        let body = self.read_text("/ldr").await?;
        parse::parse_light(&body).map_err(|e| Error::malformed("/ldr", e))
    }

    async fn read_thresholds(&self) -> Result<ThresholdSet> {
        let body = self.read_text("/setthresholds").await?;
        parse::parse_thresholds(&body).map_err(|e| Error::malformed("/setthresholds", e))
    }

    async fn write_thresholds(&self, thresholds: &ThresholdSet) -> Result<()> {
        self.controller
            .get_text("/setthresholds", &thresholds.query(), self.timeouts.command)
            .await?;
        debug!("Thresholds written: {:?}", thresholds);
        Ok(())
    }

    async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.controller
            .get_text("/setmode", &[("mode", mode.as_param())], self.timeouts.command)
            .await?;
        Ok(())
    }

    async fn send_command(&self, command: Command) -> Result<()> {
        let client = if command.targets_camera() {
            self.camera_client()?
        } else {
            &self.controller
        };
        client
            .get_text(command.path(), &command.query(), self.timeouts.command)
            .await?;
        debug!("Command sent: {}", command);
        Ok(())
    }

    fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    async fn capture(&self) -> Result<Bytes> {
        self.camera_client()?
            .get_bytes("/capture", NO_QUERY, self.timeouts.read)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantcare_types::Switch;

    #[test]
    fn test_default_timeouts() {
        let t = DeviceTimeouts::default();
        assert_eq!(t.read, Duration::from_secs(5));
        assert_eq!(t.command, Duration::from_secs(3));
    }

    #[test]
    fn test_new_without_camera() {
        let plant = HttpPlant::new("http://10.0.0.2", None).unwrap();
        assert!(!plant.has_camera());
        assert_eq!(plant.controller().base_url(), "http://10.0.0.2");
    }

    #[test]
    fn test_new_rejects_bad_camera_url() {
        let result = HttpPlant::new("http://10.0.0.2", Some("10.0.0.3"));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_camera_operations_require_camera() {
        let plant = HttpPlant::new("http://10.0.0.2", None).unwrap();
        assert!(matches!(plant.capture().await, Err(Error::CameraNotConfigured)));
        assert!(matches!(
            plant.send_command(Command::Flash(Switch::On)).await,
            Err(Error::CameraNotConfigured)
        ));
    }
}
