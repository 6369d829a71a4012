//! Trait abstractions for plant device operations.
//!
//! This module provides the [`PlantDevice`] trait that abstracts over the
//! real controller/camera pair and the in-memory mock used in tests.

use async_trait::async_trait;
use bytes::Bytes;

use plantcare_types::{Climate, Command, LightLevel, Mode, ThresholdSet};

use crate::error::Result;

/// Trait abstracting the controller and camera endpoints.
///
/// # Example
///
/// ```ignore
/// use plantcare_core::{PlantDevice, Result};
///
/// async fn print_soil<D: PlantDevice + ?Sized>(device: &D) -> Result<()> {
///     let soil = device.read_soil().await?;
///     println!("Soil moisture: {}%", soil);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PlantDevice: Send + Sync {
    // --- Sensors ---

    /// Read soil moisture in percent (`/sensor`).
    async fn read_soil(&self) -> Result<u8>;

    /// Read temperature and humidity (`/dht`).
    async fn read_climate(&self) -> Result<Climate>;

    /// Read light presence (`/ldr`).
    async fn read_light(&self) -> Result<LightLevel>;

    // --- Configuration ---

    /// Fetch the thresholds currently active on the controller.
    async fn read_thresholds(&self) -> Result<ThresholdSet>;

    /// Push new thresholds to the controller.
    async fn write_thresholds(&self, thresholds: &ThresholdSet) -> Result<()>;

    /// Switch the controller between auto and manual mode.
    async fn set_mode(&self, mode: Mode) -> Result<()>;

    // --- Actuators ---

    /// Send an actuator or flash command.
    async fn send_command(&self, command: Command) -> Result<()>;

    // --- Camera ---

    /// Whether a camera module is available.
    fn has_camera(&self) -> bool;

    /// Capture a still frame (JPEG bytes).
    async fn capture(&self) -> Result<Bytes>;
}
