//! Manual controls: thresholds, mode changes and actuator commands.
//!
//! Each operation is a single request to the device. The session lock is only
//! taken to read the mode or to commit a change after the device accepted it,
//! never across the request itself.

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use plantcare_types::{Command, Mode, ThresholdSet};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::traits::PlantDevice;

/// Clamp `soil`, `temp` and `hum` to their slider ranges and push them to the controller.
///
/// On success the clamped set becomes the session's configured thresholds.
pub async fn apply_thresholds<D>(
    device: &D,
    session: &Mutex<Session>,
    soil: f64,
    temp: f64,
    hum: f64,
) -> Result<ThresholdSet>
where
    D: PlantDevice + ?Sized,
{
    let thresholds = ThresholdSet::clamped(soil, temp, hum);
    device.write_thresholds(&thresholds).await.inspect_err(|e| {
        warn!("Failed to update thresholds: {}", e);
    })?;
    session.lock().await.thresholds = thresholds;
    info!(
        "Thresholds updated: soil={} temp={:.1} hum={}",
        thresholds.soil, thresholds.temp, thresholds.hum
    );
    Ok(thresholds)
}

/// Switch the controller's mode.
pub async fn change_mode<D>(device: &D, session: &Mutex<Session>, mode: Mode) -> Result<String>
where
    D: PlantDevice + ?Sized,
{
    device.set_mode(mode).await.inspect_err(|e| {
        warn!("Failed to set mode {}: {}", mode, e);
    })?;
    session.lock().await.set_mode(mode);
    info!("Mode set to {}", mode);
    Ok(format!("Mode set to {}", mode))
}

/// Send a manual command.
///
/// Pump, fan and roof commands require manual mode; flash commands are always
/// allowed and never wait for the session.
pub async fn send_manual<D>(
    device: &D,
    session: &Mutex<Session>,
    command: Command,
) -> Result<String>
where
    D: PlantDevice + ?Sized,
{
    if command.is_actuator() && session.lock().await.mode != Mode::Manual {
        return Err(Error::ManualModeRequired(actuator_name(command)));
    }
    device.send_command(command).await.inspect_err(|e| {
        warn!("Command {} failed: {}", command, e);
    })?;
    info!("Command sent: {}", command);
    Ok(command.confirmation().to_string())
}

/// Result of [`reset_session`].
#[derive(Debug)]
pub struct SessionReset {
    pub session_id: Uuid,
    pub mode: Mode,
    /// Why the controller could not be put back into auto mode.
    pub mode_error: Option<Error>,
}

/// Start a fresh session and put the controller back into auto mode.
///
/// If the controller refuses, the new session keeps the previous mode so the
/// dashboard and the board stay in agreement.
pub async fn reset_session<D>(device: &D, session: &Mutex<Session>) -> SessionReset
where
    D: PlantDevice + ?Sized,
{
    let mode_error = device
        .set_mode(Mode::Auto)
        .await
        .inspect_err(|e| warn!("Failed to restore auto mode on reset: {}", e))
        .err();

    let mut session = session.lock().await;
    let previous = session.mode;
    session.reset();
    if mode_error.is_some() {
        session.mode = previous;
    }
    info!("Session reset: {} ({})", session.id, session.mode);

    SessionReset {
        session_id: session.id,
        mode: session.mode,
        mode_error,
    }
}

fn actuator_name(command: Command) -> &'static str {
    match command {
        Command::Pump(_) => "pump",
        Command::Fan(_) => "fan",
        Command::Roof(_) => "roof",
        Command::Flash(_) => "flash",
    }
}
