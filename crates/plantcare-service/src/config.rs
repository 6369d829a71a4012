//! Dashboard configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use plantcare_core::{DeviceTimeouts, SessionOptions};
use plantcare_types::ThresholdSet;
use plantcare_types::types::{HUM_RANGE, SOIL_RANGE, TEMP_RANGE};

/// Dashboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Controller and camera addresses.
    pub device: DeviceConfig,
    /// Refresh loop settings.
    pub dashboard: DashboardConfig,
    /// Thresholds a new session starts with.
    pub thresholds: ThresholdsConfig,
    /// Disease classifier assets.
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Controller URL is set and both URLs use http(s)
    /// - Device timeouts are between 1 and 30 seconds
    /// - Refresh interval and history length are within bounds
    /// - Initial thresholds are within their slider ranges
    /// - Classifier input size is sensible
    ///
    /// # Example
    ///
    /// ```
    /// use plantcare_service::Config;
    ///
    /// let mut config = Config::default();
    /// config.device.controller = "http://192.168.1.50".to_string();
    /// config.validate().expect("config with a controller should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.device.validate());
        errors.extend(self.dashboard.validate());
        errors.extend(self.thresholds.validate());
        errors.extend(self.classifier.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Options for new sessions.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            thresholds: self.thresholds.to_set(),
            history_len: self.dashboard.history_len,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Snapshots buffered per WebSocket client before old ones are dropped.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            broadcast_buffer: 16,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
        } else {
            match self.bind.rsplit_once(':') {
                None => errors.push(ValidationError::new(
                    "server.bind",
                    format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                )),
                Some((_, port)) => match port.parse::<u16>() {
                    Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                    Err(_) => errors.push(ValidationError::new(
                        "server.bind",
                        format!("invalid port '{}': must be a number 1-65535", port),
                    )),
                    Ok(_) => {}
                },
            }
        }

        if self.broadcast_buffer == 0 {
            errors.push(ValidationError::new(
                "server.broadcast_buffer",
                "broadcast buffer must be at least 1",
            ));
        }

        errors
    }
}

/// Minimum device timeout in milliseconds (1 second).
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum device timeout in milliseconds (30 seconds).
pub const MAX_TIMEOUT_MS: u64 = 30_000;

/// Controller and camera addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL of the plant controller, e.g. `http://192.168.1.50`.
    pub controller: String,
    /// Base URL of the camera module.
    pub camera: Option<String>,
    /// Timeout for sensor reads and captures.
    pub read_timeout_ms: u64,
    /// Timeout for commands.
    pub command_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            controller: String::new(),
            camera: None,
            read_timeout_ms: 5_000,
            command_timeout_ms: 3_000,
        }
    }
}

impl DeviceConfig {
    /// Validate device configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.controller.trim().is_empty() {
            errors.push(ValidationError::new(
                "device.controller",
                "controller URL is required",
            ));
        } else if !is_http_url(&self.controller) {
            errors.push(ValidationError::new(
                "device.controller",
                format!(
                    "invalid URL '{}': must start with http:// or https://",
                    self.controller
                ),
            ));
        }

        if let Some(camera) = &self.camera
            && !is_http_url(camera)
        {
            errors.push(ValidationError::new(
                "device.camera",
                format!(
                    "invalid URL '{}': must start with http:// or https:// (omit to disable the camera)",
                    camera
                ),
            ));
        }

        for (field, value) in [
            ("device.read_timeout_ms", self.read_timeout_ms),
            ("device.command_timeout_ms", self.command_timeout_ms),
        ] {
            if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&value) {
                errors.push(ValidationError::new(
                    field,
                    format!(
                        "timeout {} ms is out of range ({}-{} ms)",
                        value, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS
                    ),
                ));
            }
        }

        errors
    }

    /// Per-call timeouts for the device client.
    pub fn timeouts(&self) -> DeviceTimeouts {
        DeviceTimeouts {
            read: Duration::from_millis(self.read_timeout_ms),
            command: Duration::from_millis(self.command_timeout_ms),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

/// Minimum refresh interval in milliseconds.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 500;
/// Maximum refresh interval in milliseconds (1 minute).
pub const MAX_REFRESH_INTERVAL_MS: u64 = 60_000;
/// Maximum number of moisture points kept per session.
pub const MAX_HISTORY_LEN: usize = 1_000;

/// Refresh loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Time between refresh cycles.
    pub refresh_interval_ms: u64,
    /// Moisture points kept for the chart.
    pub history_len: usize,
    /// Drive the actuators from the evaluated statuses in auto mode.
    pub auto_actuate: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2_000,
            history_len: plantcare_core::series::DEFAULT_CAPACITY,
            auto_actuate: false,
        }
    }
}

impl DashboardConfig {
    /// Validate dashboard configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
            errors.push(ValidationError::new(
                "dashboard.refresh_interval_ms",
                format!(
                    "refresh interval {} ms is too short (minimum {} ms)",
                    self.refresh_interval_ms, MIN_REFRESH_INTERVAL_MS
                ),
            ));
        } else if self.refresh_interval_ms > MAX_REFRESH_INTERVAL_MS {
            errors.push(ValidationError::new(
                "dashboard.refresh_interval_ms",
                format!(
                    "refresh interval {} ms is too long (maximum {} ms)",
                    self.refresh_interval_ms, MAX_REFRESH_INTERVAL_MS
                ),
            ));
        }

        if self.history_len == 0 || self.history_len > MAX_HISTORY_LEN {
            errors.push(ValidationError::new(
                "dashboard.history_len",
                format!(
                    "history length {} is out of range (1-{})",
                    self.history_len, MAX_HISTORY_LEN
                ),
            ));
        }

        errors
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Initial thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub soil: f64,
    pub temp: f64,
    pub hum: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let defaults = ThresholdSet::default();
        Self {
            soil: defaults.soil as f64,
            temp: defaults.temp as f64,
            hum: defaults.hum as f64,
        }
    }
}

impl ThresholdsConfig {
    /// Validate threshold configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let checks = [
            ("thresholds.soil", self.soil, SOIL_RANGE.0 as f64, SOIL_RANGE.1 as f64),
            ("thresholds.temp", self.temp, TEMP_RANGE.0 as f64, TEMP_RANGE.1 as f64),
            ("thresholds.hum", self.hum, HUM_RANGE.0 as f64, HUM_RANGE.1 as f64),
        ];

        checks
            .into_iter()
            .filter(|(_, value, min, max)| !(*min..=*max).contains(value))
            .map(|(field, value, min, max)| {
                ValidationError::new(
                    field,
                    format!("value {} is out of range ({}-{})", value, min, max),
                )
            })
            .collect()
    }

    pub fn to_set(&self) -> ThresholdSet {
        ThresholdSet::clamped(self.soil, self.temp, self.hum)
    }
}

/// Minimum classifier input edge in pixels.
pub const MIN_INPUT_SIZE: u32 = 32;
/// Maximum classifier input edge in pixels.
pub const MAX_INPUT_SIZE: u32 = 1024;

/// Disease classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Load the classifier at startup.
    pub enabled: bool,
    /// ONNX model file.
    pub model: PathBuf,
    /// Label map (`{"genus___disease": index}`).
    pub categories: PathBuf,
    /// Edge length of the square model input.
    pub input_size: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: PathBuf::from("model.onnx"),
            categories: PathBuf::from("categories.json"),
            input_size: plantcare_core::classifier::DEFAULT_INPUT_SIZE,
        }
    }
}

impl ClassifierConfig {
    /// Validate classifier configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(MIN_INPUT_SIZE..=MAX_INPUT_SIZE).contains(&self.input_size) {
            errors.push(ValidationError::new(
                "classifier.input_size",
                format!(
                    "input size {} is out of range ({}-{})",
                    self.input_size, MIN_INPUT_SIZE, MAX_INPUT_SIZE
                ),
            ));
        }

        if self.enabled {
            if self.model.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "classifier.model",
                    "model path cannot be empty",
                ));
            }
            if self.categories.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "classifier.categories",
                    "categories path cannot be empty",
                ));
            }
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `device.read_timeout_ms`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plantcare")
        .join("dashboard.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.device.controller = "http://192.168.1.50".to_string();
        config
    }

    fn validation_errors(config: &Config) -> Vec<ValidationError> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.broadcast_buffer, 16);
        assert!(config.device.controller.is_empty());
        assert_eq!(config.device.camera, None);
        assert_eq!(config.device.read_timeout_ms, 5_000);
        assert_eq!(config.device.command_timeout_ms, 3_000);
        assert_eq!(config.dashboard.refresh_interval_ms, 2_000);
        assert_eq!(config.dashboard.history_len, 20);
        assert!(!config.dashboard.auto_actuate);
        assert!(config.classifier.enabled);
        assert_eq!(config.classifier.input_size, 224);
    }

    #[test]
    fn test_default_config_needs_controller() {
        let errors = validation_errors(&Config::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "device.controller");

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:9000"
            broadcast_buffer = 4

            [device]
            controller = "http://10.0.0.2"
            camera = "http://10.0.0.3"
            read_timeout_ms = 8000

            [dashboard]
            refresh_interval_ms = 5000
            history_len = 50
            auto_actuate = true

            [thresholds]
            soil = 40
            temp = 30.5
            hum = 80

            [classifier]
            enabled = false
            model = "/opt/plantcare/model.onnx"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.device.camera.as_deref(), Some("http://10.0.0.3"));
        assert_eq!(config.device.read_timeout_ms, 8000);
        assert_eq!(config.device.command_timeout_ms, 3000);
        assert!(config.dashboard.auto_actuate);
        assert_eq!(config.thresholds.to_set().temp, 30.5);
        assert!(!config.classifier.enabled);
        assert_eq!(config.classifier.categories, PathBuf::from("categories.json"));
        assert!(config.validate().is_ok());

        let options = config.session_options();
        assert_eq!(options.history_len, 50);
        assert_eq!(options.thresholds.soil, 40);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("dashboard.toml");

        let mut config = valid_config();
        config.device.camera = Some("http://192.168.1.51".to_string());
        config.dashboard.auto_actuate = true;

        std::fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.device.controller, "http://192.168.1.50");
        assert_eq!(loaded.device.camera, config.device.camera);
        assert!(loaded.dashboard.auto_actuate);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/dashboard.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("plantcare/dashboard.toml"));
    }

    #[test]
    fn test_server_bind_validation() {
        let bind = |b: &str| ServerConfig {
            bind: b.to_string(),
            ..ServerConfig::default()
        };

        assert!(bind("127.0.0.1:8080").validate().is_empty());
        assert!(bind("[::1]:8080").validate().is_empty());
        assert!(bind("localhost:8080").validate().is_empty());

        let errors = bind("").validate();
        assert!(errors[0].message.contains("cannot be empty"));
        let errors = bind("127.0.0.1").validate();
        assert!(errors[0].message.contains("host:port"));
        let errors = bind("127.0.0.1:0").validate();
        assert!(errors[0].message.contains("cannot be 0"));
        let errors = bind("127.0.0.1:abc").validate();
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_device_url_validation() {
        let mut device = DeviceConfig {
            controller: "192.168.1.50".to_string(),
            camera: Some("ftp://cam".to_string()),
            ..DeviceConfig::default()
        };
        let errors = device.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "device.controller");
        assert_eq!(errors[1].field, "device.camera");

        device.controller = "https://plant.local".to_string();
        device.camera = None;
        assert!(device.validate().is_empty());
    }

    #[test]
    fn test_device_timeout_bounds() {
        let device = DeviceConfig {
            controller: "http://10.0.0.2".to_string(),
            read_timeout_ms: 500,
            command_timeout_ms: 31_000,
            ..DeviceConfig::default()
        };
        let errors = device.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.message.contains("out of range")));

        let timeouts = DeviceConfig::default().timeouts();
        assert_eq!(timeouts.read, Duration::from_secs(5));
        assert_eq!(timeouts.command, Duration::from_secs(3));
    }

    #[test]
    fn test_dashboard_validation() {
        let mut dashboard = DashboardConfig {
            refresh_interval_ms: 100,
            history_len: 0,
            auto_actuate: false,
        };
        let errors = dashboard.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("too short"));

        dashboard.refresh_interval_ms = 120_000;
        dashboard.history_len = 20;
        let errors = dashboard.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("too long"));
    }

    #[test]
    fn test_thresholds_validation() {
        let thresholds = ThresholdsConfig {
            soil: 101.0,
            temp: 5.0,
            hum: 50.0,
        };
        let errors = thresholds.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "thresholds.soil");
        assert_eq!(errors[1].field, "thresholds.temp");
        assert!(ThresholdsConfig::default().validate().is_empty());
    }

    #[test]
    fn test_classifier_validation() {
        let classifier = ClassifierConfig {
            enabled: true,
            model: PathBuf::new(),
            categories: PathBuf::from("categories.json"),
            input_size: 8,
        };
        let errors = classifier.validate();
        assert_eq!(errors.len(), 2);

        let disabled = ClassifierConfig {
            enabled: false,
            model: PathBuf::new(),
            ..ClassifierConfig::default()
        };
        assert!(disabled.validate().is_empty());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.server.bind = "nope".to_string();
        config.dashboard.history_len = 5_000;
        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 3);

        let display = ConfigError::Validation(errors).to_string();
        assert!(display.contains("server.bind"));
        assert!(display.contains("device.controller"));
        assert!(display.contains("dashboard.history_len"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError::new("server.bind", "invalid port");
        assert_eq!(format!("{}", error), "server.bind: invalid port");
    }
}
