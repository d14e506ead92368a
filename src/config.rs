use crate::error::{Result, SentryError};
use crate::sensors::{PinNumbering, Pull};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Load environment variables from a `.env` file in the working directory.
///
/// Variables already present in the environment take precedence.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring malformed .env file: {}", e),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sensor: SensorConfig,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub timing: LoopConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub pin: u8,
    pub numbering: PinNumbering,
    pub pull: Pull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Still-capture tool, e.g. `rpicam-still` or `libcamera-still`.
    pub command: String,
    /// Extra arguments passed before the output options.
    pub extra_args: Vec<String>,
    pub warmup_ms: u64,
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Wait between polls while the sensor reads LOW.
    pub poll_interval_ms: u64,
    /// Wait after a detection before the sensor is read again.
    pub debounce_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            pin: 11,
            numbering: PinNumbering::Board,
            pull: Pull::None,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: "rpicam-still".to_string(),
            extra_args: Vec::new(),
            warmup_ms: 2000,
            capture_timeout_ms: 10_000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/home/pi/Pictures"),
            file_prefix: "Img".to_string(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            debounce_ms: 2000,
        }
    }
}

impl CameraConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

impl LoopConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Build a configuration from defaults overridden by `lookup(VAR)`.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Sensor
        if let Some(pin) = parsed(&lookup, "SENTRY_PIN") {
            config.sensor.pin = pin;
        }
        if let Some(numbering) = parsed(&lookup, "SENTRY_PIN_NUMBERING") {
            config.sensor.numbering = numbering;
        }
        if let Some(pull) = parsed(&lookup, "SENTRY_PIN_PULL") {
            config.sensor.pull = pull;
        }

        // Camera
        if let Some(command) = lookup("SENTRY_CAMERA_COMMAND") {
            config.camera.command = command;
        }
        if let Some(args) = lookup("SENTRY_CAMERA_ARGS") {
            config.camera.extra_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(ms) = parsed(&lookup, "SENTRY_CAMERA_WARMUP_MS") {
            config.camera.warmup_ms = ms;
        }
        if let Some(ms) = parsed(&lookup, "SENTRY_CAPTURE_TIMEOUT_MS") {
            config.camera.capture_timeout_ms = ms;
        }

        // Capture output
        if let Some(dir) = lookup("SENTRY_CAPTURE_DIR") {
            config.capture.dir = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup("SENTRY_FILE_PREFIX") {
            config.capture.file_prefix = prefix;
        }

        // Loop timing
        if let Some(ms) = parsed(&lookup, "SENTRY_POLL_INTERVAL_MS") {
            config.timing.poll_interval_ms = ms;
        }
        if let Some(ms) = parsed(&lookup, "SENTRY_DEBOUNCE_MS") {
            config.timing.debounce_ms = ms;
        }

        config
    }

    /// Reject settings the sentry cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.sensor.numbering.resolve(self.sensor.pin)?;

        if self.camera.command.trim().is_empty() {
            return Err(SentryError::Config("camera command is empty".to_string()));
        }
        if self.camera.capture_timeout_ms == 0 {
            return Err(SentryError::Config(
                "capture timeout must be greater than zero".to_string(),
            ));
        }
        if self.timing.poll_interval_ms == 0 {
            return Err(SentryError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.timing.debounce_ms == 0 {
            return Err(SentryError::Config(
                "debounce must be greater than zero".to_string(),
            ));
        }
        if self.capture.file_prefix.contains('/') {
            return Err(SentryError::Config(format!(
                "file prefix '{}' must not contain '/'",
                self.capture.file_prefix
            )));
        }

        Ok(())
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}
