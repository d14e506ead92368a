use crate::instance_lock::InstanceLockError;
use crate::sensors::PinNumbering;
use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum SentryError {
    #[error("Device initialization failed: {0}")]
    DeviceInit(String),

    #[error("Failed to read motion sensor: {0}")]
    Read(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Capture did not finish within {0:?}")]
    CaptureTimeout(Duration),

    #[error("Pin {pin} is not a GPIO line in {scheme} numbering")]
    InvalidPin { pin: u8, scheme: PinNumbering },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    InstanceLock(#[from] InstanceLockError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SentryError>;
