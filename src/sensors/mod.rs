//! Motion sensor inputs.
//!
//! A motion sensor is a single digital input pin. Anything that can report
//! the pin level implements [`MotionInput`]; the real Raspberry Pi driver
//! lives in [`pir_sensor`] and the simulated one in
//! [`crate::input::simulation`].

pub mod pin_numbering;
#[cfg(feature = "rpi")]
pub mod pir_sensor;

pub use pin_numbering::PinNumbering;
#[cfg(feature = "rpi")]
pub use pir_sensor::PirSensor;

use crate::error::{Result, SentryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digital level of the sensor pin at the moment it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("LOW"),
            Level::High => f.write_str("HIGH"),
        }
    }
}

/// Pull resistor applied to the input pin.
///
/// PIR modules drive their output actively, so the default is no pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    #[default]
    None,
    Up,
    Down,
}

impl FromStr for Pull {
    type Err = SentryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Pull::None),
            "up" => Ok(Pull::Up),
            "down" => Ok(Pull::Down),
            other => Err(SentryError::Config(format!(
                "unknown pull mode '{other}' (expected none, up or down)"
            ))),
        }
    }
}

impl fmt::Display for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pull::None => f.write_str("none"),
            Pull::Up => f.write_str("up"),
            Pull::Down => f.write_str("down"),
        }
    }
}

/// A source of motion readings.
///
/// Reads are expected to be quick and non-blocking; the sentry loop calls
/// `read()` once per poll.
pub trait MotionInput: Send {
    /// Read the current level of the sensor pin.
    fn read(&mut self) -> Result<Level>;

    /// Human-readable description used in log lines.
    fn describe(&self) -> String;
}
