//! Pin numbering schemes for the Raspberry Pi 40-pin header.
//!
//! `Board` numbers pins by their physical position on the header; `Bcm`
//! uses the SoC's GPIO line numbers. The GPIO driver always talks BCM, so
//! board numbers are translated through [`BOARD_TO_BCM`].

use crate::error::{Result, SentryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest BCM line exposed on the 40-pin header.
pub const MAX_BCM_LINE: u8 = 27;

/// Physical header pin -> BCM line. `None` for power and ground pins.
/// Index 0 is unused; physical pins start at 1.
const BOARD_TO_BCM: [Option<u8>; 41] = [
    None,     // 0
    None,     // 1  3V3
    None,     // 2  5V
    Some(2),  // 3
    None,     // 4  5V
    Some(3),  // 5
    None,     // 6  GND
    Some(4),  // 7
    Some(14), // 8
    None,     // 9  GND
    Some(15), // 10
    Some(17), // 11
    Some(18), // 12
    Some(27), // 13
    None,     // 14 GND
    Some(22), // 15
    Some(23), // 16
    None,     // 17 3V3
    Some(24), // 18
    Some(10), // 19
    None,     // 20 GND
    Some(9),  // 21
    Some(25), // 22
    Some(11), // 23
    Some(8),  // 24
    None,     // 25 GND
    Some(7),  // 26
    Some(0),  // 27 ID_SD
    Some(1),  // 28 ID_SC
    Some(5),  // 29
    None,     // 30 GND
    Some(6),  // 31
    Some(12), // 32
    Some(13), // 33
    None,     // 34 GND
    Some(19), // 35
    Some(16), // 36
    Some(26), // 37
    Some(20), // 38
    None,     // 39 GND
    Some(21), // 40
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinNumbering {
    /// Physical header position.
    #[default]
    Board,
    /// Broadcom SoC line number.
    Bcm,
}

impl PinNumbering {
    /// Translate a pin in this scheme to its BCM line.
    pub fn to_bcm(self, pin: u8) -> Option<u8> {
        match self {
            PinNumbering::Board => BOARD_TO_BCM.get(pin as usize).copied().flatten(),
            PinNumbering::Bcm => (pin <= MAX_BCM_LINE).then_some(pin),
        }
    }

    /// Like [`to_bcm`](Self::to_bcm), but reports unmapped pins as an error.
    pub fn resolve(self, pin: u8) -> Result<u8> {
        self.to_bcm(pin)
            .ok_or(SentryError::InvalidPin { pin, scheme: self })
    }
}

impl FromStr for PinNumbering {
    type Err = SentryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "board" | "physical" => Ok(PinNumbering::Board),
            "bcm" | "gpio" => Ok(PinNumbering::Bcm),
            other => Err(SentryError::Config(format!(
                "unknown pin numbering '{other}' (expected board or bcm)"
            ))),
        }
    }
}

impl fmt::Display for PinNumbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinNumbering::Board => f.write_str("board"),
            PinNumbering::Bcm => f.write_str("bcm"),
        }
    }
}
