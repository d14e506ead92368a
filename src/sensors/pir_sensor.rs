//! PIR motion sensor on a Raspberry Pi GPIO pin.
//!
//! The sensor's digital output is wired to one header pin configured as an
//! input. The pin is claimed for the lifetime of [`PirSensor`] and returned
//! to its previous mode when the sensor is dropped.

use super::{Level, MotionInput, Pull};
use crate::config::SensorConfig;
use crate::error::{Result, SentryError};
use rppal::gpio::{Gpio, InputPin, Level as GpioLevel};

pub struct PirSensor {
    pin: InputPin,
    config: SensorConfig,
    bcm: u8,
}

impl PirSensor {
    /// Claim the configured pin as a digital input.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        let bcm = config.numbering.resolve(config.pin)?;

        let gpio = Gpio::new()
            .map_err(|e| SentryError::DeviceInit(format!("GPIO unavailable: {}", e)))?;
        let pin = gpio.get(bcm).map_err(|e| {
            SentryError::DeviceInit(format!("failed to claim GPIO{}: {}", bcm, e))
        })?;

        let mut pin = match config.pull {
            Pull::None => pin.into_input(),
            Pull::Up => pin.into_input_pullup(),
            Pull::Down => pin.into_input_pulldown(),
        };
        pin.set_reset_on_drop(true);

        log::info!(
            "Motion sensor on {} pin {} (GPIO{}), pull {}",
            config.numbering,
            config.pin,
            bcm,
            config.pull
        );

        Ok(Self {
            pin,
            config: config.clone(),
            bcm,
        })
    }

    pub fn bcm_line(&self) -> u8 {
        self.bcm
    }
}

impl MotionInput for PirSensor {
    fn read(&mut self) -> Result<Level> {
        Ok(match self.pin.read() {
            GpioLevel::High => Level::High,
            GpioLevel::Low => Level::Low,
        })
    }

    fn describe(&self) -> String {
        format!(
            "PIR sensor on {} pin {} (GPIO{})",
            self.config.numbering, self.config.pin, self.bcm
        )
    }
}

impl Drop for PirSensor {
    fn drop(&mut self) {
        log::debug!("Releasing GPIO{}", self.bcm);
    }
}
