//! Simulated motion sensor for development and testing.
//!
//! Provides scripted sensor readings so the sentry loop can run without
//! GPIO hardware.

use crate::error::{Result, SentryError};
use crate::sensors::{Level, MotionInput};
use std::collections::VecDeque;
use tokio::time::{Duration, Instant};

enum Script {
    /// Fixed readings, then LOW forever.
    Sequence(VecDeque<Level>),
    /// HIGH until the deadline, then LOW.
    HighUntil(Instant),
    /// One HIGH reading once every period.
    Pulses { period: Duration, next: Instant },
}

/// A [`MotionInput`] driven by a script instead of a pin.
///
/// Time-based scripts use tokio's clock, so they follow paused time in tests.
pub struct SimulatedMotion {
    script: Script,
    failures: u32,
    reads: u64,
}

impl SimulatedMotion {
    /// Report `levels` in order, then LOW.
    pub fn sequence(levels: impl IntoIterator<Item = Level>) -> Self {
        Self::with_script(Script::Sequence(levels.into_iter().collect()))
    }

    /// Report HIGH for `duration` from now, then LOW.
    pub fn high_for(duration: Duration) -> Self {
        Self::with_script(Script::HighUntil(Instant::now() + duration))
    }

    /// Report a single HIGH reading every `period`, starting one period from now.
    pub fn pulses(period: Duration) -> Self {
        Self::with_script(Script::Pulses {
            period,
            next: Instant::now() + period,
        })
    }

    /// Fail the next `count` reads before following the script.
    pub fn failing_first(mut self, count: u32) -> Self {
        self.failures = count;
        self
    }

    /// Number of reads attempted so far, failed ones included.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            failures: 0,
            reads: 0,
        }
    }
}

impl MotionInput for SimulatedMotion {
    fn read(&mut self) -> Result<Level> {
        self.reads += 1;

        if self.failures > 0 {
            self.failures -= 1;
            return Err(SentryError::Read(format!(
                "simulated read failure ({} remaining)",
                self.failures
            )));
        }

        let now = Instant::now();
        let level = match &mut self.script {
            Script::Sequence(levels) => levels.pop_front().unwrap_or(Level::Low),
            Script::HighUntil(deadline) => Level::from(now < *deadline),
            Script::Pulses { period, next } => {
                if now >= *next {
                    while *next <= now {
                        *next += *period;
                    }
                    Level::High
                } else {
                    Level::Low
                }
            }
        };

        if level.is_high() {
            log::info!("[Sim] Motion sensor reads {}", level);
        }
        Ok(level)
    }

    fn describe(&self) -> String {
        match &self.script {
            Script::Sequence(_) => "simulated sensor (scripted)".to_string(),
            Script::HighUntil(_) => "simulated sensor (sustained motion)".to_string(),
            Script::Pulses { period, .. } => {
                format!("simulated sensor (motion every {:?})", period)
            }
        }
    }
}
