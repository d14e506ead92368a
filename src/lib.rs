//! Motion sentry library.
//!
//! Polls a PIR motion sensor on a single-board computer's GPIO pin and
//! captures a timestamped still image whenever it detects motion.

pub mod camera;
pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod instance_lock;
pub mod sensors;
pub mod sentry;

pub use error::{Result, SentryError};
pub use sentry::{Sentry, SentryStats};
