//! Input sources that can stand in for the motion sensor.
//!
//! Current input sources:
//! - `simulation`: scripted readings for development and tests

pub mod simulation;
