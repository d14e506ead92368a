//! Simulated inputs for running without hardware.

mod sensors;

pub use sensors::SimulatedMotion;
