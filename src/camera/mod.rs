//! Still-image cameras.
//!
//! The sentry only needs one operation from a camera: write a still to a
//! given path. [`StillCamera`] drives a still-capture command-line tool;
//! [`CaptureNamer`] decides where each capture lands.

mod naming;
mod still;

pub use naming::{CaptureNamer, TIME_FORMAT};
pub use still::StillCamera;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait Camera: Send {
    /// Capture one still image to `path`.
    ///
    /// Returns once the image is on disk or the capture has failed.
    async fn capture(&mut self, path: &Path) -> Result<()>;
}

