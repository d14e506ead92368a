//! Capture file naming.
//!
//! Captures are named `<prefix> <HH:MM:SS>.jpg` after the wall-clock time of
//! the detection. A second capture in the same second gets a `-1`, `-2`, ...
//! suffix instead of replacing the first.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// `strftime` pattern embedded in capture file names.
pub const TIME_FORMAT: &str = "%H:%M:%S";

const EXTENSION: &str = "jpg";

#[derive(Debug, Clone)]
pub struct CaptureNamer {
    dir: PathBuf,
    prefix: String,
}

impl CaptureNamer {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a capture taken at `at`, without collision handling.
    pub fn file_name(&self, at: NaiveDateTime) -> String {
        format!("{} {}.{}", self.prefix, at.format(TIME_FORMAT), EXTENSION)
    }

    /// Path for a capture taken at `at` that does not clobber an existing file.
    pub async fn next_path(&self, at: NaiveDateTime) -> PathBuf {
        let path = self.dir.join(self.file_name(at));
        if !taken(&path).await {
            return path;
        }

        let stem = format!("{} {}", self.prefix, at.format(TIME_FORMAT));
        let mut n = 1u32;
        loop {
            let candidate = self.dir.join(format!("{}-{}.{}", stem, n, EXTENSION));
            if !taken(&candidate).await {
                return candidate;
            }
            n += 1;
        }
    }
}

/// An unreadable directory counts as free; the capture itself then reports the error.
async fn taken(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
