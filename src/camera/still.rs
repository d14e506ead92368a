//! Camera driven by a long-running still-capture process.
//!
//! [`StillCamera::open`] starts
//! `<command> [extra args] --nopreview --timeout 0 --signal --output <spool>/pending.jpg`
//! once and keeps it running, so the sensor stays powered and its exposure and
//! white balance stay settled between captures. Each capture sends the process
//! `SIGUSR1`, waits for the frame to land in the spool directory, and moves it
//! to its final name. `rpicam-still` and `libcamera-still` both accept these
//! options.
//!
//! The spool directory should live on the same filesystem as the capture
//! directory so the final move is a rename. A frame that never finishes is
//! discarded, never moved into place.

use super::Camera;
use crate::config::CameraConfig;
use crate::error::{Result, SentryError};
use async_trait::async_trait;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

const PENDING_FILE: &str = "pending.jpg";

/// How often the spool file is checked while a frame is being written.
const FRAME_POLL: Duration = Duration::from_millis(20);

pub struct StillCamera {
    config: CameraConfig,
    spool_dir: PathBuf,
    child: Child,
}

impl StillCamera {
    /// Start the camera process and wait out the sensor warm-up.
    pub async fn open(config: CameraConfig, spool_dir: impl Into<PathBuf>) -> Result<Self> {
        let spool_dir = spool_dir.into();
        log::info!("Initializing camera via '{}'...", config.command);

        tokio::fs::create_dir_all(&spool_dir).await.map_err(|e| {
            SentryError::DeviceInit(format!(
                "cannot create spool directory {}: {}",
                spool_dir.display(),
                e
            ))
        })?;

        let child = start(&config, &spool_dir.join(PENDING_FILE)).await?;
        log::info!("Camera ready");

        Ok(Self {
            config,
            spool_dir,
            child,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn pending_path(&self) -> PathBuf {
        self.spool_dir.join(PENDING_FILE)
    }

    /// Restart the camera process if it has died since the last capture.
    async fn ensure_running(&mut self) -> Result<()> {
        let exited = self
            .child
            .try_wait()
            .map_err(|e| SentryError::Capture(format!("cannot poll camera process: {}", e)))?;

        if let Some(status) = exited {
            log::warn!("Camera process exited with {}; restarting", status);
            self.child = start(&self.config, &self.pending_path())
                .await
                .map_err(|e| SentryError::Capture(e.to_string()))?;
        }
        Ok(())
    }

    fn trigger(&self) -> Result<()> {
        let pid = self
            .child
            .id()
            .ok_or_else(|| SentryError::Capture("camera process has exited".to_string()))?;
        kill(Pid::from_raw(pid as i32), Signal::SIGUSR1)
            .map_err(|e| SentryError::Capture(format!("cannot signal camera process: {}", e)))
    }

    /// Wait until the pending frame exists and has stopped growing.
    async fn wait_for_frame(&mut self, pending: &Path) -> Result<()> {
        let mut last_len = None;
        loop {
            let exited = self
                .child
                .try_wait()
                .map_err(|e| SentryError::Capture(format!("cannot poll camera process: {}", e)))?;
            if let Some(status) = exited {
                return Err(SentryError::Capture(format!(
                    "camera process exited with {} during capture",
                    status
                )));
            }

            let len = tokio::fs::metadata(pending)
                .await
                .ok()
                .map(|meta| meta.len())
                .filter(|&len| len > 0);
            if len.is_some() && len == last_len {
                return Ok(());
            }
            last_len = len;

            tokio::time::sleep(FRAME_POLL).await;
        }
    }
}

async fn start(config: &CameraConfig, output: &Path) -> Result<Child> {
    let mut child = Command::new(&config.command)
        .args(&config.extra_args)
        .arg("--nopreview")
        .arg("--timeout")
        .arg("0")
        .arg("--signal")
        .arg("--output")
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            SentryError::DeviceInit(format!(
                "camera command '{}' unavailable: {}",
                config.command, e
            ))
        })?;

    let warmup = config.warmup();
    if !warmup.is_zero() {
        log::info!("Camera warming up for {:?}", warmup);
        tokio::time::sleep(warmup).await;
    }

    match child.try_wait() {
        Ok(None) => Ok(child),
        Ok(Some(status)) => Err(SentryError::DeviceInit(format!(
            "camera command '{}' exited during warm-up with {}",
            config.command, status
        ))),
        Err(e) => Err(SentryError::DeviceInit(format!(
            "cannot poll camera process: {}",
            e
        ))),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        log::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn capture(&mut self, path: &Path) -> Result<()> {
        self.ensure_running().await?;

        let pending = self.pending_path();
        discard(&pending).await;
        self.trigger()?;

        let timeout = self.config.capture_timeout();
        let frame = tokio::time::timeout(timeout, self.wait_for_frame(&pending))
            .await
            .unwrap_or_else(|_| Err(SentryError::CaptureTimeout(timeout)));
        if let Err(e) = frame {
            discard(&pending).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&pending, path).await {
            discard(&pending).await;
            return Err(SentryError::Capture(format!(
                "cannot move frame to {}: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }
}

impl Drop for StillCamera {
    fn drop(&mut self) {
        log::debug!("Stopping camera process");
        let _ = self.child.start_kill();
        let _ = std::fs::remove_dir_all(&self.spool_dir);
    }
}
