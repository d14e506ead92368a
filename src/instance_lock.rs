//! Single instance lock using a Unix socket.
//!
//! Two sentries on the same board would fight over the sensor pin and the
//! camera, so only one may run at a time. The socket is released by the OS
//! when the process dies, so a crash never leaves a stale lock behind.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SOCKET_NAME: &str = "motion-sentry.sock";

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another motion-sentry instance is already running ({0})")]
    AlreadyRunning(PathBuf),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the sentry runs; the socket file is removed on drop.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock at the default socket path.
    pub fn acquire() -> Result<Self, InstanceLockError> {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from);
        Self::acquire_at(socket_path(runtime_dir))
    }

    pub fn acquire_at(path: PathBuf) -> Result<Self, InstanceLockError> {
        // A socket nobody answers on was left by a SIGKILL'd instance.
        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(path));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => {
                log::debug!("Acquired instance lock at {}", path.display());
                Ok(Self {
                    _listener: listener,
                    path,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(path))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Socket path under `runtime_dir`, falling back to `/tmp`.
pub fn socket_path(runtime_dir: Option<PathBuf>) -> PathBuf {
    runtime_dir
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(SOCKET_NAME)
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
