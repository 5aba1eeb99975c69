//! Single controller per zone.
//!
//! Two processes driving the same relays would fight each other, so the
//! daemon holds a Unix socket named after its zone for its whole lifetime.
//! The OS releases the socket when the process dies, so a crash never leaves
//! a lock behind that blocks the next start.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another controller already holds {0}")]
    AlreadyRunning(PathBuf),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the value lives; the socket file is removed on drop.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock for `name` in the runtime directory.
    pub fn acquire(name: &str) -> Result<Self, InstanceLockError> {
        Self::acquire_at(Self::socket_path(runtime_dir(), name))
    }

    /// Acquire the lock at an explicit socket path.
    pub fn acquire_at(path: PathBuf) -> Result<Self, InstanceLockError> {
        if path.exists() {
            // A live holder accepts connections; a stale socket refuses them.
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(path));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            // Lost a race with another instance binding the same path
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(path))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    /// Socket path for `name` under `dir`. Slashes in MQTT topics become dashes.
    pub fn socket_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        dir.as_ref().join(format!("zone-controller-{}.sock", sanitized))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `XDG_RUNTIME_DIR` if set, `/tmp` otherwise.
fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
