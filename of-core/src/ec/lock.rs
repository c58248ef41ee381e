//! Machine-wide embedded controller lock
//!
//! Several processes may talk to the EC at once (daemon, command line tools,
//! other vendor utilities honoring the same lock file). Every transaction is
//! bracketed by [`EcLock::request`] and [`EcLock::release`].
//!
//! [`NamedLock`] uses an exclusive `flock(2)` on a world-writable lock file.
//! The kernel drops the lock when its holder dies, so a lock abandoned by a
//! crashed process is simply acquired by the next requester. Nothing checks
//! that the crashed holder left the EC mid-handshake in a sane state; the
//! next transaction starts with a fresh wait-for-ready and proceeds.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::constants::ec::LOCK_POLL_INTERVAL;

/// Cross-process mutual exclusion for EC access
pub trait EcLock: Send + Sync {
    /// Try to acquire the lock within `timeout_ms`
    ///
    /// Returns false on timeout or if the lock is unusable. Not reentrant:
    /// a thread requesting a lock it already holds fails at once, while
    /// other threads wait up to `timeout_ms` for its release.
    fn request(&self, timeout_ms: u64) -> bool;

    /// Release the lock if held, otherwise do nothing
    fn release(&self);
}

/// Named lock backed by an advisory file lock
///
/// Threads sharing one handle wait on each other in-process; other handles
/// and other processes are excluded by the file lock.
pub struct NamedLock {
    path: PathBuf,
    file: Option<File>,
    holder: Mutex<Option<ThreadId>>,
    vacated: Condvar,
}

impl NamedLock {
    /// Open (creating if needed) the lock file at `path`
    ///
    /// Failure to open leaves the lock in an invalid state in which every
    /// request fails; this mirrors a missing OS mutex rather than aborting.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match Self::open_file(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("EC lock {} unavailable: {}", path.display(), e);
                None
            }
        };
        Self {
            path,
            file,
            holder: Mutex::new(None),
            vacated: Condvar::new(),
        }
    }

    fn open_file(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o666)
            .open(path)?;
        // umask may have stripped bits; every user must be able to take the lock
        let _ = file.set_permissions(std::fs::Permissions::from_mode(0o666));
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lock file could be opened
    pub fn is_valid(&self) -> bool {
        self.file.is_some()
    }

    fn try_lock(file: &File) -> bool {
        // SAFETY: flock only operates on the descriptor, which `file` keeps open.
        unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
    }

    /// Claim the handle for the calling thread, waiting for other threads
    fn claim(&self, deadline: Instant) -> bool {
        let me = std::thread::current().id();
        let mut holder = self.holder.lock();
        loop {
            match *holder {
                None => {
                    *holder = Some(me);
                    return true;
                }
                Some(id) if id == me => {
                    debug!("EC lock already held by this thread");
                    return false;
                }
                Some(_) => {
                    if self.vacated.wait_until(&mut holder, deadline).timed_out() && holder.is_some() {
                        debug!("EC lock {} held by another thread", self.path.display());
                        return false;
                    }
                }
            }
        }
    }

    fn vacate(&self) {
        *self.holder.lock() = None;
        self.vacated.notify_one();
    }
}

impl EcLock for NamedLock {
    fn request(&self, timeout_ms: u64) -> bool {
        let Some(file) = self.file.as_ref() else {
            return false;
        };
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        if !self.claim(deadline) {
            return false;
        }

        loop {
            if Self::try_lock(file) {
                return true;
            }
            if Instant::now() >= deadline {
                debug!("EC lock {} busy after {} ms", self.path.display(), timeout_ms);
                self.vacate();
                return false;
            }
            std::thread::sleep(LOCK_POLL_INTERVAL);
        }
    }

    fn release(&self) {
        let Some(file) = self.file.as_ref() else {
            return;
        };
        let mut holder = self.holder.lock();
        if holder.is_some() {
            // SAFETY: see try_lock.
            unsafe {
                libc::flock(file.as_raw_fd(), libc::LOCK_UN);
            }
            *holder = None;
            drop(holder);
            self.vacated.notify_one();
        }
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        self.release();
    }
}
