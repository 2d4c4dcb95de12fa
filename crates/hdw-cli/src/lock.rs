//! Exclusive run lock.
//!
//! Runs write into the same directories, so only one may be active. The lock
//! is a file created with `create_new`; it records the holder's pid and start
//! time and is removed when [`RunLock`] drops. A lock left by a run that died
//! is stale once its process is gone or its start time is older than the
//! stale threshold; it is then removed and taken over.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{debug, warn};

use crate::error::RunError;

pub const LOCK_FILE: &str = ".hdw.lock";

/// Age after which a lock is stale when the run has no timeout.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Holder details recorded in a lock file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LockHolder {
    pid: Option<u32>,
    started: Option<DateTime<FixedOffset>>,
}

impl LockHolder {
    fn parse(content: &str) -> Self {
        let mut holder = LockHolder::default();
        for line in content.lines() {
            match line.trim().split_once('=') {
                Some(("pid", value)) => holder.pid = value.trim().parse().ok(),
                Some(("started", value)) => {
                    holder.started = DateTime::parse_from_rfc3339(value.trim()).ok();
                }
                _ => {}
            }
        }
        holder
    }

    /// Reason the holder no longer protects the lock, if any.
    fn stale_reason(&self, stale_after: Duration) -> Option<String> {
        if let Some(pid) = self.pid
            && !process_alive(pid)
        {
            return Some(format!("process {pid} is not running"));
        }
        let started = self.started?;
        let age = Local::now().fixed_offset().signed_duration_since(started);
        let age = age.to_std().ok()?;
        (age > stale_after).then(|| format!("started {}s ago", age.as_secs()))
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

fn create_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock in `dir` with the default stale threshold.
    pub fn acquire(dir: &Path) -> Result<Self, RunError> {
        Self::acquire_with(dir, DEFAULT_STALE_AFTER)
    }

    /// Takes the lock in `dir`, creating the directory if needed. An existing
    /// lock older than `stale_after`, or whose process is gone, is replaced.
    pub fn acquire_with(dir: &Path, stale_after: Duration) -> Result<Self, RunError> {
        let path = dir.join(LOCK_FILE);
        fs::create_dir_all(dir).map_err(|source| RunError::Lock {
            operation: "create directory for",
            path: path.clone(),
            source,
        })?;
        let mut file = match create_lock_file(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let content = fs::read_to_string(&path).unwrap_or_default();
                let holder = if content.trim().is_empty() {
                    "unknown holder".to_string()
                } else {
                    content.trim().replace('\n', ", ")
                };
                let Some(reason) = LockHolder::parse(&content).stale_reason(stale_after) else {
                    return Err(RunError::LockHeld { path, holder });
                };
                warn!(path = %path.display(), holder = %holder, reason = %reason, "removing stale run lock");
                fs::remove_file(&path).map_err(|source| RunError::Lock {
                    operation: "remove stale",
                    path: path.clone(),
                    source,
                })?;
                match create_lock_file(&path) {
                    Ok(file) => file,
                    Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                        return Err(RunError::LockHeld { path, holder });
                    }
                    Err(source) => {
                        return Err(RunError::Lock {
                            operation: "create",
                            path,
                            source,
                        });
                    }
                }
            }
            Err(source) => {
                return Err(RunError::Lock {
                    operation: "create",
                    path,
                    source,
                });
            }
        };
        let stamp = format!(
            "pid={}\nstarted={}\n",
            std::process::id(),
            Local::now().to_rfc3339()
        );
        if let Err(source) = file.write_all(stamp.as_bytes()) {
            let _ = fs::remove_file(&path);
            return Err(RunError::Lock {
                operation: "write",
                path,
                source,
            });
        }
        debug!(path = %path.display(), "run lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "run lock released"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to release run lock"),
        }
    }
}
