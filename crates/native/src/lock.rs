//! Cross-process extraction lock.
//!
//! An exclusive OS lock on `<module>.lock`. The holder writes its pid into the
//! file and clears it on release; the OS drops the lock when a process dies, so
//! a marker found by the next holder means the previous one died mid-extraction.

use std::io::{Read, Seek, Write};

const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(25);

#[derive(Debug)]
pub struct ExtractionLock {
    file: std::fs::File,
    path: std::path::PathBuf,
    recovered: Option<String>,
}

impl ExtractionLock {
    /// Polls for the lock until `timeout` has passed.
    ///
    /// # Errors
    ///
    /// - [`crate::error::NativeError::LockTimeout`] if another holder kept it for the whole wait.
    /// - [`crate::error::NativeError::Io`] if the lock file cannot be opened or locked.
    pub fn acquire(
        path: &std::path::Path,
        timeout: std::time::Duration,
    ) -> crate::error::NativeResult<Self> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let started = std::time::Instant::now();

        loop {
            match file.try_lock() {
                Ok(()) => break,
                Err(std::fs::TryLockError::WouldBlock) => {
                    let waited = started.elapsed();

                    if waited >= timeout {
                        return Err(crate::error::NativeError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }

                    std::thread::sleep(POLL_INTERVAL.min(timeout - waited));
                }
                Err(std::fs::TryLockError::Error(err)) => return Err(err.into()),
            }
        }

        let mut marker = String::new();

        file.read_to_string(&mut marker)?;

        let recovered = match marker.trim() {
            "" => None,
            pid => {
                tracing::warn!(pid, lock = %path.display(), "previous extraction was abandoned");
                Some(pid.to_owned())
            }
        };

        file.set_len(0)?;
        file.rewind()?;
        write!(file, "{}", std::process::id())?;
        file.sync_data()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            recovered,
        })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Pid left behind by a holder that died without releasing.
    #[inline]
    #[must_use]
    pub fn recovered_from(&self) -> Option<&str> {
        self.recovered.as_deref()
    }
}

impl Drop for ExtractionLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.set_len(0) {
            tracing::warn!(%err, lock = %self.path.display(), "failed to clear lock marker");
        }

        if let Err(err) = self.file.unlock() {
            tracing::warn!(%err, lock = %self.path.display(), "failed to release lock");
        }
    }
}
