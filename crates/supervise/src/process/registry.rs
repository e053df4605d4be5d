//! File-backed record of the live supervisor's PID.
//!
//! The record holds a single decimal PID followed by a newline. Reading it
//! doubles as garbage collection: a record that does not parse, or that names
//! a process which no longer exists, is deleted and reported as absent.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::PROCESS_TARGET;
use super::errors::RegistryError;
use super::liveness::{ProcessProbe, SystemProcessProbe};

/// PID record stored at a fixed path.
#[derive(Debug, Clone)]
pub struct PidRegistry<P = SystemProcessProbe> {
    path: PathBuf,
    probe: P,
}

impl PidRegistry<SystemProcessProbe> {
    /// Builds a registry that probes real processes.
    #[must_use]
    pub fn system(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SystemProcessProbe)
    }
}

impl<P: ProcessProbe> PidRegistry<P> {
    /// Builds a registry at `path` using `probe` for liveness checks.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            path: path.into(),
            probe,
        }
    }

    /// Location of the record.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Probe used for liveness checks and signalling.
    #[must_use]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Returns the recorded PID when it names a live process.
    ///
    /// Stale and unparsable records are removed before returning `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the record exists but cannot be read, or
    /// when a stale record cannot be removed.
    pub fn read(&self) -> Result<Option<u32>, RegistryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RegistryError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let Some(pid) = parse_pid(&content) else {
            warn!(
                target: PROCESS_TARGET,
                file = %self.path.display(),
                "pid record is malformed; removing"
            );
            self.clear()?;
            return Ok(None);
        };
        if self.probe.is_alive(pid) {
            return Ok(Some(pid));
        }
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path.display(),
            "recorded process is gone; removing stale pid record"
        );
        self.clear()?;
        Ok(None)
    }

    /// Atomically replaces the record with `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Write`] when the record cannot be written.
    pub fn write(&self, pid: u32) -> Result<(), RegistryError> {
        let write_error = |source| RegistryError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let staging = self.staging_path();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&staging).map_err(write_error)?;
        writeln!(file, "{pid}").map_err(write_error)?;
        file.sync_all().map_err(write_error)?;
        fs::rename(&staging, &self.path).map_err(write_error)?;
        debug!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path.display(),
            "pid record written"
        );
        Ok(())
    }

    /// Deletes the record; succeeds when it is already absent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Remove`] when the file exists but cannot be
    /// deleted.
    pub fn clear(&self) -> Result<(), RegistryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(
                    target: PROCESS_TARGET,
                    file = %self.path.display(),
                    "pid record removed"
                );
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RegistryError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn parse_pid(content: &str) -> Option<u32> {
    content
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid != 0 && i32::try_from(*pid).is_ok())
}
