//! Optional application manifest describing what to run from a directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Manifest file looked up inside an application directory.
pub const MANIFEST_FILE_NAME: &str = "supervise.json";

/// Contents of `supervise.json`.
///
/// ```json
/// { "name": "api", "command": "bin/api-server", "args": ["--port", "8080"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppManifest {
    /// Human-readable application name used in status messages.
    #[serde(default)]
    pub name: Option<String>,
    /// Program to run, relative to the application directory.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to the program before any trailing CLI arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl AppManifest {
    /// Reads the manifest from `app_dir`, returning `None` when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file exists but cannot be read or
    /// does not contain a valid manifest.
    pub fn discover(app_dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = app_dir.join(MANIFEST_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ManifestError::Read { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ManifestError::Parse { path, source })
    }

    /// Name with surrounding whitespace removed, ignoring blank values.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Errors raised while reading an application manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest exists but could not be read.
    #[error("failed to read manifest {path:?}: {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The manifest is not valid JSON or has unexpected fields.
    #[error("failed to parse manifest {path:?}: {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}
