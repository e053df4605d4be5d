//! Resolves the application the supervisor is asked to keep alive.
//!
//! Both the controller and the supervisor derive the same [`Application`] from
//! the command line so they agree on the program, its name, and where the PID
//! record lives.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::defaults::PID_FILE_NAME;
use crate::manifest::{AppManifest, MANIFEST_FILE_NAME, ManifestError};

const FALLBACK_APP_NAME: &str = "Application";

/// Raw application selection taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationRequest<'a> {
    /// Application directory or program path; defaults to the working directory.
    pub path: Option<&'a Path>,
    /// Explicit PID record location.
    pub pid_path: Option<&'a Path>,
    /// Explicit application name.
    pub name: Option<&'a str>,
    /// Trailing arguments appended to the program arguments.
    pub args: &'a [OsString],
}

/// Fully resolved application description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    name: String,
    source: PathBuf,
    app_dir: PathBuf,
    program: PathBuf,
    args: Vec<OsString>,
    extra_args: Vec<OsString>,
    pid_path: PathBuf,
}

impl Application {
    /// Resolves a request relative to the current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError`] when the working directory cannot be read
    /// or [`Application::resolve_from`] fails.
    pub fn resolve(request: ApplicationRequest<'_>) -> Result<Self, ApplicationError> {
        let base = env::current_dir().map_err(|source| ApplicationError::WorkingDirectory { source })?;
        Self::resolve_from(&base, request)
    }

    /// Resolves a request relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError`] when the path does not exist, when a
    /// directory lacks a manifest naming the command, or when the manifest is
    /// malformed.
    pub fn resolve_from(base: &Path, request: ApplicationRequest<'_>) -> Result<Self, ApplicationError> {
        let requested = request
            .path
            .map_or_else(|| base.to_path_buf(), |path| base.join(path));
        let target = requested
            .canonicalize()
            .map_err(|source| ApplicationError::MissingPath {
                path: requested.clone(),
                source,
            })?;

        let (app_dir, manifest, program, mut args) = if target.is_dir() {
            let manifest = AppManifest::discover(&target)?.ok_or_else(|| {
                ApplicationError::MissingManifest {
                    path: target.join(MANIFEST_FILE_NAME),
                }
            })?;
            let command = manifest
                .command
                .as_deref()
                .map(str::trim)
                .filter(|command| !command.is_empty())
                .ok_or_else(|| ApplicationError::MissingCommand {
                    path: target.join(MANIFEST_FILE_NAME),
                })?;
            let program = target.join(command);
            let args = manifest.args.iter().map(OsString::from).collect();
            (target.clone(), Some(manifest), program, args)
        } else {
            let app_dir = target
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| ApplicationError::MissingParent {
                    path: target.clone(),
                })?;
            let manifest = AppManifest::discover(&app_dir)?;
            (app_dir, manifest, target.clone(), Vec::new())
        };
        let extra_args = request.args.to_vec();
        args.extend(extra_args.iter().cloned());

        let name = resolve_name(request.name, manifest.as_ref(), &program);
        let pid_path = request.pid_path.map_or_else(
            || app_dir.join(PID_FILE_NAME),
            |path| base.join(path),
        );

        Ok(Self {
            name,
            source: target,
            app_dir,
            program,
            args,
            extra_args,
            pid_path,
        })
    }

    /// Name used in status messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical form of the requested directory or program path.
    #[must_use]
    pub fn source(&self) -> &Path {
        self.source.as_path()
    }

    /// Canonical application directory; the supervisor runs from here.
    #[must_use]
    pub fn app_dir(&self) -> &Path {
        self.app_dir.as_path()
    }

    /// Program executed as the target process.
    #[must_use]
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments supplied on the command line rather than by the manifest.
    #[must_use]
    pub fn extra_args(&self) -> &[OsString] {
        &self.extra_args
    }

    /// Location of the PID record.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }
}

fn resolve_name(explicit: Option<&str>, manifest: Option<&AppManifest>, program: &Path) -> String {
    explicit
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| manifest.and_then(AppManifest::name))
        .map(str::to_owned)
        .or_else(|| {
            program
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| FALLBACK_APP_NAME.to_owned())
}

/// Errors raised while resolving the application to supervise.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The working directory could not be determined.
    #[error("failed to read the working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The requested path does not exist or cannot be resolved.
    #[error("application path {path:?} cannot be resolved: {source}")]
    MissingPath {
        /// Requested path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The program path has no parent directory.
    #[error("program {path:?} has no parent directory")]
    MissingParent {
        /// Program path.
        path: PathBuf,
    },
    /// A directory was given but contains no manifest.
    #[error("no program given and no manifest found at {path:?}")]
    MissingManifest {
        /// Expected manifest path.
        path: PathBuf,
    },
    /// The manifest does not name a command.
    #[error("manifest {path:?} does not name a command")]
    MissingCommand {
        /// Manifest path.
        path: PathBuf,
    },
    /// The manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
