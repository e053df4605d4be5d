//! Redirection of standard output and error into files.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;

/// Files that receive standard output and standard error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdioTargets {
    out: Option<PathBuf>,
    err: Option<PathBuf>,
    append: bool,
}

/// Errors raised while opening redirection files.
#[derive(Debug, Error)]
pub enum StdioError {
    /// The file could not be opened for writing.
    #[error("failed to open output file '{path}': {source}")]
    Open {
        /// Requested file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Opened redirection handles; `None` means no file was requested.
#[derive(Debug, Default)]
pub struct OpenedStdio {
    out: Option<File>,
    err: Option<File>,
}

impl OpenedStdio {
    /// Standard output handle, or `fallback` when no file was requested.
    pub fn stdout_or(&mut self, fallback: fn() -> Stdio) -> Stdio {
        self.out.take().map_or_else(fallback, Stdio::from)
    }

    /// Standard error handle, or `fallback` when no file was requested.
    pub fn stderr_or(&mut self, fallback: fn() -> Stdio) -> Stdio {
        self.err.take().map_or_else(fallback, Stdio::from)
    }
}

impl StdioTargets {
    /// Describes where output should go. Files are truncated on open unless
    /// `append` is set.
    #[must_use]
    pub const fn new(out: Option<PathBuf>, err: Option<PathBuf>, append: bool) -> Self {
        Self { out, err, append }
    }

    /// Standard output file, if any.
    #[must_use]
    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }

    /// Standard error file, if any.
    #[must_use]
    pub fn err(&self) -> Option<&Path> {
        self.err.as_deref()
    }

    /// Whether files are appended to rather than truncated.
    #[must_use]
    pub const fn append(&self) -> bool {
        self.append
    }

    /// Opens the requested files, sharing one handle when both streams name
    /// the same path.
    ///
    /// # Errors
    ///
    /// Returns [`StdioError::Open`] when a file cannot be opened.
    pub fn open(&self) -> Result<OpenedStdio, StdioError> {
        let out = self.out.as_deref().map(|path| self.open_file(path)).transpose()?;
        let err = match (&self.err, &out) {
            (Some(err_path), Some(file)) if Some(err_path) == self.out.as_ref() => {
                Some(file.try_clone().map_err(|source| StdioError::Open {
                    path: err_path.clone(),
                    source,
                })?)
            }
            (Some(err_path), _) => Some(self.open_file(err_path)?),
            (None, _) => None,
        };
        Ok(OpenedStdio { out, err })
    }

    fn open_file(&self, path: &Path) -> Result<File, StdioError> {
        let mut options = OpenOptions::new();
        options.create(true);
        if self.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options.open(path).map_err(|source| StdioError::Open {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn dir() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("out.log"), "previous\n").expect("seed log");
        dir
    }

    fn write_through(targets: &StdioTargets, text: &str) {
        let opened = targets.open().expect("open targets");
        let mut file = opened.out.expect("stdout file");
        file.write_all(text.as_bytes()).expect("write");
    }

    #[rstest]
    fn truncates_by_default(dir: TempDir) {
        let path = dir.path().join("out.log");
        write_through(&StdioTargets::new(Some(path.clone()), None, false), "fresh\n");
        assert_eq!(fs::read_to_string(path).expect("read log"), "fresh\n");
    }

    #[rstest]
    fn appends_when_requested(dir: TempDir) {
        let path = dir.path().join("out.log");
        write_through(&StdioTargets::new(Some(path.clone()), None, true), "more\n");
        assert_eq!(
            fs::read_to_string(path).expect("read log"),
            "previous\nmore\n"
        );
    }

    #[rstest]
    fn shared_path_uses_one_handle(dir: TempDir) {
        let path = dir.path().join("both.log");
        let targets = StdioTargets::new(Some(path.clone()), Some(path.clone()), false);
        let opened = targets.open().expect("open targets");
        let mut out = opened.out.expect("stdout");
        let mut err = opened.err.expect("stderr");
        out.write_all(b"one\n").expect("write out");
        err.write_all(b"two\n").expect("write err");
        assert_eq!(fs::read_to_string(path).expect("read log"), "one\ntwo\n");
    }

    #[rstest]
    fn missing_directory_is_reported(dir: TempDir) {
        let path = dir.path().join("absent/out.log");
        let error = StdioTargets::new(None, Some(path), false)
            .open()
            .expect_err("parent directory does not exist");
        assert!(matches!(error, StdioError::Open { .. }));
    }

    #[test]
    fn nothing_requested_opens_nothing() {
        let opened = StdioTargets::default().open().expect("open");
        assert!(opened.out.is_none() && opened.err.is_none());
    }
}
