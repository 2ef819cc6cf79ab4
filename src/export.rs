//! Download sinks: where registry artifacts go when exported.
//!
//! A sink's [`dispatch`](DownloadSink::dispatch) must return promptly; the
//! batch exporter calls it on the async task and only paces between calls.
//! [`DirectorySink`] therefore hands each write to the blocking pool and
//! keeps the join handles, so [`DirectorySink::finish`] can await them all.

use crate::error::ExportError;
use crate::output::CaptureResult;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;
use tracing::debug;

/// Receives one artifact per call.
pub trait DownloadSink: Send + Sync {
    fn dispatch(&self, result: &CaptureResult) -> Result<(), ExportError>;
}

/// Give up on finding a free name after this many suffixed attempts.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Writes artifacts into a directory under their
/// [`file_name`](CaptureResult::file_name).
///
/// Each file is written to a temporary file in the target directory and then
/// moved into place without overwriting; a name collision gets a `-1`, `-2`…
/// suffix. Must be used inside a Tokio runtime.
pub struct DirectorySink {
    dir: PathBuf,
    pending: Mutex<Vec<JoinHandle<Result<PathBuf, ExportError>>>>,
}

impl DirectorySink {
    /// Create the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ExportError::WriteFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Wait for every dispatched write and return the written paths in
    /// dispatch order. The first failure is returned after all writes settle.
    pub async fn finish(self) -> Result<Vec<PathBuf>, ExportError> {
        let handles = self
            .pending
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());

        let mut paths = Vec::with_capacity(handles.len());
        let mut first_err = None;
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| ExportError::Internal(format!("Write task panicked: {}", e)))
                .and_then(|r| r);
            match outcome {
                Ok(path) => paths.push(path),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(paths),
        }
    }
}

impl DownloadSink for DirectorySink {
    fn dispatch(&self, result: &CaptureResult) -> Result<(), ExportError> {
        let dir = self.dir.clone();
        let name = result.file_name();
        let bytes = result.bytes.clone();
        let handle = tokio::task::spawn_blocking(move || write_artifact(&dir, &name, &bytes));
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
        Ok(())
    }
}

fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let write_failed = |path: &Path, source: std::io::Error| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_failed(dir, e))?;
    tmp.write_all(bytes).map_err(|e| write_failed(tmp.path(), e))?;
    tmp.flush().map_err(|e| write_failed(tmp.path(), e))?;

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (name, String::new()),
    };

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}-{attempt}{ext}"))
        };
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => {
                debug!("Wrote {} ({} bytes)", candidate.display(), bytes.len());
                return Ok(candidate);
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(write_failed(&candidate, e.error)),
        }
    }

    Err(write_failed(
        &dir.join(name),
        std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_get_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_artifact(dir.path(), "webpage_x.png", b"one").unwrap();
        let b = write_artifact(dir.path(), "webpage_x.png", b"two").unwrap();
        assert_eq!(a.file_name().unwrap(), "webpage_x.png");
        assert_eq!(b.file_name().unwrap(), "webpage_x-1.png");
        assert_eq!(std::fs::read(&a).unwrap(), b"one");
        assert_eq!(std::fs::read(&b).unwrap(), b"two");
    }

    #[test]
    fn new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let sink = DirectorySink::new(&nested).unwrap();
        assert!(sink.dir().is_dir());
    }
}
