//! Upload staging
//!
//! File payloads are streamed off the socket before the post is validated,
//! so they land in a private staging record first. The message is only
//! assembled once the whole request has been read; a `StagedFile` that is
//! never adopted removes itself when dropped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A file payload in flight
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl StagedFile {
    /// Create a fresh staging record at `path` (must not exist yet)
    pub(crate) fn create(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Flush and close the file, then hand its path to `adopt`
    ///
    /// On success the staging record belongs to whoever adopted it and is no
    /// longer removed on drop.
    pub(crate) fn finish<F>(mut self, adopt: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        adopt(&self.path)?;
        self.path = PathBuf::new();
        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "staged file already closed"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.file.take();
        if !self.path.as_os_str().is_empty() {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staged upload {:?}: {}", self.path, e);
                }
            }
        }
    }
}
