//! Record Tree
//!
//! A thin key/tree-structured view of the storage root. Containers are
//! directories, records are files, keys are paths relative to the root.
//! Exclusive creation (`create_dir`, `create_new`) doubles as the mutual
//! exclusion primitive for duplicate detection.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory-backed record store rooted at a fixed path
#[derive(Debug, Clone)]
pub struct RecordTree {
    root: PathBuf,
}

impl RecordTree {
    /// Open (creating if needed) a tree rooted at `root`
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a key
    pub fn path(&self, key: impl AsRef<Path>) -> PathBuf {
        self.root.join(key)
    }

    pub fn exists(&self, key: impl AsRef<Path>) -> bool {
        self.path(key).exists()
    }

    // =========================================================================
    // Containers
    // =========================================================================

    /// Create a container; Ok(false) if it already existed
    pub fn create_container(&self, key: impl AsRef<Path>) -> Result<bool> {
        match fs::create_dir(self.path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a container and any missing parents
    pub fn ensure_container(&self, key: impl AsRef<Path>) -> Result<()> {
        fs::create_dir_all(self.path(key))?;
        Ok(())
    }

    /// Remove a container and everything below it; missing is fine
    pub fn remove_container(&self, key: impl AsRef<Path>) -> Result<()> {
        match fs::remove_dir_all(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of the entries of a container, sorted
    ///
    /// A missing container lists as empty. Names that are not valid UTF-8
    /// are skipped.
    pub fn list(&self, key: impl AsRef<Path>) -> Result<Vec<String>> {
        let entries = match fs::read_dir(self.path(key)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            if let Ok(name) = entry?.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Read a record; Ok(None) if it does not exist
    pub fn read(&self, key: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a record in place, replacing any previous content
    pub fn write(&self, key: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(key), bytes)?;
        Ok(())
    }

    /// Write a record so readers see either nothing or the full content
    pub fn write_atomic(&self, key: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
        let target = self.path(key);
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = (|| -> io::Result<()> {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map_err(Into::into)
    }

    /// Create an empty marker record; existing markers are left alone
    pub fn touch(&self, key: impl AsRef<Path>) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path(key))?;
        Ok(())
    }

    /// Remove a record; Ok(false) if it did not exist
    pub fn remove(&self, key: impl AsRef<Path>) -> Result<bool> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Move a file from anywhere on the same filesystem into the tree
    pub fn adopt(&self, source: &Path, key: impl AsRef<Path>) -> Result<()> {
        fs::rename(source, self.path(key))?;
        Ok(())
    }

    /// Size of a record in bytes
    pub fn size(&self, key: impl AsRef<Path>) -> Result<u64> {
        Ok(fs::metadata(self.path(key))?.len())
    }
}
