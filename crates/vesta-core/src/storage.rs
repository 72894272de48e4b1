//! Object-storage collaborator interface plus a directory-backed
//! implementation for local runs and tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VestaError};

/// One listed object.
#[derive(Clone, Debug)]
pub struct StorageEntry {
    pub name: String,
    pub size: u64,
}

/// Minimal object-store surface the pipeline needs. Implementations must
/// be safe to call from the parallel download pool.
pub trait ObjectStorage: Send + Sync {
    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;

    /// Returns a public URL when `public` is set and the backend has one.
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8], public: bool)
        -> Result<Option<String>>;

    /// Entries under `prefix`, sorted by name ascending. Auto bias
    /// selection relies on that ordering.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StorageEntry>>;

    fn delete(&self, bucket: &str, path: &str) -> Result<bool>;
}

/// Directory-backed storage: `root/bucket/path`.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, bucket: &str, path: &str) -> PathBuf {
        self.root.join(bucket).join(path)
    }

    fn collect_entries(
        dir: &Path,
        base: &Path,
        entries: &mut Vec<StorageEntry>,
    ) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::collect_entries(&path, base, entries)?;
            } else {
                let meta = entry.metadata()?;
                let name = path
                    .strip_prefix(base)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                entries.push(StorageEntry {
                    name,
                    size: meta.len(),
                });
            }
        }
        Ok(())
    }
}

impl ObjectStorage for FsStorage {
    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(bucket, path);
        fs::read(&full).map_err(|e| VestaError::Download {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _public: bool,
    ) -> Result<Option<String>> {
        let full = self.resolve(bucket, path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, bytes)?;
        Ok(None)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StorageEntry>> {
        let base = self.root.join(bucket);
        if !base.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        Self::collect_entries(&base, &base, &mut entries)?;
        entries.retain(|e| e.name.starts_with(prefix));
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn delete(&self, bucket: &str, path: &str) -> Result<bool> {
        let full = self.resolve(bucket, path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
