//! Virtual file system: named resources resolved to byte streams.
//!
//! Asset decoders consume resources through the [`Vfs`] trait and never
//! learn whether the bytes came from a loose file, an in-memory table, or
//! some future archive reader.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors from resource resolution.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("resource not found: {name}")]
    NotFound { name: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to named resources.
pub trait Vfs {
    /// Open a named resource and return its full contents.
    fn open(&self, name: &str) -> Result<Vec<u8>, VfsError>;
}

/// Loose-file VFS over an ordered list of root directories.
///
/// Roots are searched front to back; the first directory containing the
/// resource wins. Names match case-insensitively since DOS-era asset names
/// are conventionally uppercase while on-disk casing varies.
#[derive(Debug, Clone, Default)]
pub struct DirVfs {
    roots: Vec<PathBuf>,
}

impl DirVfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a search root, returning self for chaining.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.add_root(root);
        self
    }

    /// Append a search root.
    pub fn add_root(&mut self, root: impl AsRef<Path>) {
        self.roots.push(root.as_ref().to_path_buf());
    }

    /// Roots in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn resolve(&self, name: &str) -> Result<Option<PathBuf>, VfsError> {
        for root in &self.roots {
            let direct = root.join(name);
            if direct.is_file() {
                return Ok(Some(direct));
            }

            // Case-insensitive scan of the directory entries.
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                // A missing root is not fatal; later roots may still hit.
                Err(_) => continue,
            };
            for entry in entries {
                let entry = entry?;
                let file_name = entry.file_name();
                if file_name.to_string_lossy().eq_ignore_ascii_case(name)
                    && entry.path().is_file()
                {
                    return Ok(Some(entry.path()));
                }
            }
        }
        Ok(None)
    }
}

impl Vfs for DirVfs {
    fn open(&self, name: &str) -> Result<Vec<u8>, VfsError> {
        match self.resolve(name)? {
            Some(path) => {
                tracing::debug!(%name, path = %path.display(), "resolved resource");
                Ok(std::fs::read(path)?)
            }
            None => Err(VfsError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// In-memory VFS for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryVfs {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource under the given name, replacing any earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), data.into());
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Vfs for MemoryVfs {
    fn open(&self, name: &str) -> Result<Vec<u8>, VfsError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::NotFound {
                name: name.to_string(),
            })
    }
}

pub fn crate_info() -> &'static str {
    "dawnfell-vfs v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_vfs_open() {
        let mut vfs = MemoryVfs::new();
        vfs.insert("TEST.INF", b"@SOUND".to_vec());
        assert_eq!(vfs.open("TEST.INF").unwrap(), b"@SOUND");
    }

    #[test]
    fn memory_vfs_missing_is_not_found() {
        let vfs = MemoryVfs::new();
        match vfs.open("MISSING.INF") {
            Err(VfsError::NotFound { name }) => assert_eq!(name, "MISSING.INF"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn dir_vfs_exact_match() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("LEVEL.INF"), b"abc").unwrap();

        let vfs = DirVfs::new().with_root(tmp.path());
        assert_eq!(vfs.open("LEVEL.INF").unwrap(), b"abc");
    }

    #[test]
    fn dir_vfs_case_insensitive_match() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("level.inf"), b"abc").unwrap();

        let vfs = DirVfs::new().with_root(tmp.path());
        assert_eq!(vfs.open("LEVEL.INF").unwrap(), b"abc");
    }

    #[test]
    fn dir_vfs_first_root_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("A.INF"), b"first").unwrap();
        std::fs::write(second.path().join("A.INF"), b"second").unwrap();

        let vfs = DirVfs::new().with_root(first.path()).with_root(second.path());
        assert_eq!(vfs.open("A.INF").unwrap(), b"first");
    }

    #[test]
    fn dir_vfs_missing_root_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("A.INF"), b"abc").unwrap();

        let vfs = DirVfs::new()
            .with_root(tmp.path().join("does_not_exist"))
            .with_root(tmp.path());
        assert_eq!(vfs.open("A.INF").unwrap(), b"abc");
    }

    #[test]
    fn dir_vfs_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let vfs = DirVfs::new().with_root(tmp.path());
        assert!(matches!(
            vfs.open("NOPE.INF"),
            Err(VfsError::NotFound { .. })
        ));
    }
}
