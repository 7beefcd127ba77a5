//! Persistence store for the three index blobs.
//!
//! A store only moves opaque bytes around; encoding lives in the engine.
//! Each blob is replaced all-or-nothing, but there is no commit spanning
//! several blobs.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The three blobs that make up a persisted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobName {
    VocabularyWeights,
    Matrix,
    Ids,
}

impl BlobName {
    pub const ALL: [BlobName; 3] = [BlobName::VocabularyWeights, BlobName::Matrix, BlobName::Ids];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlobName::VocabularyWeights => "vocabulary_weights",
            BlobName::Matrix => "matrix",
            BlobName::Ids => "ids",
        }
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named blob storage.
///
/// `load` returns `Ok(None)` for a blob that was never written; that is
/// the normal state of a fresh deployment, not an error.
pub trait BlobStore {
    fn load(&self, name: BlobName) -> io::Result<Option<Vec<u8>>>;
    fn save(&self, name: BlobName, blob: &[u8]) -> io::Result<()>;
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn load(&self, name: BlobName) -> io::Result<Option<Vec<u8>>> {
        (**self).load(name)
    }

    fn save(&self, name: BlobName, blob: &[u8]) -> io::Result<()> {
        (**self).save(name, blob)
    }
}

/// Stores each blob as `<dir>/<name>.blob`.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// The directory is created lazily on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> DirStore {
        DirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn blob_path(&self, name: BlobName) -> PathBuf {
        self.dir.join(format!("{}.blob", name))
    }
}

impl BlobStore for DirStore {
    fn load(&self, name: BlobName) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes to a temp file then renames it over the blob, so a crash never
    /// leaves a half-written blob behind.
    fn save(&self, name: BlobName, blob: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.blob_path(name);
        let tmp_path = self.dir.join(format!("{}.blob.tmp", name));

        fs::write(&tmp_path, blob)?;
        fs::rename(&tmp_path, &path)?;

        tracing::debug!(blob = %name, bytes = blob.len(), path = %path.display(), "saved blob");
        Ok(())
    }
}

/// Keeps blobs in memory. Handy for tests and for embedding the engine
/// without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<BlobName, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Drops one blob, leaving the others in place.
    pub fn remove(&self, name: BlobName) -> Option<Vec<u8>> {
        self.blobs.lock().remove(&name)
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, name: BlobName) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(&name).cloned())
    }

    fn save(&self, name: BlobName, blob: &[u8]) -> io::Result<()> {
        self.blobs.lock().insert(name, blob.to_vec());
        Ok(())
    }
}
