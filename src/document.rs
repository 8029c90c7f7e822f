//! Where documents are read from and written back to.
//!
//! Both operations work on whole-document snapshots; nothing is streamed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Failed to write {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("No such document: {path}")]
    NotFound { path: String },
}

/// Snapshot read/write access to documents identified by path.
pub trait DocumentStore {
    fn read(&self, id: &Path) -> Result<String, DocumentError>;
    fn write(&mut self, id: &Path, text: &str) -> Result<(), DocumentError>;
}

/// Documents on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl DocumentStore for FsStore {
    fn read(&self, id: &Path) -> Result<String, DocumentError> {
        fs::read_to_string(id).map_err(|source| DocumentError::Read {
            path: id.display().to_string(),
            source,
        })
    }

    fn write(&mut self, id: &Path, text: &str) -> Result<(), DocumentError> {
        fs::write(id, text).map_err(|source| DocumentError::Write {
            path: id.display().to_string(),
            source,
        })
    }
}

/// Documents held in memory, for stdin processing and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: HashMap<PathBuf, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<PathBuf>, text: impl Into<String>) {
        self.documents.insert(id.into(), text.into());
    }

    pub fn get(&self, id: &Path) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, id: &Path) -> Result<String, DocumentError> {
        self.get(id).map(str::to_string).ok_or_else(|| DocumentError::NotFound {
            path: id.display().to_string(),
        })
    }

    fn write(&mut self, id: &Path, text: &str) -> Result<(), DocumentError> {
        self.documents.insert(id.to_path_buf(), text.to_string());
        self.writes += 1;
        Ok(())
    }
}
