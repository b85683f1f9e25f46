//! Folder storage: the capability set the workspace needs from a folder.
//!
//! DESIGN
//! ======
//! The workspace never touches paths. It talks to a [`Storage`] that can list
//! the folder, read a file as text, create a file, overwrite a file, and
//! remove one. Two backends ship with the crate: [`FsStorage`] over a local
//! directory and [`MemoryStorage`] for hosts without a filesystem and for
//! tests.
//!
//! File names are flat. A name with a path separator, an empty name, `.` or
//! `..` is rejected before any I/O.
//!
//! ERROR HANDLING
//! ==============
//! `NotFound` and `AlreadyExists` are reported as their own variants so the
//! workspace can map them to user-facing conditions. Everything else is `Io`
//! and is retryable. A failed overwrite leaves the previous content in place.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("not a folder: {}", .0.display())]
    NotAFolder(PathBuf),
    #[error("storage I/O failed for {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl crate::error::ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_FILE_NOT_FOUND",
            Self::AlreadyExists(_) => "E_FILE_EXISTS",
            Self::InvalidName(_) => "E_INVALID_FILE_NAME",
            Self::NotAFolder(_) => "E_NOT_A_FOLDER",
            Self::Io { .. } => "E_STORAGE_IO",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

fn io_error(name: &str, source: std::io::Error) -> StorageError {
    match source.kind() {
        ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
        ErrorKind::AlreadyExists => StorageError::AlreadyExists(name.to_string()),
        _ => StorageError::Io { name: name.to_string(), source },
    }
}

/// Reject names that would escape the folder or address it.
fn check_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

// =============================================================================
// CAPABILITY
// =============================================================================

/// Kind of a folder entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One folder entry as listed by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageItem {
    pub name: String,
    pub kind: EntryKind,
}

/// How `create` treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Fail with `AlreadyExists` if the name is taken.
    New,
    /// Succeed either way; existing content is kept.
    IfAbsent,
}

/// Folder capability used by the workspace.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Every entry in the folder, in backend order.
    async fn list(&self) -> Result<Vec<StorageItem>, StorageError>;

    /// Full content of a file as UTF-8 text.
    async fn read_text(&self, name: &str) -> Result<String, StorageError>;

    /// Create an empty file.
    async fn create(&self, name: &str, mode: CreateMode) -> Result<(), StorageError>;

    /// Replace the content of an existing file. Either the whole new text
    /// lands or the old content stays.
    async fn write_text(&self, name: &str, text: &str) -> Result<(), StorageError>;

    /// Delete a file.
    async fn remove(&self, name: &str) -> Result<(), StorageError>;
}

// =============================================================================
// LOCAL FOLDER
// =============================================================================

/// A local directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Open an existing directory.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not exist, `NotAFolder` if it is not a
    /// directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let label = root.display().to_string();
        let metadata = tokio::fs::metadata(&root).await.map_err(|e| io_error(&label, e))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotAFolder(root));
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        check_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait::async_trait]
impl Storage for FsStorage {
    async fn list(&self) -> Result<Vec<StorageItem>, StorageError> {
        let label = self.root.display().to_string();
        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(|e| io_error(&label, e))?;
        let mut items = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(&label, e))? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "skipping non UTF-8 file name");
                    continue;
                }
            };
            let file_type = entry.file_type().await.map_err(|e| io_error(&name, e))?;
            let kind = if file_type.is_dir() { EntryKind::Directory } else { EntryKind::File };
            items.push(StorageItem { name, kind });
        }
        Ok(items)
    }

    async fn read_text(&self, name: &str) -> Result<String, StorageError> {
        let path = self.path_for(name)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| io_error(name, e))
    }

    async fn create(&self, name: &str, mode: CreateMode) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        match mode {
            CreateMode::New => options.create_new(true),
            CreateMode::IfAbsent => options.create(true),
        };
        options.open(&path).await.map_err(|e| io_error(name, e))?;
        Ok(())
    }

    async fn write_text(&self, name: &str, text: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        if !tokio::fs::try_exists(&path).await.map_err(|e| io_error(name, e))? {
            return Err(StorageError::NotFound(name.to_string()));
        }

        // Stage next to the target so the rename stays on one filesystem.
        let staging = self.root.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&staging, text).await.map_err(|e| io_error(name, e))?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                debug!(file = %name, error = %cleanup, "staging file cleanup failed");
            }
            return Err(io_error(name, e));
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| io_error(name, e))
    }
}

// =============================================================================
// IN-MEMORY FOLDER
// =============================================================================

/// A folder held in memory. Listing order is name order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, String>>,
    directories: Vec<String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.get_mut().insert(name.into(), text.into());
        self
    }

    /// Seed a sub-folder entry. Sub-folders are listed but hold nothing.
    #[must_use]
    pub fn with_directory(mut self, name: impl Into<String>) -> Self {
        self.directories.push(name.into());
        self
    }

    /// Current content of a file.
    pub async fn contents(&self, name: &str) -> Option<String> {
        self.files.lock().await.get(name).cloned()
    }

    /// Names of every stored file, sorted.
    pub async fn file_names(&self) -> Vec<String> {
        self.files.lock().await.keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn list(&self) -> Result<Vec<StorageItem>, StorageError> {
        let files = self.files.lock().await;
        let dirs = self.directories.iter().map(|name| StorageItem { name: name.clone(), kind: EntryKind::Directory });
        let items = files.keys().map(|name| StorageItem { name: name.clone(), kind: EntryKind::File });
        Ok(dirs.chain(items).collect())
    }

    async fn read_text(&self, name: &str) -> Result<String, StorageError> {
        check_name(name)?;
        self.files
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn create(&self, name: &str, mode: CreateMode) -> Result<(), StorageError> {
        check_name(name)?;
        let mut files = self.files.lock().await;
        match (files.contains_key(name), mode) {
            (true, CreateMode::New) => Err(StorageError::AlreadyExists(name.to_string())),
            (true, CreateMode::IfAbsent) => Ok(()),
            (false, _) => {
                files.insert(name.to_string(), String::new());
                Ok(())
            }
        }
    }

    async fn write_text(&self, name: &str, text: &str) -> Result<(), StorageError> {
        check_name(name)?;
        let mut files = self.files.lock().await;
        let slot = files.get_mut(name).ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        *slot = text.to_string();
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        check_name(name)?;
        self.files
            .lock()
            .await
            .remove(name)
            .map(drop)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}
