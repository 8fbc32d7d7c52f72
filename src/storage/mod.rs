// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File storage and score library persistence.
//!
//! This module provides:
//! - The file storage collaborator (copy-in with unique names, idempotent delete)
//! - The score store with an explicit save policy
//! - JSON persistence of the library relative to the storage root

pub mod persistence;
pub mod store;

pub use persistence::{JsonPersistence, MemoryPersistence, ScorePersistence};
pub use store::{SavePolicy, ScoreStore, StoreError};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::part::UNIQUE_SUFFIX_SEPARATOR;

/// File storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Source file could not be read
    #[error("source file not found: {0:?}")]
    SourceMissing(PathBuf),
    /// Source path has no usable file name
    #[error("source path has no file name: {0:?}")]
    NoFileName(PathBuf),
    /// Underlying I/O failure
    #[error("storage I/O failed for {path:?}: {source}")]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// I/O error
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Copy-in/delete contract for user-supplied files
pub trait FileStorage {
    /// Directory all stored files live in
    fn root(&self) -> &Path;

    /// Copy `source` into storage under a name no other import will ever get
    fn copy_in(&self, source: &Path) -> Result<PathBuf, StorageError>;

    /// Copy `source` into storage as `file_name`, or as `name_1`, `name_2`, ...
    /// when that name is taken
    fn copy_in_as(&self, source: &Path, file_name: &str) -> Result<PathBuf, StorageError>;

    /// Delete a stored file; deleting a missing file is not an error
    fn delete(&self, file: &Path) -> Result<(), StorageError>;
}

/// Storage backed by a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Open (and create if needed) a storage directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Build the unique stored name for `source`: `<stem>@<UUID>.<ext>`
    fn unique_name(source: &Path) -> Result<String, StorageError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::NoFileName(source.to_path_buf()))?;
        let suffix = Uuid::new_v4().to_string().to_uppercase();
        Ok(match source.extension() {
            Some(ext) => format!(
                "{}{}{}.{}",
                stem,
                UNIQUE_SUFFIX_SEPARATOR,
                suffix,
                ext.to_string_lossy()
            ),
            None => format!("{}{}{}", stem, UNIQUE_SUFFIX_SEPARATOR, suffix),
        })
    }
}

impl FileStorage for LocalFileStorage {
    fn root(&self) -> &Path {
        &self.root
    }

    fn copy_in(&self, source: &Path) -> Result<PathBuf, StorageError> {
        if !source.is_file() {
            return Err(StorageError::SourceMissing(source.to_path_buf()));
        }
        let dest = self.root.join(Self::unique_name(source)?);
        fs::copy(source, &dest).map_err(|e| StorageError::io(source, e))?;
        info!("Stored {:?} as {:?}", source, dest);
        Ok(dest)
    }

    fn copy_in_as(&self, source: &Path, file_name: &str) -> Result<PathBuf, StorageError> {
        if !source.is_file() {
            return Err(StorageError::SourceMissing(source.to_path_buf()));
        }
        let dest = unique_destination(&self.root, file_name);
        fs::copy(source, &dest).map_err(|e| StorageError::io(&dest, e))?;
        debug!("Stored {:?} as {:?}", source, dest);
        Ok(dest)
    }

    fn delete(&self, file: &Path) -> Result<(), StorageError> {
        match fs::remove_file(file) {
            Ok(()) => {
                debug!("Deleted {:?}", file);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Delete of missing file {:?} ignored", file);
                Ok(())
            }
            Err(e) => Err(StorageError::io(file, e)),
        }
    }
}

/// First free path for `file_name` in `dir`, trying `name`, `name_1`, `name_2`, ...
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let proposed = dir.join(file_name);
    if !proposed.exists() {
        return proposed;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = as_path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut index = 1usize;
    loop {
        let candidate = match &ext {
            Some(ext) => dir.join(format!("{}_{}.{}", stem, index, ext)),
            None => dir.join(format!("{}_{}", stem, index)),
        };
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}
