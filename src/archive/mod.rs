// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Score bundles.
//!
//! A bundle is a zip holding a `score.json` descriptor plus a copy of every
//! file the score references. Export and import stage their work in a
//! scoped directory that is wiped at the start of every attempt and removed
//! afterwards.

pub mod export;
pub mod import;

pub use export::bundle_file_name;
pub use import::ImportOptions;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::storage::StorageError;

/// Name of the descriptor inside a bundle
pub const DESCRIPTOR_NAME: &str = "score.json";

/// Bundle errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// File or directory operation failed
    #[error("bundle I/O failed for {path:?}: {source}")]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// I/O error
        #[source]
        source: io::Error,
    },
    /// Zip container could not be read or written
    #[error("zip failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Descriptor could not be encoded or decoded
    #[error("bad score descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
    /// Bundle holds no descriptor
    #[error("score.json not found in {0:?}")]
    MissingDescriptor(PathBuf),
    /// Copy into storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Exports and imports bundles through a private work area
#[derive(Debug, Clone)]
pub struct Archive {
    work_root: PathBuf,
}

impl Archive {
    /// Archive staging its work under `work_root`
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
        }
    }

    /// Directory holding the staging areas
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Empty staging directory `name`, wiping leftovers of an earlier attempt
    fn fresh_dir(&self, name: &str) -> Result<PathBuf, ArchiveError> {
        let dir = self.work_root.join(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!("Wiped stale staging area {:?}", dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ArchiveError::io(&dir, e)),
        }
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
        Ok(dir)
    }

    fn discard(dir: &Path) {
        if let Err(e) = fs::remove_dir_all(dir) {
            debug!("Staging area {:?} left behind: {}", dir, e);
        }
    }
}
