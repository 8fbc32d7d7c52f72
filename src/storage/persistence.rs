// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Durable storage of the score list.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use super::store::StoreError;
use crate::model::{Score, ScoreRecord};

/// Load/save contract for the whole score list
pub trait ScorePersistence {
    /// Load every score, in stored order
    fn load_all(&self) -> Result<Vec<Score>, StoreError>;

    /// Replace the stored list with `scores`
    fn save_all(&self, scores: &[Score]) -> Result<(), StoreError>;
}

/// JSON file of [`ScoreRecord`]s; file names resolve against the storage root
#[derive(Debug, Clone)]
pub struct JsonPersistence {
    path: PathBuf,
    root: PathBuf,
}

impl JsonPersistence {
    /// Persist to `path`, resolving file names against `root` on load
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Location of the library file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScorePersistence for JsonPersistence {
    fn load_all(&self) -> Result<Vec<Score>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No library at {:?}, starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::Io(self.path.clone(), e)),
        };
        let records: Vec<ScoreRecord> = serde_json::from_str(&contents)?;
        info!("Loaded {} scores from {:?}", records.len(), self.path);
        Ok(records.iter().map(|r| r.to_score(&self.root)).collect())
    }

    fn save_all(&self, scores: &[Score]) -> Result<(), StoreError> {
        let records: Vec<ScoreRecord> = scores.iter().map(Score::to_record).collect();
        let json = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
        }
        // Write to a temp file, then rename over the library
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(self.path.clone(), e))?;
        debug!("Saved {} scores to {:?}", records.len(), self.path);
        Ok(())
    }
}

/// In-memory persistence that counts saves; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    records: Rc<RefCell<Vec<ScoreRecord>>>,
    saves: Rc<Cell<usize>>,
    root: PathBuf,
}

impl MemoryPersistence {
    /// Empty persistence resolving against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Number of `save_all` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    /// Snapshot of what was last saved
    pub fn records(&self) -> Vec<ScoreRecord> {
        self.records.borrow().clone()
    }
}

impl ScorePersistence for MemoryPersistence {
    fn load_all(&self) -> Result<Vec<Score>, StoreError> {
        Ok(self
            .records
            .borrow()
            .iter()
            .map(|r| r.to_score(&self.root))
            .collect())
    }

    fn save_all(&self, scores: &[Score]) -> Result<(), StoreError> {
        *self.records.borrow_mut() = scores.iter().map(Score::to_record).collect();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
