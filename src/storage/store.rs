// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The score library with a caller-controlled save policy.
//!
//! Mutations only mark the store dirty unless the policy is
//! [`SavePolicy::WriteThrough`]. With [`SavePolicy::Debounced`] the owner
//! calls [`ScoreStore::flush_due`] from its event loop; with
//! [`SavePolicy::Explicit`] nothing is written until [`ScoreStore::save`].

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::persistence::ScorePersistence;
use super::{FileStorage, StorageError};
use crate::model::{group_by_recency, RecencyGroup, Score, ScoreId};

/// Score library errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Library file could not be read or written
    #[error("library I/O failed for {0:?}: {1}")]
    Io(PathBuf, #[source] io::Error),
    /// Library file is not valid JSON for the expected shape
    #[error("library file is malformed: {0}")]
    Format(#[from] serde_json::Error),
    /// A referenced file could not be removed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// When mutations reach durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SavePolicy {
    /// Only on [`ScoreStore::save`]
    Explicit,
    /// After every mutation
    WriteThrough,
    /// Once no mutation has happened for `delay_ms`
    Debounced {
        /// Quiet period before saving
        delay_ms: u64,
    },
}

impl Default for SavePolicy {
    fn default() -> Self {
        SavePolicy::Debounced { delay_ms: 500 }
    }
}

/// Ordered list of scores, owned by the application
pub struct ScoreStore {
    scores: Vec<Score>,
    persistence: Box<dyn ScorePersistence>,
    policy: SavePolicy,
    last_change: Option<Instant>,
}

impl ScoreStore {
    /// Create a store and load its contents
    pub fn open(
        persistence: Box<dyn ScorePersistence>,
        policy: SavePolicy,
    ) -> Result<Self, StoreError> {
        let mut store = Self::empty(persistence, policy);
        store.load()?;
        Ok(store)
    }

    /// Create a store without loading anything
    pub fn empty(persistence: Box<dyn ScorePersistence>, policy: SavePolicy) -> Self {
        Self {
            scores: Vec::new(),
            persistence,
            policy,
            last_change: None,
        }
    }

    /// All scores in library order
    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    /// Number of scores
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Look up a score
    pub fn get(&self, id: ScoreId) -> Option<&Score> {
        self.scores.iter().find(|s| s.id == id)
    }

    /// Save policy in effect
    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    /// Whether there are unsaved mutations
    pub fn is_dirty(&self) -> bool {
        self.last_change.is_some()
    }

    /// Append a score at the end of the library
    pub fn append(&mut self, score: Score) -> Result<(), StoreError> {
        info!("Adding score '{}' ({})", score.name, score.id);
        self.scores.push(score);
        self.after_mutation()
    }

    /// Replace the score with the same id in place; false if absent
    pub fn update(&mut self, score: Score) -> Result<bool, StoreError> {
        match self.scores.iter_mut().find(|s| s.id == score.id) {
            Some(slot) => {
                debug!("Updating score '{}' ({})", score.name, score.id);
                *slot = score;
                self.after_mutation()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a score from the list without touching its files
    pub fn remove(&mut self, id: ScoreId) -> Result<Option<Score>, StoreError> {
        let Some(index) = self.scores.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let removed = self.scores.remove(index);
        self.after_mutation()?;
        Ok(Some(removed))
    }

    /// Remove a score and every file it references.
    ///
    /// Returns false when the score is not in the library. Every file is
    /// attempted; the first failure is reported after the rest were tried.
    pub fn delete_score(
        &mut self,
        id: ScoreId,
        storage: &dyn FileStorage,
    ) -> Result<bool, StoreError> {
        let Some(score) = self.remove(id)? else {
            debug!("Delete of unknown score {} ignored", id);
            return Ok(false);
        };

        let mut first_error = None;
        for file in score.referenced_files() {
            if let Err(e) = storage.delete(file) {
                warn!("Failed to delete {:?}: {}", file, e);
                first_error.get_or_insert(e);
            }
        }
        info!("Deleted score '{}' ({})", score.name, score.id);

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(true),
        }
    }

    /// Stamp a score as opened at `at`; false if absent
    pub fn mark_opened(&mut self, id: ScoreId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        match self.scores.iter_mut().find(|s| s.id == id) {
            Some(score) => {
                score.touch_opened(at);
                self.after_mutation()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the whole list now
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.persistence.save_all(&self.scores)?;
        self.last_change = None;
        Ok(())
    }

    /// Replace the in-memory list with what is stored, dropping unsaved changes
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.scores = self.persistence.load_all()?;
        self.last_change = None;
        Ok(())
    }

    /// When a debounced save becomes due, if one is pending
    pub fn save_deadline(&self) -> Option<Instant> {
        match (self.policy, self.last_change) {
            (SavePolicy::Debounced { delay_ms }, Some(changed)) => {
                Some(changed + Duration::from_millis(delay_ms))
            }
            _ => None,
        }
    }

    /// Save if a debounced save is due at `now`; true if it saved
    pub fn flush_due(&mut self, now: Instant) -> Result<bool, StoreError> {
        match self.save_deadline() {
            Some(deadline) if now >= deadline => {
                self.save()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Scores grouped by last-opened recency, newest first within a group
    pub fn grouped_by_recency(&self, now: DateTime<Utc>) -> Vec<(RecencyGroup, Vec<&Score>)> {
        group_by_recency(&self.scores, now)
    }

    fn after_mutation(&mut self) -> Result<(), StoreError> {
        match self.policy {
            SavePolicy::WriteThrough => self.save(),
            SavePolicy::Explicit | SavePolicy::Debounced { .. } => {
                self.last_change = Some(Instant::now());
                Ok(())
            }
        }
    }
}

impl Drop for ScoreStore {
    fn drop(&mut self) {
        if !self.is_dirty() {
            return;
        }
        match self.policy {
            SavePolicy::Debounced { .. } => {
                if let Err(e) = self.save() {
                    warn!("Pending library save failed on shutdown: {}", e);
                }
            }
            _ => warn!("Discarding unsaved library changes"),
        }
    }
}
