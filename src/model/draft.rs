// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Import draft: the editable form a score is assembled in before saving.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::part::{part_name_from_path, PartAudioTrack, PartId, PartScoreDocument};
use super::score::{Score, ScoreId};
use crate::storage::{FileStorage, StorageError};

/// Name used when neither a title nor a PDF part name is available
pub const UNTITLED: &str = "Untitled";

/// Reasons a draft cannot become a score
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    /// No PDF part attached
    #[error("a score needs at least one PDF part")]
    NoPdfParts,
    /// No audio part attached
    #[error("a score needs at least one audio part")]
    NoAudioParts,
    /// No full mix attached
    #[error("a score needs a full-mix recording")]
    NoFullMix,
}

/// A score under construction or being edited
#[derive(Debug, Clone, Default)]
pub struct ScoreDraft {
    id: Option<ScoreId>,
    /// Title; blank means "name after the first PDF part"
    pub name: String,
    pdf_parts: Vec<PartScoreDocument>,
    mp3_parts: Vec<PartAudioTrack>,
    full_mix: Option<PathBuf>,
}

impl ScoreDraft {
    /// Start an empty draft for a new score
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Start a draft that edits `score`, keeping its id
    pub fn from_score(score: &Score) -> Self {
        Self {
            id: Some(score.id),
            name: score.name.clone(),
            pdf_parts: score.pdf_parts.clone(),
            mp3_parts: score.mp3_parts.clone(),
            full_mix: score.full_mix.clone(),
        }
    }

    /// Whether this draft edits an existing score
    pub fn is_editing(&self) -> bool {
        self.id.is_some()
    }

    /// PDF parts in order
    pub fn pdf_parts(&self) -> &[PartScoreDocument] {
        &self.pdf_parts
    }

    /// Audio parts in order
    pub fn mp3_parts(&self) -> &[PartAudioTrack] {
        &self.mp3_parts
    }

    /// Full mix, if attached
    pub fn full_mix(&self) -> Option<&Path> {
        self.full_mix.as_deref()
    }

    /// Whether `build` would succeed
    pub fn is_ready(&self) -> bool {
        self.validate().is_ok()
    }

    /// Copy a PDF into storage and append it as a part.
    ///
    /// A blank `part_name` is derived from the file name.
    pub fn attach_pdf(
        &mut self,
        storage: &dyn FileStorage,
        source: &Path,
        part_name: &str,
    ) -> Result<PartId, StorageError> {
        let stored = storage.copy_in(source)?;
        let part = PartScoreDocument::new(name_or_stem(part_name, source), stored);
        let id = part.id;
        self.pdf_parts.push(part);
        Ok(id)
    }

    /// Copy an audio file into storage and append it as a part
    pub fn attach_mp3(
        &mut self,
        storage: &dyn FileStorage,
        source: &Path,
        part_name: &str,
    ) -> Result<PartId, StorageError> {
        let stored = storage.copy_in(source)?;
        let part = PartAudioTrack::new(name_or_stem(part_name, source), stored);
        let id = part.id;
        self.mp3_parts.push(part);
        Ok(id)
    }

    /// Copy a full mix into storage, replacing any previous one.
    ///
    /// The replaced file is left in storage; it may still belong to the
    /// saved score this draft edits.
    pub fn attach_full_mix(
        &mut self,
        storage: &dyn FileStorage,
        source: &Path,
    ) -> Result<(), StorageError> {
        self.full_mix = Some(storage.copy_in(source)?);
        Ok(())
    }

    /// Remove a PDF part from the draft; false if absent
    pub fn remove_pdf(&mut self, id: PartId) -> bool {
        remove_by_id(&mut self.pdf_parts, id, |p| p.id)
    }

    /// Remove an audio part from the draft; false if absent
    pub fn remove_mp3(&mut self, id: PartId) -> bool {
        remove_by_id(&mut self.mp3_parts, id, |p| p.id)
    }

    /// Swap a PDF part with its predecessor
    pub fn move_pdf_up(&mut self, index: usize) -> bool {
        move_up(&mut self.pdf_parts, index)
    }

    /// Swap a PDF part with its successor
    pub fn move_pdf_down(&mut self, index: usize) -> bool {
        move_down(&mut self.pdf_parts, index)
    }

    /// Swap an audio part with its predecessor
    pub fn move_mp3_up(&mut self, index: usize) -> bool {
        move_up(&mut self.mp3_parts, index)
    }

    /// Swap an audio part with its successor
    pub fn move_mp3_down(&mut self, index: usize) -> bool {
        move_down(&mut self.mp3_parts, index)
    }

    /// Drop every attachment, keeping the name and id
    pub fn clear_files(&mut self) {
        self.pdf_parts.clear();
        self.mp3_parts.clear();
        self.full_mix = None;
    }

    /// Delete every attached file from storage and drop the attachments.
    ///
    /// For abandoned drafts of new scores only; an editing draft shares its
    /// files with the saved score.
    pub fn discard_files(&mut self, storage: &dyn FileStorage) {
        let files = self
            .pdf_parts
            .iter()
            .map(|p| p.file.as_path())
            .chain(self.mp3_parts.iter().map(|p| p.file.as_path()))
            .chain(self.full_mix.as_deref());
        for file in files {
            if let Err(e) = storage.delete(file) {
                warn!("Failed to delete abandoned {:?}: {}", file, e);
            }
        }
        self.clear_files();
    }

    /// Check the draft is playable without consuming it
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.pdf_parts.is_empty() {
            return Err(DraftError::NoPdfParts);
        }
        if self.mp3_parts.is_empty() {
            return Err(DraftError::NoAudioParts);
        }
        if self.full_mix.is_none() {
            return Err(DraftError::NoFullMix);
        }
        Ok(())
    }

    /// Turn the draft into a playable score
    pub fn build(self) -> Result<Score, DraftError> {
        self.validate()?;

        let name = if self.name.trim().is_empty() {
            self.pdf_parts
                .first()
                .map(|p| p.part_name.clone())
                .unwrap_or_else(|| UNTITLED.to_string())
        } else {
            self.name.trim().to_string()
        };
        debug!("Built score '{}' from draft", name);

        Ok(Score {
            id: self.id.unwrap_or_default(),
            name,
            pdf_parts: self.pdf_parts,
            mp3_parts: self.mp3_parts,
            full_mix: self.full_mix,
            last_opened: None,
        })
    }
}

fn name_or_stem(part_name: &str, source: &Path) -> String {
    let trimmed = part_name.trim();
    if trimmed.is_empty() {
        part_name_from_path(source)
    } else {
        trimmed.to_string()
    }
}

fn remove_by_id<T>(items: &mut Vec<T>, id: PartId, key: impl Fn(&T) -> PartId) -> bool {
    let before = items.len();
    items.retain(|item| key(item) != id);
    items.len() != before
}

fn move_up<T>(items: &mut [T], index: usize) -> bool {
    if index == 0 || index >= items.len() {
        return false;
    }
    items.swap(index, index - 1);
    true
}

fn move_down<T>(items: &mut [T], index: usize) -> bool {
    if index + 1 >= items.len() {
        return false;
    }
    items.swap(index, index + 1);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStorage;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _src: TempDir,
        _dst: TempDir,
        storage: LocalFileStorage,
        files: Vec<PathBuf>,
    }

    fn fixture(names: &[&str]) -> Fixture {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let files = names
            .iter()
            .map(|n| {
                let p = src.path().join(n);
                fs::write(&p, n.as_bytes()).unwrap();
                p
            })
            .collect();
        let storage = LocalFileStorage::open(dst.path()).unwrap();
        Fixture {
            _src: src,
            _dst: dst,
            storage,
            files,
        }
    }

    #[test]
    fn test_build_requires_all_attachments() {
        let fx = fixture(&["Score.pdf", "Alto.mp3", "Full.mp3"]);
        let mut draft = ScoreDraft::new("Song");
        assert_eq!(draft.clone().build().unwrap_err(), DraftError::NoPdfParts);

        draft.attach_pdf(&fx.storage, &fx.files[0], "").unwrap();
        assert_eq!(draft.clone().build().unwrap_err(), DraftError::NoAudioParts);

        draft.attach_mp3(&fx.storage, &fx.files[1], "Alto").unwrap();
        assert_eq!(draft.clone().build().unwrap_err(), DraftError::NoFullMix);

        draft.attach_full_mix(&fx.storage, &fx.files[2]).unwrap();
        assert!(draft.is_ready());
        let score = draft.build().unwrap();
        assert!(score.is_playable());
        assert_eq!(score.name, "Song");
        assert_eq!(score.pdf_parts[0].part_name, "Score");
    }

    #[test]
    fn test_blank_name_uses_first_pdf_part() {
        let fx = fixture(&["Trumpet.pdf", "Trumpet.mp3", "Full.mp3"]);
        let mut draft = ScoreDraft::new("   ");
        draft.attach_pdf(&fx.storage, &fx.files[0], "").unwrap();
        draft.attach_mp3(&fx.storage, &fx.files[1], "").unwrap();
        draft.attach_full_mix(&fx.storage, &fx.files[2]).unwrap();
        assert_eq!(draft.build().unwrap().name, "Trumpet");
    }

    #[test]
    fn test_reorder_and_remove() {
        let fx = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut draft = ScoreDraft::new("x");
        let a = draft.attach_mp3(&fx.storage, &fx.files[0], "A").unwrap();
        draft.attach_mp3(&fx.storage, &fx.files[1], "B").unwrap();
        draft.attach_mp3(&fx.storage, &fx.files[2], "C").unwrap();

        assert!(!draft.move_mp3_up(0));
        assert!(draft.move_mp3_down(0));
        assert!(!draft.move_mp3_down(2));
        let names: Vec<&str> = draft.mp3_parts().iter().map(|p| p.part_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);

        assert!(draft.remove_mp3(a));
        assert!(!draft.remove_mp3(a));
        assert_eq!(draft.mp3_parts().len(), 2);
    }

    #[test]
    fn test_edit_keeps_id() {
        let fx = fixture(&["p.pdf", "m.mp3", "f.mp3"]);
        let mut draft = ScoreDraft::new("Original");
        draft.attach_pdf(&fx.storage, &fx.files[0], "P").unwrap();
        draft.attach_mp3(&fx.storage, &fx.files[1], "M").unwrap();
        draft.attach_full_mix(&fx.storage, &fx.files[2]).unwrap();
        let score = draft.build().unwrap();

        let mut edit = ScoreDraft::from_score(&score);
        assert!(edit.is_editing());
        edit.name = "Renamed".to_string();
        let edited = edit.build().unwrap();
        assert_eq!(edited.id, score.id);
        assert_eq!(edited.name, "Renamed");
    }
}
