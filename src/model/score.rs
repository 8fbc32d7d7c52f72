// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Score records and their file-name based persisted form.
//!
//! A [`Score`] holds absolute file locations and is what the rest of the
//! crate works with. A [`ScoreRecord`] keeps only file names, so that a
//! library or a bundle survives being moved to another storage root.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::part::{PartAudioTrack, PartId, PartScoreDocument};

/// Opaque identifier of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreId(Uuid);

impl ScoreId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the textual form printed by `Display`
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for ScoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One musical piece: its PDF parts, audio parts and full mix
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Score identifier
    pub id: ScoreId,
    /// Title
    pub name: String,
    /// PDF documents in display order
    pub pdf_parts: Vec<PartScoreDocument>,
    /// Audio stems in display order
    pub mp3_parts: Vec<PartAudioTrack>,
    /// Pre-mixed recording of all parts
    pub full_mix: Option<PathBuf>,
    /// When the score was last opened in the player
    pub last_opened: Option<DateTime<Utc>>,
}

impl Score {
    /// An empty, never-opened score with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ScoreId::new(),
            name: name.into(),
            pdf_parts: Vec::new(),
            mp3_parts: Vec::new(),
            full_mix: None,
            last_opened: None,
        }
    }

    /// Whether the score has everything the player needs
    pub fn is_playable(&self) -> bool {
        !self.pdf_parts.is_empty() && !self.mp3_parts.is_empty() && self.full_mix.is_some()
    }

    /// Record that the score was opened at `at`
    pub fn touch_opened(&mut self, at: DateTime<Utc>) {
        self.last_opened = Some(at);
    }

    /// Every file this score references, PDFs first, then stems, then the mix
    pub fn referenced_files(&self) -> Vec<&Path> {
        self.pdf_parts
            .iter()
            .map(|p| p.file.as_path())
            .chain(self.mp3_parts.iter().map(|p| p.file.as_path()))
            .chain(self.full_mix.as_deref())
            .collect()
    }

    /// Find an audio part by id
    pub fn mp3_part(&self, id: PartId) -> Option<&PartAudioTrack> {
        self.mp3_parts.iter().find(|p| p.id == id)
    }

    /// Convert to the file-name based form
    pub fn to_record(&self) -> ScoreRecord {
        ScoreRecord {
            id: self.id,
            name: self.name.clone(),
            pdf_parts: self
                .pdf_parts
                .iter()
                .map(|p| PartRecord::new(p.id, &p.part_name, &p.file))
                .collect(),
            mp3_parts: self
                .mp3_parts
                .iter()
                .map(|p| PartRecord::new(p.id, &p.part_name, &p.file))
                .collect(),
            full_mix_file_name: self.full_mix.as_deref().map(file_name_of),
            last_opened: self.last_opened,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A part reduced to its file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    /// Part identifier
    pub id: PartId,
    /// Display name
    pub part_name: String,
    /// File name relative to the storage root
    pub file_name: String,
}

impl PartRecord {
    fn new(id: PartId, part_name: &str, file: &Path) -> Self {
        Self {
            id,
            part_name: part_name.to_string(),
            file_name: file_name_of(file),
        }
    }
}

/// Persisted form of a [`Score`]: file names only, no absolute paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Score identifier
    pub id: ScoreId,
    /// Title
    pub name: String,
    /// PDF parts in display order
    #[serde(default)]
    pub pdf_parts: Vec<PartRecord>,
    /// Audio parts in display order
    #[serde(default)]
    pub mp3_parts: Vec<PartRecord>,
    /// File name of the full mix
    #[serde(default)]
    pub full_mix_file_name: Option<String>,
    /// Last time the score was opened
    #[serde(default)]
    pub last_opened: Option<DateTime<Utc>>,
}

impl ScoreRecord {
    /// Rebuild a [`Score`] with every file resolved against `root`
    pub fn to_score(&self, root: &Path) -> Score {
        Score {
            id: self.id,
            name: self.name.clone(),
            pdf_parts: self
                .pdf_parts
                .iter()
                .map(|p| PartScoreDocument {
                    id: p.id,
                    part_name: p.part_name.clone(),
                    file: root.join(&p.file_name),
                })
                .collect(),
            mp3_parts: self
                .mp3_parts
                .iter()
                .map(|p| PartAudioTrack {
                    id: p.id,
                    part_name: p.part_name.clone(),
                    file: root.join(&p.file_name),
                })
                .collect(),
            full_mix: self.full_mix_file_name.as_ref().map(|n| root.join(n)),
            last_opened: self.last_opened,
        }
    }

    /// Every file name the record references
    pub fn file_names(&self) -> Vec<&str> {
        self.pdf_parts
            .iter()
            .map(|p| p.file_name.as_str())
            .chain(self.mp3_parts.iter().map(|p| p.file_name.as_str()))
            .chain(self.full_mix_file_name.as_deref())
            .collect()
    }
}
