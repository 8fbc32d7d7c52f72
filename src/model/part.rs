// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Part records: one audio stem or one PDF page set per instrument/voice.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a part record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(Uuid);

impl PartId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One independently mutable audio stem of a score
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartAudioTrack {
    /// Part identifier
    pub id: PartId,
    /// Display name (e.g. "Soprano")
    pub part_name: String,
    /// Location of the audio file
    pub file: PathBuf,
}

impl PartAudioTrack {
    /// Create a part with a fresh id
    pub fn new(part_name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            id: PartId::new(),
            part_name: part_name.into(),
            file: file.into(),
        }
    }
}

/// One PDF document of a score (usually a single instrument's part)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartScoreDocument {
    /// Part identifier
    pub id: PartId,
    /// Display name (e.g. "Piano")
    pub part_name: String,
    /// Location of the PDF file
    pub file: PathBuf,
}

impl PartScoreDocument {
    /// Create a document with a fresh id
    pub fn new(part_name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            id: PartId::new(),
            part_name: part_name.into(),
            file: file.into(),
        }
    }
}

/// Separator between a stored file's base name and its uniqueness suffix
pub const UNIQUE_SUFFIX_SEPARATOR: char = '@';

/// Strip the `@<uuid>` suffix that storage appends to imported file names.
///
/// `"Song-Soprano@935E8295-0C1A-4E7B-9F3D-2B1C6A7D8E90"` becomes
/// `"Song-Soprano"`, and so does the `_1` form given on a name clash.
/// Names without a hex/dash suffix are returned unchanged.
pub fn display_name(stem: &str) -> &str {
    if let Some(at) = stem.rfind(UNIQUE_SUFFIX_SEPARATOR) {
        let suffix = &stem[at + 1..];
        let suffix = match suffix.rsplit_once('_') {
            Some((head, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => head,
            _ => suffix,
        };
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return &stem[..at];
        }
    }
    stem
}

/// Derive a part name from a file path: the display name of its stem
pub fn part_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    display_name(&stem).to_string()
}
