// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Score data model.
//!
//! This module provides:
//! - Part and score records
//! - The file-name based persisted form of a score
//! - The import draft used to assemble a new or edited score
//! - Recency grouping for the library

pub mod draft;
pub mod part;
pub mod recency;
pub mod score;

pub use draft::{DraftError, ScoreDraft};
pub use part::{display_name, part_name_from_path, PartAudioTrack, PartId, PartScoreDocument};
pub use recency::{group_by_recency, RecencyGroup};
pub use score::{PartRecord, Score, ScoreId, ScoreRecord};
