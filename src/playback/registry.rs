// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Track set registry.
//!
//! Holds the full-mix track and one slot per part track of a score, in the
//! score's part order. Part switches live in the slots themselves, so every
//! part has an explicit enabled flag from the start (default on).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::track::{Track, TrackLoader};
use crate::model::{PartId, Score};

/// One part track and its switch
pub struct PartSlot {
    id: PartId,
    name: String,
    file: PathBuf,
    track: Option<Box<dyn Track>>,
    enabled: bool,
}

impl PartSlot {
    /// Part id
    pub fn id(&self) -> PartId {
        self.id
    }

    /// Part name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Audio file of the part
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Whether the part will sound on the next start
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the file decoded
    pub fn is_loaded(&self) -> bool {
        self.track.is_some()
    }
}

/// Which tracks a playback start drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The full-mix track alone
    FullMix,
    /// These part slots, by index
    Parts(Vec<usize>),
}

/// The tracks of one score
pub struct TrackSet {
    full_mix_file: Option<PathBuf>,
    full_mix: Option<Box<dyn Track>>,
    parts: Vec<PartSlot>,
    duration: f64,
}

impl TrackSet {
    /// Empty slots for every track of `score`, all parts enabled
    pub fn for_score(score: &Score) -> Self {
        let parts = score
            .mp3_parts
            .iter()
            .map(|part| PartSlot {
                id: part.id,
                name: part.part_name.clone(),
                file: part.file.clone(),
                track: None,
                enabled: true,
            })
            .collect();

        Self {
            full_mix_file: score.full_mix.clone(),
            full_mix: None,
            parts,
            duration: 0.0,
        }
    }

    /// Load every track not yet loaded.
    ///
    /// A file that fails to load is left out of playback. Duration becomes
    /// the longest loaded track.
    pub fn prepare(&mut self, loader: &dyn TrackLoader) {
        if self.full_mix.is_none() {
            if let Some(file) = &self.full_mix_file {
                self.full_mix = load_track(loader, file);
            }
        }
        for slot in &mut self.parts {
            if slot.track.is_none() {
                slot.track = load_track(loader, &slot.file);
            }
        }

        self.duration = self
            .tracks()
            .map(|t| t.duration())
            .fold(0.0, f64::max);
        debug!(
            "Prepared {} of {} part tracks, full mix {}, duration {:.2}s",
            self.parts.iter().filter(|s| s.is_loaded()).count(),
            self.parts.len(),
            if self.full_mix.is_some() { "loaded" } else { "absent" },
            self.duration
        );
    }

    /// Transport length: the longest loaded track
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Part slots in score order
    pub fn parts(&self) -> &[PartSlot] {
        &self.parts
    }

    /// Whether the full mix decoded
    pub fn has_full_mix(&self) -> bool {
        self.full_mix.is_some()
    }

    /// Set a part's switch. Returns false for an unknown part.
    pub fn set_enabled(&mut self, id: PartId, enabled: bool) -> bool {
        match self.parts.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Set every part's switch
    pub fn set_all_enabled(&mut self, enabled: bool) {
        for slot in &mut self.parts {
            slot.enabled = enabled;
        }
    }

    /// A part's switch; None for an unknown part
    pub fn is_enabled(&self, id: PartId) -> Option<bool> {
        self.parts.iter().find(|s| s.id == id).map(|s| s.enabled)
    }

    /// Parts whose switch is on
    pub fn enabled_parts(&self) -> impl Iterator<Item = &PartSlot> {
        self.parts.iter().filter(|s| s.enabled)
    }

    /// Number of parts whose switch is on
    pub fn enabled_count(&self) -> usize {
        self.enabled_parts().count()
    }

    /// Tracks a start would drive right now.
    ///
    /// All parts on routes through the full mix when it loaded; a proper
    /// subset routes through the individual part tracks. None when nothing
    /// would sound.
    pub fn route(&self) -> Option<Route> {
        let enabled = self.enabled_count();
        if enabled == 0 {
            return None;
        }
        if enabled == self.parts.len() && self.full_mix.is_some() {
            return Some(Route::FullMix);
        }

        let indices: Vec<usize> = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.enabled && s.track.is_some())
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            None
        } else {
            Some(Route::Parts(indices))
        }
    }

    /// Seek the routed tracks to `at`, then start them
    pub fn play_route(&mut self, route: &Route, at: f64) {
        match route {
            Route::FullMix => {
                if let Some(track) = self.full_mix.as_mut() {
                    track.set_current_time(at);
                    track.play();
                }
            }
            Route::Parts(indices) => {
                for &i in indices {
                    if let Some(track) = self.parts.get_mut(i).and_then(|s| s.track.as_mut()) {
                        track.set_current_time(at);
                    }
                }
                for &i in indices {
                    if let Some(track) = self.parts.get_mut(i).and_then(|s| s.track.as_mut()) {
                        track.play();
                    }
                }
            }
        }
    }

    /// Stop every track, sounding or not
    pub fn stop_all(&mut self) {
        for track in self.tracks_mut() {
            track.stop();
        }
    }

    /// Move every track to `secs`
    pub fn seek_all(&mut self, secs: f64) {
        for track in self.tracks_mut() {
            track.set_current_time(secs);
        }
    }

    /// Apply a rate to every track
    pub fn set_rate_all(&mut self, rate: f64) {
        for track in self.tracks_mut() {
            track.set_rate(rate);
        }
    }

    /// Position of the sounding audio: the full mix if it is playing,
    /// otherwise the first playing part
    pub fn sounding_position(&self) -> Option<f64> {
        if let Some(track) = self.full_mix.as_ref().filter(|t| t.is_playing()) {
            return Some(track.current_time());
        }
        self.parts
            .iter()
            .filter_map(|s| s.track.as_ref())
            .find(|t| t.is_playing())
            .map(|t| t.current_time())
    }

    /// Whether any track is sounding
    pub fn any_playing(&self) -> bool {
        self.tracks().any(|t| t.is_playing())
    }

    fn tracks(&self) -> impl Iterator<Item = &Box<dyn Track>> {
        self.full_mix
            .iter()
            .chain(self.parts.iter().filter_map(|s| s.track.as_ref()))
    }

    fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Track>> {
        self.full_mix
            .iter_mut()
            .chain(self.parts.iter_mut().filter_map(|s| s.track.as_mut()))
    }
}

fn load_track(loader: &dyn TrackLoader, file: &Path) -> Option<Box<dyn Track>> {
    match loader.load(file) {
        Ok(track) => Some(track),
        Err(e) => {
            warn!("Leaving {:?} out of playback: {}", file, e);
            None
        }
    }
}
