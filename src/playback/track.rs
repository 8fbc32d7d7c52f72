// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Single-file transport abstraction.

use std::path::Path;

use crate::audio::AudioError;

/// One loaded audio resource with its own transport.
///
/// `stop` pauses in place. A track that runs past its end stops by itself
/// and rewinds to 0.
pub trait Track {
    /// Start or resume from the current position
    fn play(&mut self);

    /// Pause at the current position
    fn stop(&mut self);

    /// Position in seconds
    fn current_time(&self) -> f64;

    /// Move the position, clamped to `[0, duration]`
    fn set_current_time(&mut self, secs: f64);

    /// Set the playback rate multiplier
    fn set_rate(&mut self, rate: f64);

    /// Current playback rate multiplier
    fn rate(&self) -> f64;

    /// Whether the track is sounding
    fn is_playing(&self) -> bool;

    /// Length in seconds
    fn duration(&self) -> f64;
}

/// Creates tracks from files
pub trait TrackLoader {
    /// Load the file at `path`
    fn load(&self, path: &Path) -> Result<Box<dyn Track>, AudioError>;
}
