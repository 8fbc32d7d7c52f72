// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Synchronized multi-track playback.
//!
//! This module provides:
//! - The `Track` and `TrackLoader` seams the audio backends implement
//! - The track set registry (full mix, part tracks, part switches)
//! - The playback controller state machine and its polling tick

pub mod controller;
pub mod registry;
pub mod track;

pub use controller::{
    format_time, IdleInhibitor, LogInhibitor, PlaybackController, PlaybackMode, TransportSnapshot,
};
pub use registry::{PartSlot, Route, TrackSet};
pub use track::{Track, TrackLoader};
