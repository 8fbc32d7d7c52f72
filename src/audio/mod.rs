// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio backends for playback tracks.
//!
//! This module provides:
//! - Decoding and duration probing via symphonia
//! - A clock-driven transport (`TimedTrack`) used for headless playback
//! - A manually clocked backend for deterministic runs and tests
//! - Device output via cpal (feature `device-output`)

pub mod decode;
pub mod manual;
#[cfg(feature = "device-output")]
pub mod output;
pub mod timed;

pub use decode::{decode_file, probe_duration, DecodedAudio};
pub use manual::{ManualClock, ManualTrackLoader, TrackEvent};
#[cfg(feature = "device-output")]
pub use output::{DeviceTrack, DeviceTrackLoader};
pub use timed::{SilentTrackLoader, SystemClock, TimeSource, TimedTrack};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Audio errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// File could not be opened
    #[error("cannot open audio file {path:?}: {source}")]
    Open {
        /// File being opened
        path: PathBuf,
        /// I/O error
        #[source]
        source: io::Error,
    },
    /// Container or codec failure
    #[error("decode failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    /// File holds no decodable audio track
    #[error("no playable audio track in {0:?}")]
    NoTrack(PathBuf),
    /// No output device available
    #[error("no audio output device available")]
    NoDevice,
    /// Output stream could not be built or started
    #[error("audio output failed: {0}")]
    Output(String),
    /// Backend has nothing registered for this file
    #[error("no audio available for {0:?}")]
    Unavailable(PathBuf),
}
