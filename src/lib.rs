// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sheet-music library with a synchronized multi-part audio player.
//!
//! Scores pair PDF parts with per-part audio stems and a full mix. The
//! playback controller keeps every stem on one transport, switches parts
//! in and out between starts, scales the rate and repeats a loop region.

pub mod archive;
pub mod audio;
pub mod config;
pub mod model;
pub mod notice;
pub mod playback;
pub mod storage;
