// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clock-driven transport.
//!
//! A [`TimedTrack`] produces no sound; its position advances with a
//! [`TimeSource`] at the playback rate. With [`SystemClock`] it is the
//! headless backend of the player, with a manual clock it drives tests.

use std::path::Path;
use std::time::Instant;

use super::decode::probe_duration;
use super::AudioError;
use crate::playback::{Track, TrackLoader};

/// Monotonic seconds since an arbitrary origin
pub trait TimeSource {
    /// Current time in seconds
    fn now_secs(&self) -> f64;
}

/// Wall clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock starting now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Transport position of a track of known length, advanced by a clock
#[derive(Debug, Clone)]
pub struct TimedTrack<C: TimeSource> {
    clock: C,
    duration: f64,
    rate: f64,
    /// Position at the last anchor
    anchor_pos: f64,
    /// Clock time of the last anchor while playing
    anchor_time: Option<f64>,
}

impl<C: TimeSource> TimedTrack<C> {
    /// Create a stopped track at position 0
    pub fn new(clock: C, duration: f64) -> Self {
        Self {
            clock,
            duration: duration.max(0.0),
            rate: 1.0,
            anchor_pos: 0.0,
            anchor_time: None,
        }
    }

    /// Unclamped position while playing
    fn running_position(&self, since: f64) -> f64 {
        self.anchor_pos + (self.clock.now_secs() - since).max(0.0) * self.rate
    }

    /// Fold a run past the end into the stopped, rewound state
    fn settle(&mut self) {
        if let Some(since) = self.anchor_time {
            if self.running_position(since) >= self.duration {
                self.anchor_time = None;
                self.anchor_pos = 0.0;
            }
        }
    }

    /// Re-anchor at the current position and clock time
    fn reanchor(&mut self) {
        if let Some(since) = self.anchor_time {
            self.anchor_pos = self.running_position(since);
            self.anchor_time = Some(self.clock.now_secs());
        }
    }
}

impl<C: TimeSource> Track for TimedTrack<C> {
    fn play(&mut self) {
        self.settle();
        if self.anchor_time.is_none() {
            self.anchor_time = Some(self.clock.now_secs());
        }
    }

    fn stop(&mut self) {
        self.settle();
        if let Some(since) = self.anchor_time.take() {
            self.anchor_pos = self.running_position(since);
        }
    }

    fn current_time(&self) -> f64 {
        match self.anchor_time {
            Some(since) => {
                let pos = self.running_position(since);
                if pos >= self.duration {
                    0.0
                } else {
                    pos
                }
            }
            None => self.anchor_pos,
        }
    }

    fn set_current_time(&mut self, secs: f64) {
        self.settle();
        self.anchor_pos = secs.clamp(0.0, self.duration);
        if self.anchor_time.is_some() {
            self.anchor_time = Some(self.clock.now_secs());
        }
    }

    fn set_rate(&mut self, rate: f64) {
        self.settle();
        self.reanchor();
        self.rate = rate;
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn is_playing(&self) -> bool {
        match self.anchor_time {
            Some(since) => self.running_position(since) < self.duration,
            None => false,
        }
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

/// Loader producing silent wall-clock tracks with probed durations
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentTrackLoader {
    clock: SystemClock,
}

impl SilentTrackLoader {
    /// Loader sharing one clock across all its tracks
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackLoader for SilentTrackLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Track>, AudioError> {
        let duration = probe_duration(path)?;
        Ok(Box::new(TimedTrack::new(self.clock, duration)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ManualClock;

    fn track(duration: f64) -> (ManualClock, TimedTrack<ManualClock>) {
        let clock = ManualClock::new();
        (clock.clone(), TimedTrack::new(clock, duration))
    }

    #[test]
    fn test_advances_while_playing_only() {
        let (clock, mut t) = track(10.0);
        clock.advance(1.0);
        assert_eq!(t.current_time(), 0.0);

        t.play();
        clock.advance(2.5);
        assert!((t.current_time() - 2.5).abs() < 1e-9);
        assert!(t.is_playing());

        t.stop();
        clock.advance(5.0);
        assert!((t.current_time() - 2.5).abs() < 1e-9);
        assert!(!t.is_playing());
    }

    #[test]
    fn test_rate_scales_progress() {
        let (clock, mut t) = track(10.0);
        t.play();
        clock.advance(1.0);
        t.set_rate(1.5);
        clock.advance(2.0);
        assert!((t.current_time() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_running_off_the_end_stops_and_rewinds() {
        let (clock, mut t) = track(3.0);
        t.set_current_time(2.0);
        t.play();
        clock.advance(1.5);
        assert!(!t.is_playing());
        assert_eq!(t.current_time(), 0.0);

        t.play();
        clock.advance(1.0);
        assert!((t.current_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_while_playing_keeps_playing() {
        let (clock, mut t) = track(20.0);
        t.play();
        clock.advance(3.0);
        t.set_current_time(10.0);
        clock.advance(1.0);
        assert!(t.is_playing());
        assert!((t.current_time() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_is_clamped() {
        let (_clock, mut t) = track(5.0);
        t.set_current_time(-2.0);
        assert_eq!(t.current_time(), 0.0);
        t.set_current_time(99.0);
        assert_eq!(t.current_time(), 5.0);
    }
}
