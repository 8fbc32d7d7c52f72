// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Manually clocked tracks.
//!
//! Time only moves when [`ManualClock::advance`] is called, and every
//! transport call is appended to a shared log, so controller behaviour can
//! be asserted exactly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::timed::{TimeSource, TimedTrack};
use super::AudioError;
use crate::playback::{Track, TrackLoader};

/// Shared clock advanced by hand; clones observe the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Clock at time 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `secs`
    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }

    /// Current time
    pub fn now(&self) -> f64 {
        self.now.get()
    }
}

impl TimeSource for ManualClock {
    fn now_secs(&self) -> f64 {
        self.now.get()
    }
}

/// A transport call made on a manual track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// `play` on the track for this file
    Play(PathBuf),
    /// `stop` on the track for this file
    Stop(PathBuf),
    /// `set_current_time` on the track for this file
    Seek(PathBuf, f64),
    /// `set_rate` on the track for this file
    Rate(PathBuf, f64),
}

type EventLog = Rc<RefCell<Vec<TrackEvent>>>;

struct ManualTrack {
    file: PathBuf,
    inner: TimedTrack<ManualClock>,
    log: EventLog,
}

impl Track for ManualTrack {
    fn play(&mut self) {
        self.log.borrow_mut().push(TrackEvent::Play(self.file.clone()));
        self.inner.play();
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(TrackEvent::Stop(self.file.clone()));
        self.inner.stop();
    }

    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    fn set_current_time(&mut self, secs: f64) {
        self.log
            .borrow_mut()
            .push(TrackEvent::Seek(self.file.clone(), secs));
        self.inner.set_current_time(secs);
    }

    fn set_rate(&mut self, rate: f64) {
        self.log
            .borrow_mut()
            .push(TrackEvent::Rate(self.file.clone(), rate));
        self.inner.set_rate(rate);
    }

    fn rate(&self) -> f64 {
        self.inner.rate()
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    fn duration(&self) -> f64 {
        self.inner.duration()
    }
}

/// Loader for files registered with a duration; anything else fails to load
#[derive(Debug, Clone, Default)]
pub struct ManualTrackLoader {
    clock: ManualClock,
    durations: HashMap<PathBuf, f64>,
    log: EventLog,
}

impl ManualTrackLoader {
    /// Loader whose tracks follow `clock`
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            ..Default::default()
        }
    }

    /// Register a loadable file
    pub fn with_track(mut self, file: impl Into<PathBuf>, duration: f64) -> Self {
        self.durations.insert(file.into(), duration);
        self
    }

    /// The clock driving every track
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Every transport call so far
    pub fn events(&self) -> Vec<TrackEvent> {
        self.log.borrow().clone()
    }

    /// Files that received `play`, in call order
    pub fn played(&self) -> Vec<PathBuf> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                TrackEvent::Play(file) => Some(file.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_events(&self) {
        self.log.borrow_mut().clear();
    }
}

impl TrackLoader for ManualTrackLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Track>, AudioError> {
        let duration = *self
            .durations
            .get(path)
            .ok_or_else(|| AudioError::Unavailable(path.to_path_buf()))?;
        Ok(Box::new(ManualTrack {
            file: path.to_path_buf(),
            inner: TimedTrack::new(self.clock.clone(), duration),
            log: Rc::clone(&self.log),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_file_fails() {
        let loader = ManualTrackLoader::new(ManualClock::new());
        assert!(matches!(
            loader.load(Path::new("missing.mp3")),
            Err(AudioError::Unavailable(_))
        ));
    }

    #[test]
    fn test_calls_are_logged() {
        let loader = ManualTrackLoader::new(ManualClock::new()).with_track("a.mp3", 4.0);
        let mut track = loader.load(Path::new("a.mp3")).unwrap();
        track.set_current_time(1.0);
        track.play();
        loader.clock().advance(0.5);
        track.stop();

        assert_eq!(
            loader.events(),
            vec![
                TrackEvent::Seek(PathBuf::from("a.mp3"), 1.0),
                TrackEvent::Play(PathBuf::from("a.mp3")),
                TrackEvent::Stop(PathBuf::from("a.mp3")),
            ]
        );
        assert!((track.current_time() - 1.5).abs() < 1e-9);
        assert_eq!(loader.played(), vec![PathBuf::from("a.mp3")]);
    }
}
