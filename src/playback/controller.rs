// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback controller.
//!
//! Drives the track set of one open score: play, stop, loop, seek and rate
//! changes, plus the polling tick that samples the position, wraps the loop
//! region and detects the natural end of playback. All calls are expected
//! from one serialized context; `tick` is the only writer of the position
//! while playing.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::registry::{Route, TrackSet};
use super::track::TrackLoader;
use crate::config::PlaybackSettings;
use crate::model::{PartId, Score};

/// Transport mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Stopped,
    Playing,
    /// Playing with the loop region enforced
    Looping,
}

/// Observable session state, published after every change
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportSnapshot {
    pub mode: PlaybackMode,
    pub position: f64,
    pub duration: f64,
    pub rate: f64,
    pub loop_start: f64,
    pub loop_end: f64,
}

impl TransportSnapshot {
    /// Playing or looping
    pub fn is_playing(&self) -> bool {
        self.mode != PlaybackMode::Stopped
    }

    /// Looping
    pub fn is_looping(&self) -> bool {
        self.mode == PlaybackMode::Looping
    }
}

/// Device-wide "do not idle-sleep" switch
pub trait IdleInhibitor {
    /// `true` keeps the device awake, `false` lets it sleep again
    fn set_idle_disabled(&mut self, disabled: bool);
}

/// Inhibitor for hosts without an idle timer; only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInhibitor;

impl IdleInhibitor for LogInhibitor {
    fn set_idle_disabled(&mut self, disabled: bool) {
        debug!("Idle sleep {}", if disabled { "inhibited" } else { "allowed" });
    }
}

/// Transport for one playback session
pub struct PlaybackController {
    tracks: TrackSet,
    settings: PlaybackSettings,
    mode: PlaybackMode,
    position: f64,
    rate: f64,
    loop_start: f64,
    loop_end: f64,
    /// Tracks driven since the last start; re-triggered on loop wrap
    route: Option<Route>,
    inhibitor: Box<dyn IdleInhibitor>,
    idle_disabled: bool,
    signal: watch::Sender<TransportSnapshot>,
    closed: bool,
}

impl PlaybackController {
    /// Load the tracks of `score` and open a stopped session at 0.
    ///
    /// Tracks that fail to load are left out; the loop region starts as
    /// the whole transport.
    pub fn open(score: &Score, loader: &dyn TrackLoader, settings: PlaybackSettings) -> Self {
        let mut tracks = TrackSet::for_score(score);
        tracks.prepare(loader);
        let duration = tracks.duration();
        let (signal, _) = watch::channel(TransportSnapshot {
            rate: 1.0,
            duration,
            loop_end: duration,
            ..Default::default()
        });

        info!("Opened session for '{}' ({:.1}s)", score.name, duration);

        Self {
            tracks,
            settings,
            mode: PlaybackMode::Stopped,
            position: 0.0,
            rate: 1.0,
            loop_start: 0.0,
            loop_end: duration,
            route: None,
            inhibitor: Box::new(LogInhibitor),
            idle_disabled: false,
            signal,
            closed: false,
        }
    }

    /// Use `inhibitor` for the idle-sleep switch
    pub fn with_inhibitor(mut self, inhibitor: Box<dyn IdleInhibitor>) -> Self {
        self.inhibitor = inhibitor;
        self
    }

    // ========== State ==========

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.tracks.duration()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn loop_start(&self) -> f64 {
        self.loop_start
    }

    pub fn loop_end(&self) -> f64 {
        self.loop_end
    }

    /// The loaded tracks and part switches
    pub fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    /// Current session state
    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            mode: self.mode,
            position: self.position,
            duration: self.tracks.duration(),
            rate: self.rate,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
        }
    }

    /// Receiver of every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<TransportSnapshot> {
        self.signal.subscribe()
    }

    /// Whether `tick` should be driven
    pub fn is_polling(&self) -> bool {
        self.mode != PlaybackMode::Stopped
    }

    /// How often `tick` should be driven
    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval()
    }

    // ========== Transport ==========

    /// Start normal playback from the current position.
    ///
    /// No-op while already playing or when no part is enabled. While
    /// looping, drops the loop and continues as normal playback.
    pub fn play(&mut self) -> bool {
        match self.mode {
            PlaybackMode::Playing => false,
            PlaybackMode::Looping => {
                self.halt();
                let at = self.position;
                self.start(PlaybackMode::Playing, at)
            }
            PlaybackMode::Stopped => {
                let at = self.position;
                self.start(PlaybackMode::Playing, at)
            }
        }
    }

    /// Stop if playing or looping, otherwise play
    pub fn toggle_play(&mut self) -> bool {
        if self.is_polling() {
            self.stop()
        } else {
            self.play()
        }
    }

    /// Stop every track and leave looping. The position stays where it was.
    pub fn stop(&mut self) -> bool {
        if self.mode == PlaybackMode::Stopped {
            return false;
        }
        self.halt();
        self.mode = PlaybackMode::Stopped;
        self.route = None;
        self.set_idle_disabled(false);
        info!("Stopped at {}", format_time(self.position));
        self.publish();
        true
    }

    /// Start looping from the loop start, or stop if already looping
    pub fn toggle_loop(&mut self) -> bool {
        if self.mode == PlaybackMode::Looping {
            return self.stop();
        }
        if self.tracks.route().is_none() {
            debug!("Loop ignored: nothing enabled");
            return false;
        }
        self.halt();
        self.tracks.seek_all(self.loop_start);
        self.position = self.loop_start;
        let at = self.loop_start;
        self.start(PlaybackMode::Looping, at)
    }

    /// Move every track to `t`.
    ///
    /// A playing session restarts at `t` in the mode it was in. Out of
    /// range times are ignored.
    pub fn seek(&mut self, t: f64) -> bool {
        if !t.is_finite() || t < 0.0 || t > self.tracks.duration() {
            debug!("Seek to {} ignored", t);
            return false;
        }
        let resume = self.mode;
        if resume != PlaybackMode::Stopped {
            self.suspend();
        }
        self.tracks.seek_all(t);
        self.position = t;
        if resume != PlaybackMode::Stopped {
            self.start(resume, t);
        } else {
            self.publish();
        }
        true
    }

    /// Set the rate on every track, clamped and snapped to the rate step.
    ///
    /// Returns the rate applied. A playing session restarts at its current
    /// position in the mode it was in.
    pub fn set_rate(&mut self, rate: f64) -> f64 {
        if !rate.is_finite() {
            return self.rate;
        }
        let rate = self.settings.snap_rate(rate);
        let resume = self.mode;
        if resume != PlaybackMode::Stopped {
            if let Some(pos) = self.tracks.sounding_position() {
                self.position = pos;
            }
            self.suspend();
        }
        self.tracks.set_rate_all(rate);
        self.rate = rate;
        debug!("Rate {:.1}x", rate);
        if resume != PlaybackMode::Stopped {
            let at = self.position;
            self.start(resume, at);
        } else {
            self.publish();
        }
        rate
    }

    // ========== Loop region ==========

    /// Set the loop start; pushes the end up if needed.
    ///
    /// The start stays at least `min_loop_secs` before the end of the
    /// transport, so a loop always has room to play before it wraps.
    pub fn set_loop_start(&mut self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        let latest = (self.tracks.duration() - self.settings.min_loop_secs).max(0.0);
        self.loop_start = secs.clamp(0.0, latest);
        self.loop_end = self.loop_end.max(self.loop_start);
        self.publish();
    }

    /// Set the loop end within `[loop_start, duration]`
    pub fn set_loop_end(&mut self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        self.loop_end = secs.clamp(self.loop_start, self.tracks.duration());
        self.publish();
    }

    /// Set both ends of the loop region
    pub fn set_loop_region(&mut self, start: f64, end: f64) {
        self.set_loop_start(start);
        self.set_loop_end(end);
    }

    /// Loop end used for wrapping: at least `min_loop_secs` after the
    /// start, never past the end of the transport
    pub fn effective_loop_end(&self) -> f64 {
        self.loop_end
            .max(self.loop_start + self.settings.min_loop_secs)
            .min(self.tracks.duration())
    }

    // ========== Part switches ==========

    /// Switch a part for the next start. Returns false for an unknown part.
    pub fn set_part_enabled(&mut self, id: PartId, enabled: bool) -> bool {
        self.tracks.set_enabled(id, enabled)
    }

    /// Switch every part for the next start
    pub fn set_all_parts_enabled(&mut self, enabled: bool) {
        self.tracks.set_all_enabled(enabled);
    }

    /// A part's switch; None for an unknown part
    pub fn is_part_enabled(&self, id: PartId) -> Option<bool> {
        self.tracks.is_enabled(id)
    }

    // ========== Polling ==========

    /// Sample the position and enforce the loop region and natural end
    pub fn tick(&mut self) {
        if self.mode == PlaybackMode::Stopped {
            return;
        }
        let sounding = self.tracks.sounding_position();
        self.position = sounding.unwrap_or(0.0);

        match self.mode {
            PlaybackMode::Looping => {
                let wrap_at = self.effective_loop_end() - self.settings.loop_preroll_secs;
                if sounding.is_none() || self.position >= wrap_at {
                    self.wrap();
                }
            }
            PlaybackMode::Playing => {
                if !self.tracks.any_playing() && self.position < self.settings.end_detect_secs {
                    self.halt();
                    self.mode = PlaybackMode::Stopped;
                    self.route = None;
                    self.set_idle_disabled(false);
                    info!("Playback reached the end");
                }
            }
            PlaybackMode::Stopped => {}
        }
        self.publish();
    }

    /// Stop everything and release the idle switch. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.halt();
        self.mode = PlaybackMode::Stopped;
        self.route = None;
        self.set_idle_disabled(false);
        self.closed = true;
        self.publish();
        debug!("Session closed");
    }

    // ========== Internals ==========

    /// Start the current route at `at`; stays stopped when nothing would sound
    fn start(&mut self, mode: PlaybackMode, at: f64) -> bool {
        let Some(route) = self.tracks.route() else {
            debug!("Start ignored: nothing enabled or loaded");
            self.mode = PlaybackMode::Stopped;
            self.route = None;
            self.set_idle_disabled(false);
            self.publish();
            return false;
        };
        self.tracks.play_route(&route, at);
        debug!("{:?} via {:?} from {}", mode, route, format_time(at));
        self.position = at;
        self.mode = mode;
        self.route = Some(route);
        self.closed = false;
        self.set_idle_disabled(true);
        self.publish();
        true
    }

    /// Internal stop ahead of a restart
    fn suspend(&mut self) {
        self.halt();
        self.set_idle_disabled(false);
    }

    fn wrap(&mut self) {
        let at = self.loop_start;
        self.tracks.seek_all(at);
        if let Some(route) = &self.route {
            self.tracks.play_route(route, at);
        }
        self.position = at;
        debug!("Loop wrapped to {}", format_time(at));
    }

    fn halt(&mut self) {
        self.tracks.stop_all();
    }

    fn set_idle_disabled(&mut self, disabled: bool) {
        if self.idle_disabled != disabled {
            self.idle_disabled = disabled;
            self.inhibitor.set_idle_disabled(disabled);
        }
    }

    fn publish(&self) {
        self.signal.send_replace(self.snapshot());
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.close();
    }
}

/// Format seconds as `mm:ss`
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ManualClock, ManualTrackLoader, TrackEvent};
    use crate::model::PartAudioTrack;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FlagLog(Rc<RefCell<Vec<bool>>>);

    impl IdleInhibitor for FlagLog {
        fn set_idle_disabled(&mut self, disabled: bool) {
            self.0.borrow_mut().push(disabled);
        }
    }

    fn duet() -> Score {
        let mut score = Score::new("Duet");
        score.mp3_parts = vec![
            PartAudioTrack::new("Soprano", "soprano.mp3"),
            PartAudioTrack::new("Alto", "alto.mp3"),
        ];
        score.full_mix = Some(PathBuf::from("mix.mp3"));
        score
    }

    fn session(score: &Score) -> (ManualTrackLoader, PlaybackController) {
        let loader = ManualTrackLoader::new(ManualClock::new())
            .with_track("soprano.mp3", 30.0)
            .with_track("alto.mp3", 30.0)
            .with_track("mix.mp3", 30.0);
        let controller = PlaybackController::open(score, &loader, PlaybackSettings::default());
        (loader, controller)
    }

    #[test]
    fn test_open_is_stopped_with_full_loop_region() {
        let (_loader, c) = session(&duet());
        assert_eq!(c.mode(), PlaybackMode::Stopped);
        assert_eq!(c.duration(), 30.0);
        assert_eq!(c.loop_start(), 0.0);
        assert_eq!(c.loop_end(), 30.0);
        assert_eq!(c.rate(), 1.0);
    }

    #[test]
    fn test_play_all_parts_uses_full_mix() {
        let (loader, mut c) = session(&duet());
        assert!(c.play());
        assert_eq!(c.mode(), PlaybackMode::Playing);
        assert_eq!(loader.played(), vec![PathBuf::from("mix.mp3")]);
        assert!(!c.play());
    }

    #[test]
    fn test_play_with_everything_disabled_is_noop() {
        let (loader, mut c) = session(&duet());
        c.set_all_parts_enabled(false);
        assert!(!c.play());
        assert!(!c.toggle_loop());
        assert_eq!(c.mode(), PlaybackMode::Stopped);
        assert!(loader.played().is_empty());
    }

    #[test]
    fn test_stop_keeps_position() {
        let (loader, mut c) = session(&duet());
        c.play();
        loader.clock().advance(2.0);
        c.tick();
        assert!(c.stop());
        assert!((c.position() - 2.0).abs() < 1e-9);
        assert!(!c.stop());
    }

    #[test]
    fn test_natural_end_stops() {
        let (loader, mut c) = session(&duet());
        c.seek(29.0);
        c.play();
        loader.clock().advance(1.5);
        c.tick();
        assert_eq!(c.mode(), PlaybackMode::Stopped);
        assert_eq!(c.position(), 0.0);
    }

    #[test]
    fn test_loop_toggle_and_wrap() {
        let (loader, mut c) = session(&duet());
        c.set_loop_region(10.0, 20.0);
        assert!(c.toggle_loop());
        assert_eq!(c.mode(), PlaybackMode::Looping);
        assert_eq!(c.position(), 10.0);

        loader.clear_events();
        loader.clock().advance(9.8);
        c.tick();
        assert_eq!(c.mode(), PlaybackMode::Looping);
        assert_eq!(c.position(), 10.0);
        assert!(loader
            .events()
            .contains(&TrackEvent::Seek(PathBuf::from("mix.mp3"), 10.0)));

        assert!(c.toggle_loop());
        assert_eq!(c.mode(), PlaybackMode::Stopped);
    }

    #[test]
    fn test_short_loop_is_widened() {
        let (_loader, mut c) = session(&duet());
        c.set_loop_region(5.0, 5.1);
        assert!((c.effective_loop_end() - 5.5).abs() < 1e-9);
        c.set_loop_region(29.9, 30.0);
        assert_eq!(c.loop_start(), 29.5);
        assert_eq!(c.effective_loop_end(), 30.0);
    }

    #[test]
    fn test_loop_near_the_end_plays_before_wrapping() {
        let (loader, mut c) = session(&duet());
        c.set_loop_start(29.9);
        assert!(c.toggle_loop());
        assert_eq!(c.position(), 29.5);

        loader.clock().advance(0.1);
        c.tick();
        assert!((c.position() - 29.6).abs() < 1e-9);

        loader.clock().advance(0.15);
        c.tick();
        assert_eq!(c.position(), 29.5);
        assert_eq!(c.mode(), PlaybackMode::Looping);
    }

    #[test]
    fn test_loop_from_playing_jumps_to_loop_start() {
        let (loader, mut c) = session(&duet());
        c.set_loop_region(10.0, 20.0);
        c.play();
        loader.clock().advance(3.0);
        c.tick();
        loader.clear_events();

        assert!(c.toggle_loop());
        assert_eq!(c.mode(), PlaybackMode::Looping);
        assert_eq!(c.position(), 10.0);
        assert!(loader
            .events()
            .contains(&TrackEvent::Seek(PathBuf::from("mix.mp3"), 10.0)));
        assert_eq!(loader.played(), vec![PathBuf::from("mix.mp3")]);
    }

    #[test]
    fn test_seek_while_looping_keeps_looping() {
        let (loader, mut c) = session(&duet());
        c.set_loop_region(10.0, 20.0);
        c.toggle_loop();

        assert!(c.seek(15.0));
        assert_eq!(c.mode(), PlaybackMode::Looping);
        assert_eq!(c.position(), 15.0);

        loader.clock().advance(4.8);
        c.tick();
        assert_eq!(c.mode(), PlaybackMode::Looping);
        assert_eq!(c.position(), 10.0);
    }

    #[test]
    fn test_rate_change_while_looping_keeps_looping() {
        let (loader, mut c) = session(&duet());
        c.set_loop_region(10.0, 20.0);
        c.toggle_loop();
        loader.clock().advance(2.0);

        assert_eq!(c.set_rate(1.5), 1.5);
        assert_eq!(c.mode(), PlaybackMode::Looping);
        assert!((c.position() - 12.0).abs() < 1e-9);

        loader.clock().advance(5.0);
        c.tick();
        assert!((c.position() - 19.5).abs() < 1e-9);
        loader.clock().advance(0.2);
        c.tick();
        assert_eq!(c.position(), 10.0);
        assert_eq!(c.mode(), PlaybackMode::Looping);
    }

    #[test]
    fn test_seek_out_of_range_is_ignored() {
        let (_loader, mut c) = session(&duet());
        assert!(!c.seek(-1.0));
        assert!(!c.seek(31.0));
        assert!(!c.seek(f64::NAN));
        assert!(c.seek(30.0));
    }

    #[test]
    fn test_rate_is_clamped_and_snapped() {
        let (_loader, mut c) = session(&duet());
        assert_eq!(c.set_rate(2.0), 1.5);
        assert_eq!(c.set_rate(0.1), 0.5);
        assert!((c.set_rate(1.23) - 1.2).abs() < 1e-9);
        assert_eq!(c.set_rate(f64::INFINITY), c.rate());
    }

    #[test]
    fn test_rate_change_while_playing_resumes_in_place() {
        let (loader, mut c) = session(&duet());
        c.play();
        loader.clock().advance(4.0);
        c.set_rate(1.5);
        assert_eq!(c.mode(), PlaybackMode::Playing);
        assert!((c.position() - 4.0).abs() < 1e-9);
        loader.clock().advance(2.0);
        c.tick();
        assert!((c.position() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_inhibitor_follows_playback() {
        let flags = FlagLog::default();
        let (loader, c) = session(&duet());
        let mut c = c.with_inhibitor(Box::new(flags.clone()));
        c.play();
        c.seek(5.0);
        c.stop();
        assert_eq!(*flags.0.borrow(), vec![true, false, true, false]);

        c.toggle_loop();
        drop(c);
        drop(loader);
        assert_eq!(flags.0.borrow().last(), Some(&false));
    }

    #[test]
    fn test_subscribers_see_position() {
        let (loader, mut c) = session(&duet());
        let rx = c.subscribe();
        c.play();
        loader.clock().advance(3.0);
        c.tick();
        let snap = *rx.borrow();
        assert!(snap.is_playing());
        assert!((snap.position - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(125.0), "02:05");
        assert_eq!(format_time(-3.0), "00:00");
    }
}
