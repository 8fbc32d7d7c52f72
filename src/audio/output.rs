// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! Each [`DeviceTrack`] holds one decoded file and one output stream. The
//! stream runs for the life of the track and renders silence while stopped;
//! transport state is shared with the callback through atomics.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;
use tracing::{error, info};

use super::decode::{decode_file, DecodedAudio};
use super::AudioError;
use crate::playback::{Track, TrackLoader};

const NO_SEEK: u64 = u64::MAX;

/// Transport state shared with the audio callback
struct Playhead {
    playing: AtomicBool,
    /// Read position in source frames (f64 bits)
    cursor: AtomicU64,
    /// Source frames advanced per output frame (f64 bits)
    step: AtomicU64,
    /// Pending seek in source frames (f64 bits), `NO_SEEK` if none
    seek: AtomicU64,
}

impl Playhead {
    fn new(step: f64) -> Self {
        Self {
            playing: AtomicBool::new(false),
            cursor: AtomicU64::new(0f64.to_bits()),
            step: AtomicU64::new(step.to_bits()),
            seek: AtomicU64::new(NO_SEEK),
        }
    }

    fn cursor(&self) -> f64 {
        match self.seek.load(Ordering::Acquire) {
            NO_SEEK => f64::from_bits(self.cursor.load(Ordering::Acquire)),
            pending => f64::from_bits(pending),
        }
    }
}

fn render(data: &mut [f32], out_channels: usize, audio: &DecodedAudio, playhead: &Playhead) {
    let pending = playhead.seek.swap(NO_SEEK, Ordering::AcqRel);
    if pending != NO_SEEK {
        playhead.cursor.store(pending, Ordering::Release);
    }

    if !playhead.playing.load(Ordering::Acquire) || audio.channels == 0 {
        data.fill(0.0);
        return;
    }

    let frames = audio.frames();
    let step = f64::from_bits(playhead.step.load(Ordering::Acquire));
    let mut cursor = f64::from_bits(playhead.cursor.load(Ordering::Acquire));
    let mut ended = false;

    for frame in data.chunks_mut(out_channels) {
        let index = cursor as usize;
        if ended || index >= frames {
            ended = true;
            frame.fill(0.0);
            continue;
        }
        for (ch, sample) in frame.iter_mut().enumerate() {
            let src_ch = ch.min(audio.channels - 1);
            *sample = audio.samples[index * audio.channels + src_ch];
        }
        cursor += step;
    }

    if ended {
        // Runs off the end: stop and rewind
        playhead.playing.store(false, Ordering::Release);
        cursor = 0.0;
    }
    playhead.cursor.store(cursor.to_bits(), Ordering::Release);
}

/// A decoded file playing through the default output device
pub struct DeviceTrack {
    _stream: Stream,
    playhead: Arc<Playhead>,
    source_rate: f64,
    output_rate: f64,
    rate: f64,
    duration: f64,
}

impl DeviceTrack {
    /// Decode `path` and open an output stream for it
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let audio = Arc::new(decode_file(path)?);
        let duration = audio.duration();
        let source_rate = audio.sample_rate.max(1) as f64;

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Output(format!("Failed to get default config: {}", e)))?;
        let config: cpal::StreamConfig = supported.config();
        let out_channels = config.channels.max(1) as usize;
        let output_rate = config.sample_rate.0.max(1) as f64;

        let playhead = Arc::new(Playhead::new(source_rate / output_rate));
        let callback_playhead = Arc::clone(&playhead);
        let callback_audio = Arc::clone(&audio);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render(data, out_channels, &callback_audio, &callback_playhead);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::Output(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::Output(format!("Failed to start stream: {}", e)))?;

        info!(
            "Opened {:?}: {:.1}s at {} Hz -> {} Hz",
            path, duration, source_rate, output_rate
        );

        Ok(Self {
            _stream: stream,
            playhead,
            source_rate,
            output_rate,
            rate: 1.0,
            duration,
        })
    }
}

impl Track for DeviceTrack {
    fn play(&mut self) {
        self.playhead.playing.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        self.playhead.playing.store(false, Ordering::Release);
    }

    fn current_time(&self) -> f64 {
        self.playhead.cursor() / self.source_rate
    }

    fn set_current_time(&mut self, secs: f64) {
        let frames = secs.clamp(0.0, self.duration) * self.source_rate;
        self.playhead.seek.store(frames.to_bits(), Ordering::Release);
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        let step = rate * self.source_rate / self.output_rate;
        self.playhead.step.store(step.to_bits(), Ordering::Release);
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn is_playing(&self) -> bool {
        self.playhead.playing.load(Ordering::Acquire)
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

/// Loader producing [`DeviceTrack`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceTrackLoader;

impl TrackLoader for DeviceTrackLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Track>, AudioError> {
        Ok(Box::new(DeviceTrack::open(path)?))
    }
}
