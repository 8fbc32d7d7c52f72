// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio file probing and decoding.

use std::fs::File;
use std::io;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::AudioError;

/// Fully decoded interleaved PCM
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    /// Interleaved samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: usize,
}

impl DecodedAudio {
    /// Number of frames
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

struct OpenedStream {
    format: Box<dyn FormatReader>,
    track_id: u32,
    params: CodecParameters,
}

fn open_stream(path: &Path) -> Result<OpenedStream, AudioError> {
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::NoTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    Ok(OpenedStream {
        format,
        track_id,
        params,
    })
}

/// Length of an audio file in seconds.
///
/// Uses the container's frame count when present, otherwise decodes the
/// whole file.
pub fn probe_duration(path: &Path) -> Result<f64, AudioError> {
    let opened = open_stream(path)?;
    if let (Some(frames), Some(rate)) = (opened.params.n_frames, opened.params.sample_rate) {
        if rate > 0 {
            return Ok(frames as f64 / rate as f64);
        }
    }
    debug!("No frame count in {:?}, decoding to measure", path);
    Ok(decode_file(path)?.duration())
}

/// Decode a whole file to interleaved f32
pub fn decode_file(path: &Path) -> Result<DecodedAudio, AudioError> {
    let OpenedStream {
        mut format,
        track_id,
        params,
    } = open_stream(path)?;

    let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

    let mut audio = DecodedAudio {
        samples: Vec::new(),
        sample_rate: params.sample_rate.unwrap_or(44_100),
        channels: params.channels.map(|c| c.count()).unwrap_or(2),
    };

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                audio.samples.extend_from_slice(buf.samples());
                audio.sample_rate = spec.rate;
                audio.channels = spec.channels.count();
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping corrupt packet in {:?}: {}", path, msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    debug!(
        "Decoded {:?}: {} frames at {} Hz, {} ch",
        path,
        audio.frames(),
        audio.sample_rate,
        audio.channels
    );
    Ok(audio)
}
