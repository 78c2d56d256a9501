// src/core/decoder.rs
//
// Audio decoding from in-memory payloads.
// Uses Symphonia for format-agnostic decoding and collapses every layout to mono.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::PcmSignal;
use crate::error::PipelineError;

/// Container format, declared by the caller or sniffed from the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Identify the container from its leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            AudioFormat::Wav
        } else if bytes.starts_with(b"fLaC") {
            AudioFormat::Flac
        } else if bytes.starts_with(b"OggS") {
            AudioFormat::Ogg
        } else if bytes.starts_with(b"ID3")
            || (bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0)
        {
            AudioFormat::Mp3
        } else {
            AudioFormat::Unknown
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "wav" | "wave" => AudioFormat::Wav,
            "mp3" => AudioFormat::Mp3,
            "flac" => AudioFormat::Flac,
            "ogg" | "oga" => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    /// Map an upload content type. Anything outside `audio/*` is rejected.
    pub fn from_mime(mime: &str) -> Result<Self, PipelineError> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        if !essence.starts_with("audio/") {
            return Err(PipelineError::UnsupportedFormat(format!(
                "content type '{}' is not audio; upload a wav, mp3, flac or ogg file",
                mime
            )));
        }
        Ok(match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => AudioFormat::Wav,
            "audio/mpeg" | "audio/mp3" => AudioFormat::Mp3,
            "audio/flac" | "audio/x-flac" => AudioFormat::Flac,
            "audio/ogg" | "audio/vorbis" => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        })
    }

    pub fn extension(&self) -> Option<&'static str> {
        match self {
            AudioFormat::Wav => Some("wav"),
            AudioFormat::Mp3 => Some("mp3"),
            AudioFormat::Flac => Some("flac"),
            AudioFormat::Ogg => Some("ogg"),
            AudioFormat::Unknown => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("unknown"))
    }
}

/// Raw uploaded audio with its resolved container format
#[derive(Debug, Clone)]
pub struct AudioSample {
    bytes: Vec<u8>,
    format: AudioFormat,
}

impl AudioSample {
    /// Validate the payload and resolve its format.
    ///
    /// Sniffed magic bytes win over the declared format. An unrecognized
    /// payload is only passed on to the decoder when the caller declared
    /// a concrete format.
    pub fn new(bytes: Vec<u8>, declared: Option<AudioFormat>) -> Result<Self, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptySignal("audio payload is empty".to_string()));
        }

        let sniffed = AudioFormat::sniff(&bytes);
        let format = match (sniffed, declared) {
            (AudioFormat::Unknown, Some(d)) if d != AudioFormat::Unknown => d,
            (AudioFormat::Unknown, _) => {
                return Err(PipelineError::UnsupportedFormat(
                    "unrecognized audio container".to_string(),
                ))
            }
            (s, Some(d)) if d != AudioFormat::Unknown && d != s => {
                warn!("Declared format {} does not match payload ({}); using {}", d, s, s);
                s
            }
            (s, _) => s,
        };

        Ok(Self { bytes, format })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decoded audio collapsed to mono at its native sample rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub signal: PcmSignal,
    pub format: AudioFormat,
    pub codec_name: String,
    /// Channel count before the mono mixdown
    pub channels: usize,
    pub duration_secs: f64,
}

/// Decode an audio payload to a mono signal at the file's native rate
pub fn decode_audio(sample: &AudioSample) -> Result<DecodedAudio, PipelineError> {
    let cursor = Cursor::new(sample.bytes().to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = sample.format().extension() {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(map_probe_error)?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::UnsupportedFormat("no decodable audio track".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::CorruptAudio("stream does not declare a sample rate".to_string()))?;
    if sample_rate == 0 {
        return Err(PipelineError::CorruptAudio("stream declares a zero sample rate".to_string()));
    }
    let declared_frames = track.codec_params.n_frames;
    let codec_name = symphonia::default::get_codecs()
        .get_codec(track.codec_params.codec)
        .map(|d| d.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", track.codec_params.codec));

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(msg) => PipelineError::UnsupportedFormat(msg.to_string()),
            other => PipelineError::CorruptAudio(other.to_string()),
        })?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels = 0usize;
    let mut failed_packets = 0usize;
    let mut decoded_packets = 0usize;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(PipelineError::CorruptAudio(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("Skipping undecodable packet: {}", msg);
                failed_packets += 1;
                continue;
            }
            Err(e) => return Err(PipelineError::CorruptAudio(e.to_string())),
        };
        decoded_packets += 1;

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if decoded_packets == 0 && failed_packets > 0 {
        return Err(PipelineError::CorruptAudio(format!(
            "all {} packets failed to decode",
            failed_packets
        )));
    }
    if channels == 0 || interleaved.is_empty() {
        return Err(PipelineError::EmptySignal("no audio samples decoded".to_string()));
    }

    let frames = interleaved.len() / channels;
    if sample.format() == AudioFormat::Wav {
        if let Some(expected) = declared_frames {
            if (frames as u64) < expected {
                return Err(PipelineError::CorruptAudio(format!(
                    "truncated data: header declares {} frames, found {}",
                    expected, frames
                )));
            }
        }
    }

    let mono = mix_to_mono(&interleaved, channels);
    let signal = PcmSignal::new(mono, sample_rate);
    let duration_secs = signal.duration_secs();

    debug!(
        "Decoded {} ({}): {} Hz, {} ch, {:.2}s",
        sample.format(),
        codec_name,
        sample_rate,
        channels,
        duration_secs
    );

    Ok(DecodedAudio {
        signal,
        format: sample.format(),
        codec_name,
        channels,
        duration_secs,
    })
}

fn map_probe_error(err: SymphoniaError) -> PipelineError {
    match err {
        SymphoniaError::Unsupported(msg) => PipelineError::UnsupportedFormat(msg.to_string()),
        SymphoniaError::IoError(e) => PipelineError::CorruptAudio(format!("malformed header: {}", e)),
        other => PipelineError::CorruptAudio(other.to_string()),
    }
}

/// Average interleaved channels sample-wise
pub fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono() {
        let mono = mix_to_mono(&[0.5, -0.5, 0.3, 0.1], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.0).abs() < 1e-6);
        assert!((mono[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_sniff() {
        let mut wav = b"RIFF\0\0\0\0WAVEfmt ".to_vec();
        wav.extend_from_slice(&[0; 8]);
        assert_eq!(AudioFormat::sniff(&wav), AudioFormat::Wav);
        assert_eq!(AudioFormat::sniff(b"ID3\x04\0\0"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::sniff(&[0xFF, 0xFB, 0x90, 0x00]), AudioFormat::Mp3);
        assert_eq!(AudioFormat::sniff(b"fLaC\0\0\0\x22"), AudioFormat::Flac);
        assert_eq!(AudioFormat::sniff(b"OggS\0\x02"), AudioFormat::Ogg);
        assert_eq!(AudioFormat::sniff(b"hello world"), AudioFormat::Unknown);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(AudioFormat::from_mime("audio/wav").unwrap(), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_mime("audio/mpeg").unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_mime("audio/x-flac; rate=44100").unwrap(), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_mime("audio/aac").unwrap(), AudioFormat::Unknown);
        assert!(matches!(
            AudioFormat::from_mime("text/plain"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(AudioFormat::from_extension("WAV"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("mp3"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_extension("m4a"), AudioFormat::Unknown);
    }

    #[test]
    fn test_empty_payload() {
        let err = AudioSample::new(Vec::new(), Some(AudioFormat::Wav)).unwrap_err();
        assert!(matches!(err, PipelineError::EmptySignal(_)));
    }

    #[test]
    fn test_unknown_payload_without_declaration() {
        let err = AudioSample::new(b"definitely not audio".to_vec(), None).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_sniffed_format_wins() {
        let mut wav = b"RIFF\0\0\0\0WAVE".to_vec();
        wav.extend_from_slice(&[0; 16]);
        let sample = AudioSample::new(wav, Some(AudioFormat::Mp3)).unwrap();
        assert_eq!(sample.format(), AudioFormat::Wav);
    }
}
