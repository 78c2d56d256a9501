// src/testgen/mod.rs
//
// Synthetic audio for demos, fixtures and the `gen-sample` command.
// Everything here is seeded so the same arguments always give the same bytes.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;
use std::io::Cursor;
use std::path::Path;

use crate::core::signal::WORKING_SAMPLE_RATE;

/// Parameters of the synthetic bird call
#[derive(Debug, Clone)]
pub struct ChirpConfig {
    pub sample_rate: u32,
    pub duration_secs: f64,
    /// Start frequency of the lowest sweep
    pub base_freq: f64,
    /// Number of stacked sweeps, each `harmonic_step` Hz above the previous
    pub sweeps: usize,
    pub harmonic_step: f64,
    /// Upward sweep range of every component
    pub sweep_span: f64,
    pub noise_level: f64,
    pub seed: u64,
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            sample_rate: WORKING_SAMPLE_RATE,
            duration_secs: 3.0,
            base_freq: 2000.0,
            sweeps: 3,
            harmonic_step: 500.0,
            sweep_span: 800.0,
            noise_level: 0.05,
            seed: 0,
        }
    }
}

/// Bird-like call: stacked rising sweeps under a decaying trill envelope,
/// plus gaussian noise, peak-normalized to 1.0
pub fn bird_chirp(config: &ChirpConfig) -> Vec<f32> {
    let len = (config.sample_rate as f64 * config.duration_secs).round() as usize;
    if len == 0 {
        return Vec::new();
    }
    let sr = config.sample_rate as f64;
    let step = if len > 1 { config.duration_secs / (len - 1) as f64 } else { 0.0 };

    let mut signal = vec![0.0f64; len];
    for i in 0..config.sweeps {
        let start = config.base_freq + i as f64 * config.harmonic_step;
        let end = start + config.sweep_span;
        let mut phase = 0.0f64;
        for (n, s) in signal.iter_mut().enumerate() {
            let t = n as f64 * step;
            let freq = if len > 1 {
                start + (end - start) * n as f64 / (len - 1) as f64
            } else {
                start
            };
            phase += 2.0 * PI * freq / sr;
            let envelope = (-3.0 * t).exp() * (2.0 * PI * 5.0 * t).sin().powi(2);
            *s += 0.3 * envelope * phase.sin();
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    for s in signal.iter_mut() {
        let noise: f64 = rng.sample(StandardNormal);
        *s += config.noise_level * noise;
    }

    let peak = signal.iter().fold(0.0f64, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        signal.iter_mut().for_each(|s| *s /= peak);
    }
    signal.into_iter().map(|s| s as f32).collect()
}

/// Pure tone at `amplitude`
pub fn sine(freq: f64, sample_rate: u32, duration_secs: f64, amplitude: f32) -> Vec<f32> {
    let len = (sample_rate as f64 * duration_secs).round() as usize;
    (0..len)
        .map(|n| amplitude * (2.0 * PI * freq * n as f64 / sample_rate as f64).sin() as f32)
        .collect()
}

pub fn silence(sample_rate: u32, duration_secs: f64) -> Vec<f32> {
    vec![0.0; (sample_rate as f64 * duration_secs).round() as usize]
}

/// Encode interleaved samples as a 16-bit PCM WAV in memory
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).context("Failed to start WAV stream")?;
        for &s in samples {
            writer
                .write_sample(to_i16(s))
                .context("Failed to write WAV sample")?;
        }
        writer.finalize().context("Failed to finalize WAV stream")?;
    }
    Ok(cursor.into_inner())
}

/// Write a mono 16-bit WAV file
pub fn write_wav_file<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let bytes = encode_wav(samples, sample_rate, 1)?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}
