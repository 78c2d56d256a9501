// tests/test_utils/mod.rs
//
// Shared helpers for integration tests: in-memory WAV fixtures and a ready pipeline.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use birdclassr::testgen::{bird_chirp, encode_wav, sine, silence, ChirpConfig};
use birdclassr::{ClassificationPipeline, ModelWeights, PipelineConfig, SpeciesCatalog};

pub fn demo_pipeline() -> ClassificationPipeline {
    ClassificationPipeline::new(
        PipelineConfig::default(),
        Arc::new(ModelWeights::demo(0)),
        Arc::new(SpeciesCatalog::builtin()),
    )
    .expect("demo pipeline must build")
}

pub fn silent_wav(sample_rate: u32, secs: f64) -> Vec<u8> {
    encode_wav(&silence(sample_rate, secs), sample_rate, 1).expect("encode silence")
}

pub fn tone_wav(freq: f64, sample_rate: u32, secs: f64) -> Vec<u8> {
    encode_wav(&sine(freq, sample_rate, secs, 0.5), sample_rate, 1).expect("encode tone")
}

pub fn chirp_wav(seed: u64, secs: f64) -> Vec<u8> {
    let config = ChirpConfig {
        duration_secs: secs,
        seed,
        ..Default::default()
    };
    encode_wav(&bird_chirp(&config), config.sample_rate, 1).expect("encode chirp")
}

/// Interleave two mono channels into a stereo WAV
pub fn stereo_wav(left: &[f32], right: &[f32], sample_rate: u32) -> Vec<u8> {
    let interleaved: Vec<f32> = left
        .iter()
        .zip(right.iter())
        .flat_map(|(&l, &r)| [l, r])
        .collect();
    encode_wav(&interleaved, sample_rate, 2).expect("encode stereo")
}

pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("birdclassr-{}-{}", tag, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn birdclassr() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_birdclassr"));
    // Keep the user's own weights file out of the tests
    cmd.env_remove("BIRDCLASSR_WEIGHTS");
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("birdclassr-no-config"));
    cmd
}
