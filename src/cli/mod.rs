// src/cli/mod.rs
//
// Command-line interface: file discovery, model loading and command dispatch.

mod args;
mod output;

pub use args::{ClassifyArgs, Cli, Commands, ModelArgs, WEIGHTS_ENV};
pub use output::{
    format_model_info, format_model_info_json, format_response, format_response_json,
    format_species, format_species_json, print_summary,
};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::{ConfigBuilder, PipelineConfig};
use crate::core::decoder::AudioFormat;
use crate::core::model::ModelWeights;
use crate::core::pipeline::ClassificationPipeline;
use crate::core::service::{ClassificationRequest, ClassificationService};
use crate::core::SpeciesCatalog;
use crate::error::PipelineError;
use crate::testgen::{bird_chirp, write_wav_file, ChirpConfig};

/// Extensions picked up when walking a directory
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "flac", "ogg", "oga"];

/// Seed of the demo network used when no weights file is found
pub const DEMO_SEED: u64 = 0;

/// Expand inputs into a sorted list of files.
///
/// Files named explicitly are always kept; directories contribute only
/// files with a known audio extension.
pub fn collect_audio_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| has_audio_extension(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            anyhow::bail!("Input not found: {}", input.display());
        }
    }

    Ok(files)
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Weights file to load: `--weights`/`BIRDCLASSR_WEIGHTS`, then the user
/// config directory. `None` means the demo network.
pub fn resolve_weights_path(model: &ModelArgs) -> Option<PathBuf> {
    if let Some(path) = &model.weights {
        return Some(path.clone());
    }
    let default = dirs::config_dir()?.join("birdclassr").join("weights.json");
    if default.is_file() {
        debug!("Using weights from {}", default.display());
        Some(default)
    } else {
        None
    }
}

pub fn load_weights(model: &ModelArgs) -> Result<ModelWeights, PipelineError> {
    match resolve_weights_path(model) {
        Some(path) => ModelWeights::load(&path),
        None => {
            info!("No weights file found; using demo network (seed {})", DEMO_SEED);
            Ok(ModelWeights::demo(DEMO_SEED))
        }
    }
}

pub fn load_config(model: &ModelArgs) -> Result<PipelineConfig, PipelineError> {
    match &model.config {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Load config and weights and build the pipeline. Every failure here is fatal.
pub fn build_pipeline(model: &ModelArgs, config: PipelineConfig) -> Result<ClassificationPipeline> {
    let weights = load_weights(model).context("Failed to load model weights")?;
    let pipeline = ClassificationPipeline::new(
        config,
        Arc::new(weights),
        Arc::new(SpeciesCatalog::builtin()),
    )
    .context("Failed to initialize classification pipeline")?;
    Ok(pipeline)
}

/// Run a parsed command line. Returns `false` if any request failed.
pub fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Classify(args) => run_classify(args),
        Commands::Species { json } => {
            let catalog = SpeciesCatalog::builtin();
            if json {
                println!("{}", format_species_json(&catalog)?);
            } else {
                print!("{}", format_species(&catalog));
            }
            Ok(true)
        }
        Commands::ModelInfo { model, json } => {
            let config = load_config(&model).context("Failed to load configuration")?;
            let pipeline = build_pipeline(&model, config)?;
            let info = pipeline.model_info();
            if json {
                println!("{}", format_model_info_json(&info)?);
            } else {
                print!("{}", format_model_info(&info));
            }
            Ok(true)
        }
        Commands::GenSample { output, seed, duration } => {
            anyhow::ensure!(
                duration.is_finite() && duration > 0.0,
                "Duration must be positive, got {}",
                duration
            );
            let config = ChirpConfig {
                duration_secs: duration,
                seed,
                ..Default::default()
            };
            let samples = bird_chirp(&config);
            write_wav_file(&output, &samples, config.sample_rate)?;
            println!(
                "Wrote {:.1}s bird call to {}",
                duration,
                output.display()
            );
            Ok(true)
        }
        Commands::GenWeights { output, seed } => {
            let weights = ModelWeights::demo(seed);
            let json = weights.to_json_pretty()?;
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&output, json)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote demo weights (seed {}) to {}", seed, output.display());
            Ok(true)
        }
    }
}

fn run_classify(args: ClassifyArgs) -> Result<bool> {
    let base = load_config(&args.model).context("Failed to load configuration")?;
    let mut builder = ConfigBuilder::from_config(base);
    if let Some(workers) = args.workers {
        builder = builder.workers(workers);
    }
    if let Some(ms) = args.timeout_ms {
        builder = builder.request_timeout_ms(ms);
    }
    let config = builder.build().context("Invalid configuration")?;

    let files = collect_audio_files(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No audio files found");
    }
    info!("Found {} audio file(s)", files.len());

    let pipeline = build_pipeline(&args.model, config)?;
    let service = ClassificationService::new(Arc::new(pipeline))?;

    let mut requests = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut request = ClassificationRequest::new(path.display().to_string(), bytes);
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let format = AudioFormat::from_extension(ext);
            if format != AudioFormat::Unknown {
                request = request.with_format(format);
            }
        }
        requests.push(request);
    }

    let progress = if args.json || files.len() < 2 {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    };

    let top = args.top;
    let json = args.json;
    let responses = service.classify_batch(requests, |response| {
        let text = if json {
            format_response_json(response).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
        } else {
            format_response(response, top)
        };
        progress.suspend(|| {
            if json {
                println!("{}", text);
            } else {
                print!("{}", text);
            }
        });
        progress.inc(1);
    });
    progress.finish_and_clear();

    let failed = responses.iter().filter(|r| !r.is_success()).count();
    if !json {
        print_summary(responses.len() - failed, failed);
    }
    Ok(failed == 0)
}
