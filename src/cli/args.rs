//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable consulted for the weights file when `--weights` is absent
pub const WEIGHTS_ENV: &str = "BIRDCLASSR_WEIGHTS";

#[derive(Parser, Debug)]
#[command(name = "birdclassr")]
#[command(version, about = "Identify bird species in audio recordings")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify audio files or directories of audio files
    Classify(ClassifyArgs),

    /// List the species the model can recognize
    Species {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show model and feature pipeline details
    ModelInfo {
        #[command(flatten)]
        model: ModelArgs,

        #[arg(long)]
        json: bool,
    },

    /// Write a synthetic bird call as a 16-bit mono WAV
    GenSample {
        #[arg(short, long, default_value = "sample_bird.wav")]
        output: PathBuf,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Length in seconds
        #[arg(long, default_value_t = 3.0)]
        duration: f64,
    },

    /// Write a demo weights file with seeded random parameters
    GenWeights {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

/// Where to load the model and pipeline settings from
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Weights file (JSON); falls back to the user config dir, then demo weights
    #[arg(long, env = WEIGHTS_ENV)]
    pub weights: Option<PathBuf>,

    /// Pipeline configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Audio files or directories
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Print one JSON response per line
    #[arg(long)]
    pub json: bool,

    /// Number of ranked species to print per file
    #[arg(long, default_value_t = 3)]
    pub top: usize,

    /// Worker threads (overrides the config file)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-file deadline in milliseconds (overrides the config file)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classify() {
        let cli = Cli::try_parse_from([
            "birdclassr", "-vv", "classify", "a.wav", "dir", "--top", "5", "--workers", "2", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Classify(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.top, 5);
                assert_eq!(args.workers, Some(2));
                assert!(args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_classify_requires_input() {
        assert!(Cli::try_parse_from(["birdclassr", "classify"]).is_err());
    }

    #[test]
    fn test_gen_sample_defaults() {
        let cli = Cli::try_parse_from(["birdclassr", "gen-sample"]).unwrap();
        match cli.command {
            Commands::GenSample { output, seed, duration } => {
                assert_eq!(output, PathBuf::from("sample_bird.wav"));
                assert_eq!(seed, 0);
                assert_eq!(duration, 3.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
