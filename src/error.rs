// src/error.rs
//
// Error kinds surfaced by the classification pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage, used for logging and to report where a request was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decode,
    Resample,
    Extract,
    Normalize,
    Classify,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Resample => "resample",
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::Classify => "classify",
            Stage::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Container or codec not recognized
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Malformed headers or truncated data
    #[error("corrupt audio: {0}")]
    CorruptAudio(String),

    #[error("resampling failed: {0}")]
    Resampling(String),

    #[error("empty signal: {0}")]
    EmptySignal(String),

    /// Missing or malformed weights. Fatal at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// Invalid pipeline configuration. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request cancelled before {stage} stage")]
    Cancelled { stage: Stage },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            PipelineError::CorruptAudio(_) => ErrorKind::CorruptAudio,
            PipelineError::Resampling(_) => ErrorKind::Resampling,
            PipelineError::EmptySignal(_) => ErrorKind::EmptySignal,
            PipelineError::ModelLoad(_) => ErrorKind::ModelLoad,
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether the error halts startup rather than failing a single request
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::ModelLoad(_) | PipelineError::Config(_))
    }
}

/// Serializable error kind, as reported to callers of the inference boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "UnsupportedFormatError")]
    UnsupportedFormat,
    #[serde(rename = "CorruptAudioError")]
    CorruptAudio,
    #[serde(rename = "ResamplingError")]
    Resampling,
    #[serde(rename = "EmptySignalError")]
    EmptySignal,
    #[serde(rename = "ModelLoadError")]
    ModelLoad,
    #[serde(rename = "ConfigError")]
    Config,
    #[serde(rename = "CancelledError")]
    Cancelled,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "UnsupportedFormatError",
            ErrorKind::CorruptAudio => "CorruptAudioError",
            ErrorKind::Resampling => "ResamplingError",
            ErrorKind::EmptySignal => "EmptySignalError",
            ErrorKind::ModelLoad => "ModelLoadError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Cancelled => "CancelledError",
        }
    }

    /// Errors the uploader can fix by sending different audio
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedFormat
                | ErrorKind::CorruptAudio
                | ErrorKind::Resampling
                | ErrorKind::EmptySignal
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured per-request failure returned at the pipeline boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PipelineError> for ClassificationFailure {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for ClassificationFailure {
    fn from(err: PipelineError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&ErrorKind::EmptySignal).unwrap();
        assert_eq!(json, "\"EmptySignalError\"");
        assert_eq!(ErrorKind::ModelLoad.name(), "ModelLoadError");
    }

    #[test]
    fn test_failure_from_error() {
        let err = PipelineError::CorruptAudio("truncated data chunk".to_string());
        let failure = ClassificationFailure::from(&err);
        assert_eq!(failure.kind, ErrorKind::CorruptAudio);
        assert!(failure.message.contains("truncated data chunk"));
        assert!(failure.kind.is_user_correctable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(PipelineError::ModelLoad("bad".into()).is_fatal());
        assert!(PipelineError::Config("bad".into()).is_fatal());
        assert!(!PipelineError::EmptySignal("none".into()).is_fatal());
        assert!(!PipelineError::Cancelled { stage: Stage::Extract }.is_fatal());
    }
}
