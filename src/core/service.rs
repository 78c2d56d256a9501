// src/core/service.rs
//
// Bounded worker pool running independent pipeline invocations.

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::assembler::ClassificationResult;
use super::decoder::AudioFormat;
use super::model::{Classifier, InferenceBackend};
use super::pipeline::{CancellationToken, ClassificationPipeline};
use crate::error::ClassificationFailure;

/// One audio payload to classify
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    /// Caller-facing name of the payload, e.g. the uploaded file name
    pub source: String,
    pub bytes: Vec<u8>,
    pub declared_format: Option<AudioFormat>,
    pub cancel: CancellationToken,
}

impl ClassificationRequest {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes,
            declared_format: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.declared_format = Some(format);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Outcome of one request, tagged for the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { prediction: ClassificationResult },
    Failure { error: ClassificationFailure },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub request_id: Uuid,
    pub source: String,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ClassificationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn prediction(&self) -> Option<&ClassificationResult> {
        match &self.outcome {
            Outcome::Success { prediction } => Some(prediction),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&ClassificationFailure> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } => Some(error),
        }
    }
}

/// Runs classification requests on a fixed-size thread pool
pub struct ClassificationService<B: InferenceBackend = Classifier> {
    pipeline: Arc<ClassificationPipeline<B>>,
    pool: rayon::ThreadPool,
    timeout: Option<Duration>,
}

impl<B: InferenceBackend> ClassificationService<B> {
    pub fn new(pipeline: Arc<ClassificationPipeline<B>>) -> Result<Self> {
        let workers = pipeline.config().worker_count();
        let timeout = pipeline.config().request_timeout();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("birdclassr-worker-{}", i))
            .build()
            .context("Failed to start classification worker pool")?;

        info!("Classification service started with {} worker(s)", workers);
        Ok(Self {
            pipeline,
            pool,
            timeout,
        })
    }

    /// Classify one request on the calling thread
    pub fn classify(&self, request: ClassificationRequest) -> ClassificationResponse {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let ClassificationRequest {
            source,
            bytes,
            declared_format,
            cancel,
        } = request;

        let token = match self.timeout {
            Some(timeout) => cancel.with_deadline(timeout),
            None => cancel,
        };

        info!("[{}] Received {} ({} bytes)", request_id, source, bytes.len());
        let outcome = match self
            .pipeline
            .classify_with_cancel(bytes, declared_format, &token)
        {
            Ok(prediction) => {
                info!(
                    "[{}] {} -> {} ({:.1}%)",
                    request_id,
                    source,
                    prediction.top.common_name,
                    prediction.top.confidence_percent()
                );
                Outcome::Success { prediction }
            }
            Err(err) => {
                warn!("[{}] {} failed: {}", request_id, source, err);
                Outcome::Failure { error: err.into() }
            }
        };

        ClassificationResponse {
            request_id,
            source,
            elapsed_ms: started.elapsed().as_millis() as u64,
            outcome,
        }
    }

    /// Classify many requests in parallel.
    ///
    /// Responses come back in completion order; `on_done` runs as each
    /// request finishes.
    pub fn classify_batch<F>(&self, requests: Vec<ClassificationRequest>, on_done: F) -> Vec<ClassificationResponse>
    where
        F: Fn(&ClassificationResponse) + Sync,
    {
        let (tx, rx) = mpsc::channel();
        self.pool.install(|| {
            requests.into_par_iter().for_each_with(tx, |tx, request| {
                let response = self.classify(request);
                on_done(&response);
                let _ = tx.send(response);
            });
        });
        rx.into_iter().collect()
    }

    pub fn pipeline(&self) -> &ClassificationPipeline<B> {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::core::catalog::SpeciesCatalog;
    use crate::core::model::ModelWeights;
    use crate::error::ErrorKind;
    use crate::testgen::{encode_wav, sine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(workers: usize) -> ClassificationService {
        let config = ConfigBuilder::new().workers(workers).build().unwrap();
        let pipeline = ClassificationPipeline::new(
            config,
            Arc::new(ModelWeights::demo(3)),
            Arc::new(SpeciesCatalog::builtin()),
        )
        .unwrap();
        ClassificationService::new(Arc::new(pipeline)).unwrap()
    }

    fn tone_wav() -> Vec<u8> {
        encode_wav(&sine(3000.0, 22_050, 0.5, 0.5), 22_050, 1).unwrap()
    }

    #[test]
    fn test_single_request() {
        let response = service(1).classify(ClassificationRequest::new("tone.wav", tone_wav()));
        assert!(response.is_success());
        assert_eq!(response.source, "tone.wav");
        let prediction = response.prediction().unwrap();
        assert_eq!(prediction.ranked.len(), 8);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let svc = service(2);
        let requests = vec![
            ClassificationRequest::new("a.wav", tone_wav()),
            ClassificationRequest::new("empty.wav", Vec::new()),
            ClassificationRequest::new("b.wav", tone_wav()),
            ClassificationRequest::new("junk.bin", b"not audio at all, just text".to_vec()),
        ];
        let done = AtomicUsize::new(0);
        let responses = svc.classify_batch(requests, |_| {
            done.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(responses.len(), 4);
        assert_eq!(done.load(Ordering::SeqCst), 4);

        let by_source = |name: &str| responses.iter().find(|r| r.source == name).unwrap();
        assert!(by_source("a.wav").is_success());
        assert!(by_source("b.wav").is_success());
        assert_eq!(by_source("empty.wav").failure().unwrap().kind, ErrorKind::EmptySignal);
        assert_eq!(
            by_source("junk.bin").failure().unwrap().kind,
            ErrorKind::UnsupportedFormat
        );
        assert_eq!(
            by_source("a.wav").prediction(),
            by_source("b.wav").prediction()
        );
    }

    #[test]
    fn test_cancelled_request() {
        let token = CancellationToken::new();
        token.cancel();
        let request = ClassificationRequest::new("tone.wav", tone_wav()).with_cancel(token);
        let response = service(1).classify(request);
        assert_eq!(response.failure().unwrap().kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_response_json_shape() {
        let response = service(1).classify(ClassificationRequest::new("empty.wav", Vec::new()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"]["kind"], "EmptySignalError");
        assert!(json["request_id"].is_string());
    }
}
