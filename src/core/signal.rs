//! Mono PCM signal owned by a single pipeline invocation

/// Working sample rate of the feature pipeline (22.05 kHz)
pub const WORKING_SAMPLE_RATE: u32 = 22_050;

/// Single-channel floating point samples at a known rate
#[derive(Debug, Clone, PartialEq)]
pub struct PcmSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Keep at most the first `max_secs` seconds
    pub fn truncate_secs(&mut self, max_secs: f64) {
        let max_len = (max_secs * self.sample_rate as f64).floor() as usize;
        if self.samples.len() > max_len {
            self.samples.truncate(max_len);
        }
    }
}
