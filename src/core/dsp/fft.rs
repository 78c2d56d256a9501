//! FFT processing with windowing

use rustfft::{Fft, FftPlanner};
use num_complex::Complex;
use std::sync::Arc;

use super::windows::{create_window, WindowType};

/// Windowed real-input FFT producing one-sided power spectra.
///
/// The window may be shorter than the FFT; frames are windowed at their
/// own length and zero-padded up to `fft_size`.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_size: usize,
    buffer: Vec<Complex<f32>>,
}

impl FftProcessor {
    pub fn new(fft_size: usize, window_length: usize, window_type: WindowType) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft,
            window: create_window(window_length.min(fft_size), window_type),
            fft_size,
            buffer: Vec::with_capacity(fft_size),
        }
    }

    /// Power spectrum `|X[k]|^2` for `k` in `0..=fft_size/2`
    pub fn power_spectrum(&mut self, frame: &[f32]) -> Vec<f32> {
        self.buffer.clear();
        self.buffer.extend(
            frame
                .iter()
                .zip(self.window.iter())
                .map(|(&s, &w)| Complex::new(s * w, 0.0)),
        );
        self.buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut self.buffer);

        self.buffer[..self.num_bins()]
            .iter()
            .map(|c| c.re * c.re + c.im * c.im)
            .collect()
    }

    /// Number of one-sided bins (`fft_size/2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
