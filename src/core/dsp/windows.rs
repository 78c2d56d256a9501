//! Analysis window functions

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Window applied to each analysis frame before the FFT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl Default for WindowType {
    fn default() -> Self {
        Self::Hann
    }
}

/// Create a periodic window of `size` coefficients
pub fn create_window(size: usize, window_type: WindowType) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32;
            match window_type {
                WindowType::Hann => 0.5 * (1.0 - (2.0 * PI * x / n).cos()),
                WindowType::Hamming => 0.54 - 0.46 * (2.0 * PI * x / n).cos(),
                WindowType::Blackman => {
                    0.42 - 0.5 * (2.0 * PI * x / n).cos() + 0.08 * (4.0 * PI * x / n).cos()
                }
                WindowType::Rectangular => 1.0,
            }
        })
        .collect()
}
