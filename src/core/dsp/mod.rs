//! Digital Signal Processing utilities

mod fft;
mod windows;

pub use fft::FftProcessor;
pub use windows::{create_window, WindowType};
