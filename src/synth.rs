//! Test-tone generation.
//!
//! A small phase-accumulating sine oscillator, enough to drive a playback
//! session without any other audio source.

use std::f64::consts::{E, TAU};

use crate::format::{encode_frame, SampleFormat};

/// Default tone frequency (A4).
pub const DEFAULT_FREQUENCY: f64 = 440.0;

/// Default output level, about -12 dBFS.
pub const DEFAULT_AMPLITUDE: f64 = 0.25;

/// Phase-accumulating sine oscillator.
///
/// The phase is kept in `[0, 1)` so long sessions don't lose precision.
///
/// # Example
///
/// ```
/// use pcm_pipe::{SampleFormat, SineOscillator};
///
/// let mut osc = SineOscillator::new(440.0, 44_100);
/// let mut buf = vec![0u8; 1024 * 4];
/// osc.fill(&mut buf, SampleFormat::FloatLe, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SineOscillator {
    phase: f64,
    increment: f64,
    amplitude: f64,
}

impl SineOscillator {
    /// Creates an oscillator at `frequency` Hz for a stream at `sample_rate`.
    pub fn new(frequency: f64, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            increment: frequency / f64::from(sample_rate),
            amplitude: DEFAULT_AMPLITUDE,
        }
    }

    /// Sets the peak level, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Current phase in cycles, in `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Advances one sample and returns it.
    pub fn next_sample(&mut self) -> f64 {
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        (TAU * self.phase).sin() * self.amplitude
    }

    /// Fills `buf` with whole frames, the same sample on every channel.
    ///
    /// Trailing bytes that don't make up a whole frame are left untouched.
    /// Returns the number of frames written.
    pub fn fill(&mut self, buf: &mut [u8], format: SampleFormat, channels: usize) -> usize {
        let frame_bytes = channels * format.byte_width();
        if frame_bytes == 0 {
            return 0;
        }

        let mut frames = 0;
        for frame in buf.chunks_exact_mut(frame_bytes) {
            let value = self.next_sample();
            encode_frame(format, channels, value, frame);
            frames += 1;
        }
        frames
    }
}

/// Sigmoid soft clipper: `2 / (1 + e^(-e·x)) - 1`.
///
/// Maps any input into `(-1, 1)`, saturating smoothly instead of clipping.
pub fn soft_clip(x: f64) -> f64 {
    2.0 / (1.0 + (-E * x).exp()) - 1.0
}
