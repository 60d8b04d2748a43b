//! Configuration types for playback sessions.

use crate::format::SampleFormat;
use crate::PlaybackError;

/// Frames transferred per device write.
pub const DEFAULT_PERIOD_FRAMES: usize = 1024;

/// Number of buffers cycling between the generator and the device.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Requested stream format: what the fill callback produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Encoding of each sample.
    pub format: SampleFormat,
}

impl StreamParams {
    /// Creates stream parameters.
    pub fn new(channels: u32, sample_rate: u32, format: SampleFormat) -> Self {
        Self {
            channels,
            sample_rate,
            format,
        }
    }

    /// Bytes in one interleaved frame.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.format.byte_width()
    }

    /// Bytes in one period of `period_frames` frames.
    #[must_use]
    pub fn period_bytes(&self, period_frames: usize) -> usize {
        period_frames * self.frame_bytes()
    }
}

impl Default for StreamParams {
    /// 44.1kHz mono 32-bit float.
    fn default() -> Self {
        Self::new(1, 44_100, SampleFormat::FloatLe)
    }
}

/// Configuration for the buffering pipeline.
///
/// Use [`PlaybackConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use pcm_pipe::PlaybackConfig;
///
/// let config = PlaybackConfig {
///     pool_size: 8,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Frames per buffer.
    ///
    /// Every buffer handed to the fill callback holds exactly
    /// `period_frames × channels × sample width` bytes, regardless of the
    /// buffer size the driver suggests.
    /// Default: 1024
    pub period_frames: usize,

    /// Number of buffers in the pool.
    ///
    /// Bounds how far the generator can run ahead of the device.
    /// Default: 4
    pub pool_size: usize,

    /// How many times a failed write is retried after re-preparing the
    /// device before the period is dropped.
    ///
    /// Default: 1
    pub write_retries: u32,
}

impl PlaybackConfig {
    /// Checks the configuration for values the pipeline can't run with.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if `period_frames` or
    /// `pool_size` is zero.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.period_frames == 0 {
            return Err(PlaybackError::invalid_config(
                "period_frames must be at least 1",
            ));
        }
        if self.pool_size == 0 {
            return Err(PlaybackError::invalid_config(
                "pool_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            period_frames: DEFAULT_PERIOD_FRAMES,
            pool_size: DEFAULT_POOL_SIZE,
            write_retries: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_config_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.period_frames, 1024);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.write_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_pool_rejected() {
        let config = PlaybackConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlaybackError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = PlaybackConfig {
            period_frames: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_period_bytes() {
        let params = StreamParams::new(2, 48_000, SampleFormat::S16Le);
        assert_eq!(params.frame_bytes(), 4);
        assert_eq!(params.period_bytes(1024), 4096);

        let params = StreamParams::new(1, 44_100, SampleFormat::Float64Le);
        assert_eq!(params.period_bytes(DEFAULT_PERIOD_FRAMES), 8192);
    }

    #[test]
    fn test_stream_params_default() {
        let params = StreamParams::default();
        assert_eq!(params.channels, 1);
        assert_eq!(params.sample_rate, 44_100);
        assert_eq!(params.format, SampleFormat::FloatLe);
    }
}
