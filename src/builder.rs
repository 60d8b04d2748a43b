//! Builder pattern for playback sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{PlaybackConfig, StreamParams};
use crate::device::PcmDriver;
use crate::format::SampleFormat;
use crate::pipeline::FillBuffer;
use crate::session::{run_session, SessionOptions, SessionStats};
use crate::{event_callback, EventCallback, PlaybackError, PlaybackEvent};

/// Device opened when none is named.
pub const DEFAULT_DEVICE: &str = "default";

/// Builder for configuring and running playback.
///
/// Use [`Playback::builder()`] for ALSA or [`Playback::with_driver()`] for
/// any other [`PcmDriver`].
///
/// # Example
///
/// ```
/// use pcm_pipe::{MockDriver, Playback, SampleFormat};
///
/// let driver = MockDriver::new();
/// let mut periods = 0;
///
/// let stats = Playback::with_driver(driver.clone())
///     .device("hw:0,0")
///     .channels(2)
///     .sample_rate(48_000)
///     .format(SampleFormat::S16Le)
///     .play(|buf: &mut [u8]| {
///         buf.fill(0);
///         periods += 1;
///         periods == 8
///     })?;
///
/// assert_eq!(stats.buffers_written, 8);
/// # Ok::<(), pcm_pipe::PlaybackError>(())
/// ```
#[must_use]
pub struct PlaybackBuilder<D> {
    driver: D,
    device: String,
    params: StreamParams,
    config: PlaybackConfig,
    event_callback: Option<EventCallback>,
}

impl<D: PcmDriver> PlaybackBuilder<D> {
    /// Creates a builder with default settings for `driver`.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            device: DEFAULT_DEVICE.to_string(),
            params: StreamParams::default(),
            config: PlaybackConfig::default(),
            event_callback: None,
        }
    }

    /// Set the device to open.
    pub fn device(mut self, name: impl Into<String>) -> Self {
        self.device = name.into();
        self
    }

    /// Set the number of interleaved channels.
    pub fn channels(mut self, channels: u32) -> Self {
        self.params.channels = channels;
        self
    }

    /// Set the sample rate in Hz.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.params.sample_rate = sample_rate;
        self
    }

    /// Set the sample format the fill callback writes.
    pub fn format(mut self, format: SampleFormat) -> Self {
        self.params.format = format;
        self
    }

    /// Set channels, rate and format at once.
    pub fn params(mut self, params: StreamParams) -> Self {
        self.params = params;
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include device configuration, write failures and dropped
    /// periods. The callback runs on the pipeline threads and should return
    /// quickly.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(PlaybackEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom pipeline configuration.
    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Plays audio from `fill` until it reports its last buffer.
    ///
    /// Blocks the calling thread for the whole session.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The device cannot be opened or configured
    /// - The fill callback or the write loop panics
    pub fn play<F>(self, fill: F) -> Result<SessionStats, PlaybackError>
    where
        F: FillBuffer + Send,
    {
        let options = SessionOptions {
            device: &self.device,
            params: self.params,
            config: &self.config,
            events: self.event_callback.as_ref(),
        };
        run_session(&self.driver, &options, fill)
    }

    /// Starts playback on Tokio's blocking pool and returns a handle to it.
    ///
    /// The session still ends only through the fill callback: after
    /// [`PlaybackHandle::stop()`] the next buffer is left silent and marked
    /// as the last one.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn<F>(self, mut fill: F) -> PlaybackHandle
    where
        D: Send + 'static,
        F: FillBuffer + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_requested = Arc::clone(&stop);
        let fill = move |buf: &mut [u8]| stop_requested.load(Ordering::Acquire) || fill.fill(buf);

        let task = tokio::task::spawn_blocking(move || self.play(fill));
        PlaybackHandle { stop, task }
    }
}

/// Handle to playback running in the background.
///
/// Returned by [`PlaybackBuilder::spawn()`].
///
/// # Example
///
/// ```
/// use pcm_pipe::{MockDriver, Playback};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), pcm_pipe::PlaybackError> {
/// let handle = Playback::with_driver(MockDriver::new()).spawn(|_buf: &mut [u8]| false);
///
/// // Endless generator: only stop() ends it
/// handle.stop();
/// let stats = handle.wait().await?;
/// assert!(stats.buffers_written >= 1);
/// # Ok(())
/// # }
/// ```
pub struct PlaybackHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<Result<SessionStats, PlaybackError>>,
}

impl PlaybackHandle {
    /// Asks the session to finish after the buffer currently being filled.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Returns `true` once the session has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end and returns its result.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or [`PlaybackError::TaskFailed`] if the
    /// background task was cancelled.
    pub async fn wait(self) -> Result<SessionStats, PlaybackError> {
        self.task
            .await
            .map_err(|e| PlaybackError::TaskFailed(e.to_string()))?
    }
}

/// Main entry point for pcm-pipe.
///
/// Use [`Playback::builder()`] to start configuring playback.
pub struct Playback;

impl Playback {
    /// Creates a builder that plays through ALSA.
    #[cfg(feature = "alsa")]
    pub fn builder() -> PlaybackBuilder<crate::device::AlsaDriver> {
        PlaybackBuilder::new(crate::device::AlsaDriver)
    }

    /// Creates a builder that plays through `driver`.
    pub fn with_driver<D: PcmDriver>(driver: D) -> PlaybackBuilder<D> {
        PlaybackBuilder::new(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockDriver;

    #[test]
    fn test_builder_default() {
        let builder = PlaybackBuilder::new(MockDriver::new());
        assert_eq!(builder.device, "default");
        assert_eq!(builder.params, StreamParams::default());
        assert_eq!(builder.config, PlaybackConfig::default());
        assert!(builder.event_callback.is_none());
    }

    #[test]
    fn test_builder_params() {
        let builder = Playback::with_driver(MockDriver::new())
            .device("plughw:1")
            .channels(2)
            .sample_rate(96_000)
            .format(SampleFormat::S24Le);

        assert_eq!(builder.device, "plughw:1");
        assert_eq!(
            builder.params,
            StreamParams::new(2, 96_000, SampleFormat::S24Le)
        );
    }

    #[test]
    fn test_builder_with_config() {
        let config = PlaybackConfig {
            pool_size: 2,
            period_frames: 64,
            write_retries: 3,
        };
        let builder = Playback::with_driver(MockDriver::new()).with_config(config.clone());
        assert_eq!(builder.config, config);
    }

    #[test]
    fn test_builder_play_uses_requested_device() {
        let driver = MockDriver::new();
        Playback::with_driver(driver.clone())
            .device("hw:2")
            .play(|_buf: &mut [u8]| true)
            .unwrap();

        assert_eq!(
            driver.calls().first(),
            Some(&crate::device::MockCall::Open("hw:2".to_string()))
        );
    }

    #[tokio::test]
    async fn test_spawn_runs_to_completion() {
        let mut left = 4;
        let handle = Playback::with_driver(MockDriver::new()).spawn(move |_buf: &mut [u8]| {
            left -= 1;
            left == 0
        });

        let stats = handle.wait().await.unwrap();
        assert_eq!(stats.buffers_written, 4);
    }
}
