//! # pcm-pipe
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Blocking PCM playback driven by a fill callback.
//!
//! `pcm-pipe` opens a playback device, negotiates its hardware parameters and
//! then streams audio produced by your callback through a small pool of
//! period buffers. Generation and device writes run on separate threads, so a
//! jittery generator is smoothed out by the buffers already queued.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcm_pipe::{Playback, SampleFormat, SineOscillator};
//!
//! let mut osc = SineOscillator::new(440.0, 44_100);
//! let mut periods = 0;
//!
//! let stats = Playback::builder()
//!     .device("default")
//!     .channels(1)
//!     .sample_rate(44_100)
//!     .format(SampleFormat::FloatLe)
//!     .on_event(|e| tracing::warn!(?e, "playback event"))
//!     .play(|buf: &mut [u8]| {
//!         osc.fill(buf, SampleFormat::FloatLe, 1);
//!         periods += 1;
//!         periods == 200 // last buffer
//!     })?;
//!
//! println!("{} buffers written", stats.buffers_written);
//! ```
//!
//! ## Architecture
//!
//! The crate keeps a strict thread boundary:
//!
//! - **Generator thread**: takes a free buffer, calls your fill callback,
//!   queues the buffer
//! - **Buffer pool**: fixed set of buffers; the number of free ones bounds how
//!   far generation runs ahead of the device
//! - **Drain thread**: writes queued buffers to the device in fill order and
//!   recovers from underruns
//!
//! The calling thread blocks until the buffer marked last has been written,
//! then the device is drained and closed.
//!
//! ## Backends
//!
//! Real playback goes through ALSA and needs the `alsa` feature (and
//! `libasound` at build time). [`MockDriver`] records everything in memory and
//! is always available.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
pub mod device;
mod error;
mod event;
pub mod format;
mod pipeline;
mod session;
mod synth;

pub use builder::{Playback, PlaybackBuilder, PlaybackHandle, DEFAULT_DEVICE};
pub use config::{PlaybackConfig, StreamParams, DEFAULT_PERIOD_FRAMES, DEFAULT_POOL_SIZE};
#[cfg(feature = "alsa")]
pub use device::{default_output_device_name, list_output_devices, AlsaDriver};
pub use device::{MockDriver, PcmDevice, PcmDriver};
pub use error::{DeviceError, PlaybackError};
pub use event::{event_callback, EventCallback, PlaybackEvent};
pub use format::{byte_width, encode_sample, SampleFormat};
pub use pipeline::FillBuffer;
pub use session::SessionStats;
pub use synth::{soft_clip, SineOscillator, DEFAULT_AMPLITUDE, DEFAULT_FREQUENCY};

/// Plays audio from `fill` on `device` until it reports its last buffer.
///
/// Shorthand for [`Playback::with_driver()`] with default
/// [`PlaybackConfig`] and no event callback. Blocks the calling thread for
/// the whole session.
///
/// # Errors
///
/// Returns an error if the device can't be opened, if any of `channels`,
/// `sample_rate` or `format` is not supported, or if a pipeline thread
/// panics. Failed writes are recovered and never fail the session.
///
/// # Example
///
/// ```
/// use pcm_pipe::{MockDriver, SampleFormat};
///
/// let driver = MockDriver::new();
/// let mut left = 3;
/// let stats = pcm_pipe::play(&driver, "default", 2, 48_000, SampleFormat::S16Le, |_buf: &mut [u8]| {
///     left -= 1;
///     left == 0
/// })?;
///
/// assert_eq!(stats.buffers_written, 3);
/// assert_eq!(driver.write_count(), 3);
/// # Ok::<(), pcm_pipe::PlaybackError>(())
/// ```
pub fn play<D, F>(
    driver: &D,
    device: &str,
    channels: u32,
    sample_rate: u32,
    format: SampleFormat,
    fill: F,
) -> Result<SessionStats, PlaybackError>
where
    D: PcmDriver,
    F: FillBuffer + Send,
{
    let config = PlaybackConfig::default();
    let options = session::SessionOptions {
        device,
        params: StreamParams::new(channels, sample_rate, format),
        config: &config,
        events: None,
    };
    session::run_session(driver, &options, fill)
}
