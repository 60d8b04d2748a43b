//! Playback device abstraction.
//!
//! This module provides the interface between a PCM driver and the rest of
//! the pipeline. [`PcmDriver`] opens devices by name, [`PcmDevice`] exposes
//! the test-then-set hardware parameter protocol and the blocking write path.
//!
//! Backends:
//! - [`MockDriver`]: in-memory recorder for tests and CI
//! - `AlsaDriver`: real ALSA playback (`alsa` feature)

#[cfg(feature = "alsa")]
mod alsa_pcm;
mod mock;
mod negotiate;

#[cfg(feature = "alsa")]
pub use alsa_pcm::{AlsaDevice, AlsaDriver};
pub use mock::{MockCall, MockDevice, MockDriver};
pub use negotiate::{negotiate, NegotiatedParams, ACCESS};

use std::fmt;

use crate::error::DeviceError;
use crate::format::SampleFormat;

/// How samples are laid out for transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Read/write transfer, channels interleaved within each frame.
    RwInterleaved,
    /// Read/write transfer, one buffer per channel.
    RwNonInterleaved,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RwInterleaved => "RW_INTERLEAVED",
            Self::RwNonInterleaved => "RW_NONINTERLEAVED",
        })
    }
}

/// Stream state as reported by the driver. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcmState {
    /// Opened, not configured.
    Open,
    /// Configured, not prepared.
    Setup,
    /// Ready to start.
    Prepared,
    /// Playing.
    Running,
    /// Stopped by an underrun.
    XRun,
    /// Playing out the remaining buffered frames.
    Draining,
    /// Paused.
    Paused,
    /// Suspended by power management.
    Suspended,
    /// The hardware went away.
    Disconnected,
}

impl fmt::Display for PcmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "OPEN",
            Self::Setup => "SETUP",
            Self::Prepared => "PREPARED",
            Self::Running => "RUNNING",
            Self::XRun => "XRUN",
            Self::Draining => "DRAINING",
            Self::Paused => "PAUSED",
            Self::Suspended => "SUSPENDED",
            Self::Disconnected => "DISCONNECTED",
        })
    }
}

/// Hardware parameters read back after a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwConfig {
    /// Channel count in effect.
    pub channels: u32,
    /// Sample rate in effect.
    pub rate: u32,
    /// Driver ring buffer size in frames.
    pub buffer_frames: usize,
}

/// Opens playback devices by name.
pub trait PcmDriver {
    /// The device type this driver produces.
    type Device: PcmDevice;

    /// Opens `name` for playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the device does not exist or is busy.
    fn open(&self, name: &str) -> Result<Self::Device, DeviceError>;
}

/// An open playback device.
///
/// Hardware parameters follow a test-then-set protocol: each `test_*` call
/// checks a value against the configuration space left by earlier `set_*`
/// calls, and [`commit`](PcmDevice::commit) applies everything at once.
pub trait PcmDevice: Send {
    /// Device name as reported by the driver.
    fn name(&self) -> String;

    /// Current stream state.
    fn state(&self) -> PcmState;

    /// Returns `true` if `access` is available.
    fn test_access(&mut self, access: Access) -> bool;

    /// Selects the access mode.
    fn set_access(&mut self, access: Access) -> Result<(), DeviceError>;

    /// Returns `true` if `format` is available.
    fn test_format(&mut self, format: SampleFormat) -> bool;

    /// Selects the sample format.
    fn set_format(&mut self, format: SampleFormat) -> Result<(), DeviceError>;

    /// Returns `true` if `rate` is available exactly.
    fn test_rate(&mut self, rate: u32) -> bool;

    /// Selects the rate closest to `rate` and returns it.
    fn set_rate_near(&mut self, rate: u32) -> Result<u32, DeviceError>;

    /// Returns `true` if `channels` is available.
    fn test_channels(&mut self, channels: u32) -> bool;

    /// Selects the channel count.
    fn set_channels(&mut self, channels: u32) -> Result<(), DeviceError>;

    /// Applies all selected parameters and prepares the stream.
    fn commit(&mut self) -> Result<HwConfig, DeviceError>;

    /// Writes interleaved frames, blocking until the driver accepts them.
    ///
    /// `buf` always holds a whole number of frames. Returns the number of
    /// frames written, which may be less than `buf` holds.
    fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError>;

    /// Resets the stream after an error so writing can resume.
    fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Blocks until all buffered frames have been played.
    fn drain(&mut self) -> Result<(), DeviceError>;

    /// Closes the device.
    fn close(self)
    where
        Self: Sized;
}

/// Lists all available output devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
#[cfg(feature = "alsa")]
pub fn list_output_devices() -> Result<Vec<String>, crate::PlaybackError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| crate::PlaybackError::BackendError(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Gets the name of the default output device, if any.
#[cfg(feature = "alsa")]
pub fn default_output_device_name() -> Option<String> {
    use cpal::traits::{DeviceTrait, HostTrait};

    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}
