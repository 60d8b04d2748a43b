//! Hardware parameter negotiation.

use super::{Access, PcmDevice, PcmDriver};
use crate::config::{PlaybackConfig, StreamParams};
use crate::format::SampleFormat;
use crate::PlaybackError;

/// Access mode every session requests.
pub const ACCESS: Access = Access::RwInterleaved;

/// Parameters in effect once a device has been configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedParams {
    /// Device name as reported by the driver.
    pub device: String,
    /// Channel count in effect.
    pub channels: u32,
    /// Sample rate reported after commit.
    pub sample_rate: u32,
    /// Sample format in effect.
    pub format: SampleFormat,
    /// Frames per pipeline buffer.
    pub period_frames: usize,
    /// Bytes per pipeline buffer: `period_frames × channels × width`.
    pub period_bytes: usize,
    /// Ring buffer size the driver reported, in frames. Informational only;
    /// pipeline buffers are sized from `period_frames`.
    pub driver_buffer_frames: usize,
}

impl NegotiatedParams {
    /// Bytes in one interleaved frame.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.format.byte_width()
    }
}

/// Opens `name` and configures it for `params`.
///
/// Access, format, rate and channels are each tested before being set; the
/// first one the device can't do aborts negotiation, and later parameters
/// are never touched. All settings are applied with a single commit.
///
/// The device is closed before any error after a successful open is
/// returned.
///
/// # Errors
///
/// - [`PlaybackError::DeviceOpen`] if the device can't be opened
/// - [`PlaybackError::UnsupportedAccess`], [`PlaybackError::UnsupportedFormat`],
///   [`PlaybackError::UnsupportedRate`], [`PlaybackError::UnsupportedChannels`]
///   for the first infeasible parameter
/// - [`PlaybackError::Commit`] if applying the parameters fails
pub fn negotiate<D: PcmDriver>(
    driver: &D,
    name: &str,
    params: &StreamParams,
    config: &PlaybackConfig,
) -> Result<(D::Device, NegotiatedParams), PlaybackError> {
    let mut device = driver.open(name).map_err(|e| PlaybackError::DeviceOpen {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    match configure(&mut device, params, config) {
        Ok(negotiated) => Ok((device, negotiated)),
        Err(err) => {
            tracing::warn!("Negotiation on '{}' failed: {}", name, err);
            device.close();
            Err(err)
        }
    }
}

fn configure<P: PcmDevice>(
    device: &mut P,
    params: &StreamParams,
    config: &PlaybackConfig,
) -> Result<NegotiatedParams, PlaybackError> {
    let unsupported_access = || PlaybackError::UnsupportedAccess {
        access: ACCESS.to_string(),
    };
    if !device.test_access(ACCESS) {
        return Err(unsupported_access());
    }
    device.set_access(ACCESS).map_err(|_| unsupported_access())?;

    let unsupported_format = || PlaybackError::UnsupportedFormat {
        format: params.format.to_string(),
    };
    if !device.test_format(params.format) {
        return Err(unsupported_format());
    }
    device
        .set_format(params.format)
        .map_err(|_| unsupported_format())?;

    let unsupported_rate = || PlaybackError::UnsupportedRate {
        requested: params.sample_rate,
    };
    if !device.test_rate(params.sample_rate) {
        return Err(unsupported_rate());
    }
    device
        .set_rate_near(params.sample_rate)
        .map_err(|_| unsupported_rate())?;

    let unsupported_channels = || PlaybackError::UnsupportedChannels {
        requested: params.channels,
    };
    if !device.test_channels(params.channels) {
        return Err(unsupported_channels());
    }
    device
        .set_channels(params.channels)
        .map_err(|_| unsupported_channels())?;

    let hw = device.commit().map_err(|e| PlaybackError::Commit {
        reason: e.to_string(),
    })?;

    let layout = match hw.channels {
        1 => " (mono)",
        2 => " (stereo)",
        _ => "",
    };
    tracing::info!("PCM name: '{}'", device.name());
    tracing::info!("PCM state: {}", device.state());
    tracing::info!("channels: {}{}", hw.channels, layout);
    tracing::info!("rate: {} Hz", hw.rate);

    let period_bytes = params.period_bytes(config.period_frames);
    tracing::debug!(
        "Period: {} frames / {} bytes (driver buffer: {} frames)",
        config.period_frames,
        period_bytes,
        hw.buffer_frames
    );

    Ok(NegotiatedParams {
        device: device.name(),
        channels: params.channels,
        sample_rate: hw.rate,
        format: params.format,
        period_frames: config.period_frames,
        period_bytes,
        driver_buffer_frames: hw.buffer_frames,
    })
}
