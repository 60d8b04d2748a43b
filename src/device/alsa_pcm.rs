//! ALSA playback backend.

use alsa::pcm::{Access as AlsaAccess, Format, HwParams, State, PCM};
use alsa::{Direction, ValueOr};

use super::{Access, HwConfig, PcmDevice, PcmDriver, PcmState};
use crate::error::DeviceError;
use crate::format::SampleFormat;

/// Opens ALSA PCM devices ("default", "hw:0,0", "plughw:1", ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlsaDriver;

impl PcmDriver for AlsaDriver {
    type Device = AlsaDevice;

    fn open(&self, name: &str) -> Result<AlsaDevice, DeviceError> {
        let pcm = PCM::new(name, Direction::Playback, false).map_err(backend)?;

        Ok(AlsaDevice {
            name: name.to_string(),
            pcm,
            selected: Selected::default(),
        })
    }
}

/// Parameters chosen so far; re-applied to a fresh configuration space for
/// every test so each test sees the constraints of earlier choices.
#[derive(Debug, Default, Clone, Copy)]
struct Selected {
    access: Option<Access>,
    format: Option<SampleFormat>,
    rate: Option<u32>,
    channels: Option<u32>,
}

/// An open ALSA playback PCM.
pub struct AlsaDevice {
    name: String,
    pcm: PCM,
    selected: Selected,
}

impl AlsaDevice {
    fn constrained(&self) -> alsa::Result<HwParams<'_>> {
        let hwp = HwParams::any(&self.pcm)?;
        if let Some(access) = self.selected.access {
            hwp.set_access(to_alsa_access(access))?;
        }
        if let Some(format) = self.selected.format {
            hwp.set_format(to_alsa_format(format))?;
        }
        if let Some(rate) = self.selected.rate {
            hwp.set_rate(rate, ValueOr::Nearest)?;
        }
        if let Some(channels) = self.selected.channels {
            hwp.set_channels(channels)?;
        }
        Ok(hwp)
    }

    fn test(&self, check: impl FnOnce(&HwParams<'_>) -> alsa::Result<()>) -> bool {
        self.constrained().and_then(|hwp| check(&hwp)).is_ok()
    }
}

impl PcmDevice for AlsaDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn state(&self) -> PcmState {
        match self.pcm.state() {
            State::Open => PcmState::Open,
            State::Setup => PcmState::Setup,
            State::Prepared => PcmState::Prepared,
            State::Running => PcmState::Running,
            State::XRun => PcmState::XRun,
            State::Draining => PcmState::Draining,
            State::Paused => PcmState::Paused,
            State::Suspended => PcmState::Suspended,
            State::Disconnected => PcmState::Disconnected,
            #[allow(unreachable_patterns)]
            _ => PcmState::Disconnected,
        }
    }

    fn test_access(&mut self, access: Access) -> bool {
        self.test(|hwp| hwp.test_access(to_alsa_access(access)))
    }

    fn set_access(&mut self, access: Access) -> Result<(), DeviceError> {
        let previous = self.selected.access.replace(access);
        if self.constrained().is_err() {
            self.selected.access = previous;
            return Err(DeviceError::rejected("access"));
        }
        Ok(())
    }

    fn test_format(&mut self, format: SampleFormat) -> bool {
        self.test(|hwp| hwp.test_format(to_alsa_format(format)))
    }

    fn set_format(&mut self, format: SampleFormat) -> Result<(), DeviceError> {
        let previous = self.selected.format.replace(format);
        if self.constrained().is_err() {
            self.selected.format = previous;
            return Err(DeviceError::rejected("format"));
        }
        Ok(())
    }

    fn test_rate(&mut self, rate: u32) -> bool {
        self.test(|hwp| hwp.test_rate(rate))
    }

    fn set_rate_near(&mut self, rate: u32) -> Result<u32, DeviceError> {
        let hwp = self.constrained().map_err(backend)?;
        let actual = hwp
            .set_rate_near(rate, ValueOr::Nearest)
            .map_err(|_| DeviceError::rejected("rate"))?;
        drop(hwp);
        self.selected.rate = Some(actual);
        Ok(actual)
    }

    fn test_channels(&mut self, channels: u32) -> bool {
        self.test(|hwp| hwp.test_channels(channels))
    }

    fn set_channels(&mut self, channels: u32) -> Result<(), DeviceError> {
        let previous = self.selected.channels.replace(channels);
        if self.constrained().is_err() {
            self.selected.channels = previous;
            return Err(DeviceError::rejected("channels"));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<HwConfig, DeviceError> {
        let hwp = self.constrained().map_err(backend)?;
        self.pcm.hw_params(&hwp).map_err(backend)?;

        let current = self.pcm.hw_params_current().map_err(backend)?;
        let buffer_frames = current.get_buffer_size().map_err(backend)?;
        Ok(HwConfig {
            channels: current.get_channels().map_err(backend)?,
            rate: current.get_rate().map_err(backend)?,
            buffer_frames: usize::try_from(buffer_frames).unwrap_or(0),
        })
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError> {
        self.pcm.io_bytes().writei(buf).map_err(|e| {
            if e.errno() == EPIPE {
                DeviceError::Underrun
            } else {
                DeviceError::write_failed(e.to_string())
            }
        })
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        self.pcm.prepare().map_err(backend)
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.pcm.drain().map_err(backend)
    }

    fn close(self) {
        // snd_pcm_close runs when the PCM is dropped
        drop(self.pcm);
    }
}

/// ALSA reports an underrun as `-EPIPE`.
const EPIPE: i32 = 32;

fn backend(e: alsa::Error) -> DeviceError {
    DeviceError::Backend(e.to_string())
}

fn to_alsa_access(access: Access) -> AlsaAccess {
    match access {
        Access::RwInterleaved => AlsaAccess::RWInterleaved,
        Access::RwNonInterleaved => AlsaAccess::RWNonInterleaved,
    }
}

/// 24-bit formats map to the packed three-byte layouts so the byte width
/// table matches what the device consumes.
fn to_alsa_format(format: SampleFormat) -> Format {
    match format {
        SampleFormat::S8 => Format::S8,
        SampleFormat::U8 => Format::U8,
        SampleFormat::S16Le => Format::S16LE,
        SampleFormat::S16Be => Format::S16BE,
        SampleFormat::U16Le => Format::U16LE,
        SampleFormat::U16Be => Format::U16BE,
        SampleFormat::S24Le => Format::S243LE,
        SampleFormat::S24Be => Format::S243BE,
        SampleFormat::U24Le => Format::U243LE,
        SampleFormat::U24Be => Format::U243BE,
        SampleFormat::S32Le => Format::S32LE,
        SampleFormat::S32Be => Format::S32BE,
        SampleFormat::U32Le => Format::U32LE,
        SampleFormat::U32Be => Format::U32BE,
        SampleFormat::FloatLe => Format::FloatLE,
        SampleFormat::FloatBe => Format::FloatBE,
        SampleFormat::Float64Le => Format::Float64LE,
        SampleFormat::Float64Be => Format::Float64BE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping_is_total() {
        for format in SampleFormat::ALL {
            let _ = to_alsa_format(format);
        }
    }

    // Note: Device tests require actual audio hardware and are skipped in CI
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_device() {
        let device = AlsaDriver.open("default").unwrap();
        println!("Default device: {} ({})", device.name(), device.state());
    }
}
