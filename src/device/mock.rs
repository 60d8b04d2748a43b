//! Mock playback driver for testing without hardware.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Access, HwConfig, PcmDevice, PcmDriver, PcmState};
use crate::error::DeviceError;
use crate::format::SampleFormat;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `PcmDriver::open` with the device name.
    Open(String),
    /// `test_access`.
    TestAccess(Access),
    /// `set_access`.
    SetAccess(Access),
    /// `test_format`.
    TestFormat(SampleFormat),
    /// `set_format`.
    SetFormat(SampleFormat),
    /// `test_rate`.
    TestRate(u32),
    /// `set_rate_near`.
    SetRate(u32),
    /// `test_channels`.
    TestChannels(u32),
    /// `set_channels`.
    SetChannels(u32),
    /// `commit`.
    Commit,
    /// A write attempt with its length in bytes (failed attempts included).
    Write(usize),
    /// `prepare`.
    Prepare,
    /// `drain`.
    Drain,
    /// `close`.
    Close,
}

#[derive(Debug, Default)]
struct Behavior {
    fail_open: bool,
    fail_commit: bool,
    reject_access: bool,
    reject_formats: HashSet<SampleFormat>,
    reject_rates: HashSet<u32>,
    reject_channels: HashSet<u32>,
    failing_writes: HashSet<usize>,
    fail_all_writes: bool,
    max_frames_per_write: Option<usize>,
    write_delay: Duration,
    buffer_frames: usize,
}

#[derive(Debug)]
struct MockState {
    behavior: Behavior,
    calls: Vec<MockCall>,
    writes: Vec<Vec<u8>>,
    write_attempts: usize,
    pcm_state: PcmState,
    format: Option<SampleFormat>,
    channels: Option<u32>,
    rate: Option<u32>,
}

/// An in-memory [`PcmDriver`] that records every call.
///
/// This allows testing the full playback pipeline without audio hardware,
/// making it suitable for CI environments. Clones share the same recording,
/// so keep one clone to inspect what the session did.
///
/// # Example
///
/// ```
/// use pcm_pipe::device::{MockCall, MockDriver};
/// use pcm_pipe::SampleFormat;
///
/// let driver = MockDriver::new().reject_channels(6);
///
/// let result = pcm_pipe::play(&driver, "default", 6, 48_000, SampleFormat::S16Le, |_buf: &mut [u8]| true);
///
/// assert!(result.is_err());
/// assert!(!driver.calls().contains(&MockCall::Commit));
/// assert_eq!(driver.calls().last(), Some(&MockCall::Close));
/// ```
#[derive(Debug, Clone)]
pub struct MockDriver {
    shared: Arc<Mutex<MockState>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Creates a driver that accepts every parameter and every write.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(MockState {
                behavior: Behavior {
                    buffer_frames: 4096,
                    ..Behavior::default()
                },
                calls: Vec::new(),
                writes: Vec::new(),
                write_attempts: 0,
                pcm_state: PcmState::Open,
                format: None,
                channels: None,
                rate: None,
            })),
        }
    }

    /// Makes `open` fail.
    #[must_use]
    pub fn fail_open(self) -> Self {
        self.shared.lock().behavior.fail_open = true;
        self
    }

    /// Makes `commit` fail.
    #[must_use]
    pub fn fail_commit(self) -> Self {
        self.shared.lock().behavior.fail_commit = true;
        self
    }

    /// Rejects every access mode.
    #[must_use]
    pub fn reject_access(self) -> Self {
        self.shared.lock().behavior.reject_access = true;
        self
    }

    /// Rejects `format`.
    #[must_use]
    pub fn reject_format(self, format: SampleFormat) -> Self {
        self.shared.lock().behavior.reject_formats.insert(format);
        self
    }

    /// Rejects `rate`.
    #[must_use]
    pub fn reject_rate(self, rate: u32) -> Self {
        self.shared.lock().behavior.reject_rates.insert(rate);
        self
    }

    /// Rejects `channels`.
    #[must_use]
    pub fn reject_channels(self, channels: u32) -> Self {
        self.shared.lock().behavior.reject_channels.insert(channels);
        self
    }

    /// Fails the given write attempts (0-based, counting failed attempts too).
    #[must_use]
    pub fn fail_writes(self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.shared.lock().behavior.failing_writes.extend(attempts);
        self
    }

    /// Fails every write.
    #[must_use]
    pub fn fail_all_writes(self) -> Self {
        self.shared.lock().behavior.fail_all_writes = true;
        self
    }

    /// Accepts at most `frames` frames per write call.
    #[must_use]
    pub fn max_frames_per_write(self, frames: usize) -> Self {
        self.shared.lock().behavior.max_frames_per_write = Some(frames.max(1));
        self
    }

    /// Sleeps for `delay` in every write, simulating a hardware-paced device.
    #[must_use]
    pub fn write_delay(self, delay: Duration) -> Self {
        self.shared.lock().behavior.write_delay = delay;
        self
    }

    /// Sets the ring buffer size reported by `commit`.
    #[must_use]
    pub fn buffer_frames(self, frames: usize) -> Self {
        self.shared.lock().behavior.buffer_frames = frames;
        self
    }

    /// Returns every call recorded so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.shared.lock().calls.clone()
    }

    /// Returns the payload of every successful write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared.lock().writes.clone()
    }

    /// Returns all successfully written bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.lock().writes.concat()
    }

    /// Returns the number of successful writes.
    pub fn write_count(&self) -> usize {
        self.shared.lock().writes.len()
    }

    /// Returns how many times `call` was recorded.
    pub fn count(&self, call: &MockCall) -> usize {
        self.shared.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Returns the stream state of the most recently opened device.
    pub fn state(&self) -> PcmState {
        self.shared.lock().pcm_state
    }
}

impl PcmDriver for MockDriver {
    type Device = MockDevice;

    fn open(&self, name: &str) -> Result<MockDevice, DeviceError> {
        let mut state = self.shared.lock();
        if state.behavior.fail_open {
            return Err(DeviceError::Backend("No such file or directory".to_string()));
        }
        state.calls.push(MockCall::Open(name.to_string()));
        state.pcm_state = PcmState::Open;

        Ok(MockDevice {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }
}

/// A device opened by [`MockDriver`].
#[derive(Debug)]
pub struct MockDevice {
    name: String,
    shared: Arc<Mutex<MockState>>,
}

impl MockDevice {
    fn record(&self, call: MockCall) {
        self.shared.lock().calls.push(call);
    }
}

impl PcmDevice for MockDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn state(&self) -> PcmState {
        self.shared.lock().pcm_state
    }

    fn test_access(&mut self, access: Access) -> bool {
        self.record(MockCall::TestAccess(access));
        !self.shared.lock().behavior.reject_access
    }

    fn set_access(&mut self, access: Access) -> Result<(), DeviceError> {
        self.record(MockCall::SetAccess(access));
        if self.shared.lock().behavior.reject_access {
            return Err(DeviceError::rejected("access"));
        }
        Ok(())
    }

    fn test_format(&mut self, format: SampleFormat) -> bool {
        self.record(MockCall::TestFormat(format));
        !self.shared.lock().behavior.reject_formats.contains(&format)
    }

    fn set_format(&mut self, format: SampleFormat) -> Result<(), DeviceError> {
        self.record(MockCall::SetFormat(format));
        let mut state = self.shared.lock();
        if state.behavior.reject_formats.contains(&format) {
            return Err(DeviceError::rejected("format"));
        }
        state.format = Some(format);
        Ok(())
    }

    fn test_rate(&mut self, rate: u32) -> bool {
        self.record(MockCall::TestRate(rate));
        !self.shared.lock().behavior.reject_rates.contains(&rate)
    }

    fn set_rate_near(&mut self, rate: u32) -> Result<u32, DeviceError> {
        self.record(MockCall::SetRate(rate));
        let mut state = self.shared.lock();
        if state.behavior.reject_rates.contains(&rate) {
            return Err(DeviceError::rejected("rate"));
        }
        state.rate = Some(rate);
        Ok(rate)
    }

    fn test_channels(&mut self, channels: u32) -> bool {
        self.record(MockCall::TestChannels(channels));
        !self.shared.lock().behavior.reject_channels.contains(&channels)
    }

    fn set_channels(&mut self, channels: u32) -> Result<(), DeviceError> {
        self.record(MockCall::SetChannels(channels));
        let mut state = self.shared.lock();
        if state.behavior.reject_channels.contains(&channels) {
            return Err(DeviceError::rejected("channels"));
        }
        state.channels = Some(channels);
        Ok(())
    }

    fn commit(&mut self) -> Result<HwConfig, DeviceError> {
        let mut state = self.shared.lock();
        state.calls.push(MockCall::Commit);
        if state.behavior.fail_commit {
            return Err(DeviceError::Backend("Invalid argument".to_string()));
        }
        state.pcm_state = PcmState::Prepared;

        Ok(HwConfig {
            channels: state.channels.unwrap_or(1),
            rate: state.rate.unwrap_or(44_100),
            buffer_frames: state.behavior.buffer_frames,
        })
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError> {
        let (delay, frames) = {
            let mut state = self.shared.lock();
            let attempt = state.write_attempts;
            state.write_attempts += 1;
            state.calls.push(MockCall::Write(buf.len()));

            // Like ALSA, a stream stopped by an underrun rejects writes
            // until it is prepared again
            if state.pcm_state == PcmState::XRun {
                return Err(DeviceError::Underrun);
            }
            if state.behavior.fail_all_writes || state.behavior.failing_writes.contains(&attempt) {
                state.pcm_state = PcmState::XRun;
                return Err(DeviceError::Underrun);
            }

            let frame_bytes = state.channels.unwrap_or(1) as usize
                * state.format.map_or(1, SampleFormat::byte_width);
            let frames = match state.behavior.max_frames_per_write {
                Some(max) => (buf.len() / frame_bytes).min(max),
                None => buf.len() / frame_bytes,
            };

            state.writes.push(buf[..frames * frame_bytes].to_vec());
            state.pcm_state = PcmState::Running;
            (state.behavior.write_delay, frames)
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(frames)
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        let mut state = self.shared.lock();
        state.calls.push(MockCall::Prepare);
        state.pcm_state = PcmState::Prepared;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        let mut state = self.shared.lock();
        state.calls.push(MockCall::Drain);
        state.pcm_state = PcmState::Setup;
        Ok(())
    }

    fn close(self) {
        self.record(MockCall::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(driver: &MockDriver) -> MockDevice {
        let mut device = driver.open("default").unwrap();
        device.set_format(SampleFormat::S16Le).unwrap();
        device.set_channels(2).unwrap();
        device.commit().unwrap();
        device
    }

    #[test]
    fn test_mock_records_calls_in_order() {
        let driver = MockDriver::new();
        let mut device = driver.open("hw:0").unwrap();
        assert!(device.test_rate(48_000));
        assert_eq!(device.set_rate_near(48_000).unwrap(), 48_000);
        device.close();

        assert_eq!(
            driver.calls(),
            vec![
                MockCall::Open("hw:0".to_string()),
                MockCall::TestRate(48_000),
                MockCall::SetRate(48_000),
                MockCall::Close,
            ]
        );
    }

    #[test]
    fn test_mock_rejections() {
        let driver = MockDriver::new()
            .reject_access()
            .reject_format(SampleFormat::U8)
            .reject_rate(8_000)
            .reject_channels(8);
        let mut device = driver.open("default").unwrap();

        assert!(!device.test_access(Access::RwInterleaved));
        assert!(!device.test_format(SampleFormat::U8));
        assert!(device.test_format(SampleFormat::S16Le));
        assert!(!device.test_rate(8_000));
        assert!(!device.test_channels(8));
        assert!(device.test_channels(2));
    }

    #[test]
    fn test_mock_set_rejected_value() {
        let driver = MockDriver::new()
            .reject_format(SampleFormat::U8)
            .reject_channels(8);
        let mut device = driver.open("default").unwrap();

        assert_eq!(
            device.set_format(SampleFormat::U8),
            Err(DeviceError::rejected("format"))
        );
        assert_eq!(
            device.set_channels(8),
            Err(DeviceError::Rejected {
                parameter: "channels".to_string()
            })
        );
        assert!(device.set_channels(2).is_ok());

        // Rejected values are never applied
        let hw = device.commit().unwrap();
        assert_eq!(hw.channels, 2);
    }

    #[test]
    fn test_mock_fail_open() {
        let driver = MockDriver::new().fail_open();
        assert!(driver.open("default").is_err());
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_mock_write_returns_frames() {
        let driver = MockDriver::new();
        let mut device = configured(&driver);

        // 2ch S16 = 4 bytes per frame
        assert_eq!(device.write(&[0u8; 16]).unwrap(), 4);
        assert_eq!(driver.write_count(), 1);
        assert_eq!(driver.state(), PcmState::Running);
    }

    #[test]
    fn test_mock_failing_write() {
        let driver = MockDriver::new().fail_writes([0]);
        let mut device = configured(&driver);

        assert_eq!(device.write(&[1u8; 8]), Err(DeviceError::Underrun));
        assert_eq!(driver.state(), PcmState::XRun);
        device.prepare().unwrap();
        assert_eq!(device.write(&[1u8; 8]).unwrap(), 2);
        assert_eq!(driver.written_bytes(), vec![1u8; 8]);
        assert_eq!(driver.count(&MockCall::Write(8)), 2);
    }

    #[test]
    fn test_mock_xrun_rejects_writes_until_prepare() {
        let driver = MockDriver::new().fail_writes([0]);
        let mut device = configured(&driver);

        assert_eq!(device.write(&[1u8; 8]), Err(DeviceError::Underrun));
        // Not in the failure list, but the stream is still stopped
        assert_eq!(device.write(&[2u8; 8]), Err(DeviceError::Underrun));
        assert_eq!(driver.state(), PcmState::XRun);
        assert_eq!(driver.write_count(), 0);

        device.prepare().unwrap();
        assert_eq!(device.write(&[3u8; 8]).unwrap(), 2);
        assert_eq!(driver.written_bytes(), vec![3u8; 8]);
    }

    #[test]
    fn test_mock_short_writes() {
        let driver = MockDriver::new().max_frames_per_write(3);
        let mut device = configured(&driver);

        let buf: Vec<u8> = (0..20).collect();
        assert_eq!(device.write(&buf).unwrap(), 3);
        assert_eq!(driver.written_bytes(), (0..12).collect::<Vec<u8>>());
    }

    #[test]
    fn test_mock_commit_reports_buffer() {
        let driver = MockDriver::new().buffer_frames(2048);
        let mut device = driver.open("default").unwrap();
        device.set_channels(2).unwrap();
        device.set_rate_near(48_000).unwrap();

        let hw = device.commit().unwrap();
        assert_eq!(hw.channels, 2);
        assert_eq!(hw.rate, 48_000);
        assert_eq!(hw.buffer_frames, 2048);
    }
}
