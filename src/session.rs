//! Playback session: negotiation, the two pipeline threads and teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::config::{PlaybackConfig, StreamParams};
use crate::device::{negotiate, PcmDevice, PcmDriver};
use crate::event::{emit, EventCallback, PlaybackEvent};
use crate::pipeline::{run_generator, BufferPool, Drain, FillBuffer};
use crate::PlaybackError;

/// Name of the thread running the fill callback.
pub(crate) const GENERATOR_THREAD: &str = "pcm-generator";

/// Name of the thread writing to the device.
pub(crate) const DRAIN_THREAD: &str = "pcm-drain";

/// Statistics about a finished playback session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Buffers handed to the fill callback and queued.
    pub buffers_generated: u64,
    /// Buffers fully written to the device.
    pub buffers_written: u64,
    /// Bytes written to the device.
    pub bytes_written: u64,
    /// Failed write attempts, including retried ones.
    pub write_errors: u64,
    /// Successful stream re-prepares after a failed write.
    pub recoveries: u64,
    /// Buffers skipped after exhausting their retries.
    pub dropped_periods: u64,
}

/// Counters shared between the session and its pipeline threads.
pub(crate) struct SessionState {
    pub buffers_generated: AtomicU64,
    pub buffers_written: AtomicU64,
    pub bytes_written: AtomicU64,
    pub write_errors: AtomicU64,
    pub recoveries: AtomicU64,
    pub dropped_periods: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            buffers_generated: AtomicU64::new(0),
            buffers_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            recoveries: AtomicU64::new(0),
            dropped_periods: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            buffers_generated: self.buffers_generated.load(Ordering::SeqCst),
            buffers_written: self.buffers_written.load(Ordering::SeqCst),
            bytes_written: self.bytes_written.load(Ordering::SeqCst),
            write_errors: self.write_errors.load(Ordering::SeqCst),
            recoveries: self.recoveries.load(Ordering::SeqCst),
            dropped_periods: self.dropped_periods.load(Ordering::SeqCst),
        }
    }
}

/// Everything a session needs besides the driver and the callback.
pub(crate) struct SessionOptions<'a> {
    pub device: &'a str,
    pub params: StreamParams,
    pub config: &'a PlaybackConfig,
    pub events: Option<&'a EventCallback>,
}

/// Runs one playback session to completion on the calling thread.
///
/// Blocks until the fill callback has reported its last buffer and that
/// buffer has been written, or until a pipeline thread panics. The device
/// is drained and closed before returning in every case after a successful
/// negotiation.
pub(crate) fn run_session<D, F>(
    driver: &D,
    options: &SessionOptions<'_>,
    fill: F,
) -> Result<SessionStats, PlaybackError>
where
    D: PcmDriver,
    F: FillBuffer + Send,
{
    options.config.validate()?;
    if options.params.channels == 0 {
        return Err(PlaybackError::invalid_config("channels must be at least 1"));
    }
    if options.params.sample_rate == 0 {
        return Err(PlaybackError::invalid_config("sample_rate must be non-zero"));
    }

    let (mut device, negotiated) =
        negotiate(driver, options.device, &options.params, options.config)?;

    tracing::info!(
        "Starting playback on '{}': {} ch, {} Hz, {}, {} bytes per period, {} buffers",
        negotiated.device,
        negotiated.channels,
        negotiated.sample_rate,
        negotiated.format,
        negotiated.period_bytes,
        options.config.pool_size
    );
    emit(
        options.events,
        PlaybackEvent::DeviceConfigured {
            device: negotiated.device.clone(),
            channels: negotiated.channels,
            sample_rate: negotiated.sample_rate,
            format: negotiated.format,
            period_bytes: negotiated.period_bytes,
        },
    );

    let state = SessionState::new();
    let pool = BufferPool::new(options.config.pool_size, negotiated.period_bytes);
    tracing::debug!(
        "Allocated {} buffers of {} bytes",
        pool.capacity(),
        pool.slot_bytes()
    );
    let result = run_threads(
        &pool,
        &state,
        &mut device,
        negotiated.frame_bytes(),
        options,
        fill,
    );
    tracing::debug!(
        "Pipeline stopped: {:?}, final buffer queued: {}",
        pool.occupancy(),
        pool.is_finished()
    );
    drop(pool);

    if let Err(e) = device.drain() {
        tracing::warn!("Failed to drain '{}': {}", negotiated.device, e);
    }
    device.close();

    result?;
    let stats = state.snapshot();
    tracing::info!(
        "Playback finished: {} buffers written, {} dropped, {} write errors",
        stats.buffers_written,
        stats.dropped_periods,
        stats.write_errors
    );
    Ok(stats)
}

fn run_threads<P, F>(
    pool: &BufferPool,
    state: &SessionState,
    device: &mut P,
    frame_bytes: usize,
    options: &SessionOptions<'_>,
    fill: F,
) -> Result<(), PlaybackError>
where
    P: PcmDevice,
    F: FillBuffer + Send,
{
    let write_retries = options.config.write_retries;
    let events = options.events;

    thread::scope(|s| -> Result<(), PlaybackError> {
        let generator = thread::Builder::new()
            .name(GENERATOR_THREAD.to_string())
            .spawn_scoped(s, move || run_generator(pool, fill, state))
            .map_err(|source| PlaybackError::ThreadSpawn {
                thread: GENERATOR_THREAD,
                source,
            })?;

        let drain = thread::Builder::new()
            .name(DRAIN_THREAD.to_string())
            .spawn_scoped(s, move || {
                Drain::new(device, frame_bytes, write_retries, events, state).run(pool);
            });
        let drain = match drain {
            Ok(handle) => handle,
            Err(source) => {
                // Unblock the generator so the scope can join it
                pool.close();
                return Err(PlaybackError::ThreadSpawn {
                    thread: DRAIN_THREAD,
                    source,
                });
            }
        };

        let drained = drain
            .join()
            .map_err(|payload| PlaybackError::from_panic(DRAIN_THREAD, &*payload));
        let generated = generator
            .join()
            .map_err(|payload| PlaybackError::from_panic(GENERATOR_THREAD, &*payload));

        generated.and(drained)
    })
}
