//! Drain loop: writes filled slots to the device in queue order.

use std::sync::atomic::Ordering;

use super::pool::{BufferPool, CloseOnUnwind, Dequeued};
use crate::device::PcmDevice;
use crate::error::DeviceError;
use crate::event::{emit, EventCallback, PlaybackEvent};
use crate::session::SessionState;

/// Writes queued periods to a device, recovering from write errors.
pub(crate) struct Drain<'a, P: PcmDevice> {
    device: &'a mut P,
    frame_bytes: usize,
    write_retries: u32,
    events: Option<&'a EventCallback>,
    state: &'a SessionState,
}

impl<'a, P: PcmDevice> Drain<'a, P> {
    pub fn new(
        device: &'a mut P,
        frame_bytes: usize,
        write_retries: u32,
        events: Option<&'a EventCallback>,
        state: &'a SessionState,
    ) -> Self {
        Self {
            device,
            frame_bytes,
            write_retries,
            events,
            state,
        }
    }

    /// Runs on the drain thread until the final slot is written or the pool
    /// is closed.
    pub fn run(&mut self, pool: &BufferPool) {
        let _guard = CloseOnUnwind(pool);

        while let Some(Dequeued { slot, last }) = pool.dequeue_filled() {
            let bytes = slot.bytes();
            match self.write_period(bytes) {
                Ok(()) => {
                    self.state.buffers_written.fetch_add(1, Ordering::Relaxed);
                    self.state
                        .bytes_written
                        .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                    tracing::trace!("Wrote slot {} ({} bytes)", slot.index(), bytes.len());
                }
                Err(err) => {
                    self.state.dropped_periods.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("Dropping slot {} after failed writes: {}", slot.index(), err);
                    emit(
                        self.events,
                        PlaybackEvent::PeriodDropped {
                            slot: slot.index(),
                            error: err.to_string(),
                        },
                    );
                }
            }

            // Only now is the device done with the bytes
            pool.release_slot(slot);

            if last {
                let buffers_written = self.state.buffers_written.load(Ordering::Relaxed);
                tracing::debug!("Final slot written");
                emit(self.events, PlaybackEvent::Finished { buffers_written });
                return;
            }
        }

        tracing::debug!("Buffer pool closed, drain stopping");
    }

    /// Writes one period, continuing after short writes.
    ///
    /// Every failed write re-prepares the stream. The write then resumes
    /// from where the device stopped, at most `write_retries` times per
    /// period.
    fn write_period(&mut self, buf: &[u8]) -> Result<(), DeviceError> {
        let mut offset = 0;
        let mut failures = 0u32;

        while offset < buf.len() {
            let err = match self.device.write(&buf[offset..]) {
                Ok(0) => DeviceError::write_failed("device accepted no frames"),
                Ok(frames) => {
                    offset = (offset + frames * self.frame_bytes).min(buf.len());
                    continue;
                }
                Err(err) => err,
            };

            failures += 1;
            self.state.write_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Write failed (attempt {}): {}", failures, err);
            emit(
                self.events,
                PlaybackEvent::WriteFailed {
                    attempt: failures,
                    error: err.to_string(),
                },
            );

            // The stream is recovered even when this period is given up,
            // so the next one starts on a prepared device
            match self.device.prepare() {
                Ok(()) => {
                    self.state.recoveries.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Stream re-prepared");
                }
                Err(e) => tracing::warn!("Failed to re-prepare stream: {}", e),
            }

            if failures > self.write_retries {
                return Err(err);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{MockCall, MockDriver, PcmDriver};
    use std::sync::Arc;

    fn queue(pool: &BufferPool, values: &[u8]) {
        for (i, &value) in values.iter().enumerate() {
            let mut slot = pool.acquire_free_slot().unwrap();
            slot.bytes_mut().fill(value);
            pool.enqueue_filled(slot, i + 1 == values.len());
        }
    }

    #[test]
    fn test_drain_writes_in_order() {
        let driver = MockDriver::new();
        let mut device = driver.open("default").unwrap();
        let state = SessionState::new();
        let pool = BufferPool::new(4, 4);
        queue(&pool, &[1, 2, 3]);

        Drain::new(&mut device, 1, 1, None, &state).run(&pool);

        assert_eq!(
            driver.writes(),
            vec![vec![1; 4], vec![2; 4], vec![3; 4]]
        );
        let stats = state.snapshot();
        assert_eq!(stats.buffers_written, 3);
        assert_eq!(stats.bytes_written, 12);
        assert_eq!(pool.occupancy().free, 4);
    }

    #[test]
    fn test_short_writes_continue_with_remainder() {
        let driver = MockDriver::new().max_frames_per_write(1);
        let mut device = driver.open("default").unwrap();
        let state = SessionState::new();
        let pool = BufferPool::new(2, 6);
        queue(&pool, &[9]);

        Drain::new(&mut device, 1, 1, None, &state).run(&pool);

        assert_eq!(driver.write_count(), 6);
        assert_eq!(driver.written_bytes(), vec![9; 6]);
        assert_eq!(state.snapshot().buffers_written, 1);
    }

    #[test]
    fn test_failed_write_is_retried_after_prepare() {
        let driver = MockDriver::new().fail_writes([0]);
        let mut device = driver.open("default").unwrap();
        let state = SessionState::new();
        let pool = BufferPool::new(2, 2);
        queue(&pool, &[5]);

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: EventCallback = Arc::new(move |e| sink.lock().push(e));

        Drain::new(&mut device, 1, 1, Some(&callback), &state).run(&pool);

        assert_eq!(driver.count(&MockCall::Prepare), 1);
        assert_eq!(driver.written_bytes(), vec![5, 5]);
        let stats = state.snapshot();
        assert_eq!(stats.write_errors, 1);
        assert_eq!(stats.recoveries, 1);
        assert_eq!(stats.dropped_periods, 0);

        let events = events.lock();
        assert!(matches!(
            events[0],
            PlaybackEvent::WriteFailed { attempt: 1, .. }
        ));
        assert_eq!(
            events.last(),
            Some(&PlaybackEvent::Finished { buffers_written: 1 })
        );
    }

    #[test]
    fn test_persistent_failure_drops_period() {
        let driver = MockDriver::new().fail_all_writes();
        let mut device = driver.open("default").unwrap();
        let state = SessionState::new();
        let pool = BufferPool::new(2, 2);
        queue(&pool, &[1, 2]);

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: EventCallback = Arc::new(move |e| sink.lock().push(e));

        Drain::new(&mut device, 1, 1, Some(&callback), &state).run(&pool);

        let stats = state.snapshot();
        assert_eq!(stats.buffers_written, 0);
        assert_eq!(stats.dropped_periods, 2);
        assert_eq!(stats.write_errors, 4);
        assert_eq!(driver.count(&MockCall::Prepare), 4);
        assert_eq!(pool.occupancy().free, 2);

        let dropped: Vec<usize> = events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::PeriodDropped { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(dropped, vec![0, 1]);
    }

    #[test]
    fn test_zero_retries_drops_but_still_prepares() {
        let driver = MockDriver::new().fail_writes([0]);
        let mut device = driver.open("default").unwrap();
        let state = SessionState::new();
        let pool = BufferPool::new(2, 2);
        queue(&pool, &[1, 2]);

        Drain::new(&mut device, 1, 0, None, &state).run(&pool);

        assert_eq!(driver.count(&MockCall::Prepare), 1);
        assert_eq!(driver.written_bytes(), vec![2, 2]);
        let stats = state.snapshot();
        assert_eq!(stats.dropped_periods, 1);
        assert_eq!(stats.buffers_written, 1);
    }

    #[test]
    fn test_drain_stops_when_pool_closed() {
        let driver = MockDriver::new();
        let mut device = driver.open("default").unwrap();
        let state = SessionState::new();
        let pool = BufferPool::new(2, 2);
        pool.close();

        Drain::new(&mut device, 1, 1, None, &state).run(&pool);
        assert_eq!(driver.write_count(), 0);
    }
}
