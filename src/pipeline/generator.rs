//! Generator loop: fills free slots with audio from the caller.

use std::sync::atomic::Ordering;

use super::pool::{BufferPool, CloseOnUnwind};
use crate::session::SessionState;

/// Source of audio for a playback session.
///
/// `fill` receives one zeroed period buffer at a time and writes interleaved
/// samples into it in the negotiated format. Returning `true` marks that
/// buffer as the last one; it is still played.
///
/// Implemented for every `FnMut(&mut [u8]) -> bool`, so a closure is usually
/// all that is needed:
///
/// ```
/// use pcm_pipe::FillBuffer;
///
/// let mut remaining = 3;
/// let mut fill = move |buf: &mut [u8]| {
///     buf.fill(0x10);
///     remaining -= 1;
///     remaining == 0
/// };
///
/// let mut buf = [0u8; 8];
/// assert!(!fill.fill(&mut buf));
/// assert!(!fill.fill(&mut buf));
/// assert!(fill.fill(&mut buf));
/// ```
pub trait FillBuffer {
    /// Writes one period into `buf`. Returns `true` when this is the last one.
    fn fill(&mut self, buf: &mut [u8]) -> bool;
}

impl<F> FillBuffer for F
where
    F: FnMut(&mut [u8]) -> bool,
{
    fn fill(&mut self, buf: &mut [u8]) -> bool {
        self(buf)
    }
}

/// Runs on the generator thread until the callback reports completion or the
/// pool is closed.
pub(crate) fn run_generator<F: FillBuffer>(pool: &BufferPool, mut fill: F, state: &SessionState) {
    let _guard = CloseOnUnwind(pool);

    while let Some(mut slot) = pool.acquire_free_slot() {
        let done = fill.fill(slot.bytes_mut());
        state.buffers_generated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Filled slot {} (last: {})", slot.index(), done);

        pool.enqueue_filled(slot, done);
        if done {
            tracing::debug!("Generator finished");
            return;
        }
    }

    tracing::debug!("Buffer pool closed, generator stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_implements_fill_buffer() {
        let mut calls = 0;
        let mut fill = |buf: &mut [u8]| {
            calls += 1;
            buf[0] = 1;
            true
        };
        let mut buf = [0u8; 2];
        assert!(FillBuffer::fill(&mut fill, &mut buf));
        assert_eq!(buf, [1, 0]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_generator_enqueues_until_done() {
        let pool = BufferPool::new(4, 2);
        let state = SessionState::new();
        let mut n = 0u8;

        run_generator(
            &pool,
            |buf: &mut [u8]| {
                n += 1;
                buf[0] = n;
                n == 3
            },
            &state,
        );

        assert_eq!(state.snapshot().buffers_generated, 3);
        assert!(pool.is_finished());
        let first = pool.dequeue_filled().unwrap();
        let second = pool.dequeue_filled().unwrap();
        let third = pool.dequeue_filled().unwrap();
        assert_eq!(
            [first.slot.bytes()[0], second.slot.bytes()[0], third.slot.bytes()[0]],
            [1, 2, 3]
        );
        assert!(!second.last);
        assert!(third.last);
    }

    #[test]
    fn test_generator_stops_when_pool_closed() {
        let pool = BufferPool::new(2, 1);
        let state = SessionState::new();
        pool.close();

        run_generator(&pool, |_buf: &mut [u8]| false, &state);
        assert_eq!(state.snapshot().buffers_generated, 0);
    }

    #[test]
    fn test_generator_is_throttled_by_pool() {
        let pool = BufferPool::new(2, 1);
        let state = SessionState::new();

        std::thread::scope(|s| {
            s.spawn(|| run_generator(&pool, |_buf: &mut [u8]| false, &state));

            // Two slots fit; the third fill waits for a release
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert_eq!(state.snapshot().buffers_generated, 2);

            pool.close();
        });
    }
}
