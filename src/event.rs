//! Runtime events for monitoring playback health.
//!
//! Events are non-fatal notifications about stream behavior. Playback
//! continues after events are emitted - they're for logging/metrics,
//! not error handling.

use std::sync::Arc;

use crate::format::SampleFormat;

/// Runtime events emitted during playback.
///
/// # Example
///
/// ```
/// use pcm_pipe::PlaybackEvent;
///
/// fn handle_event(event: PlaybackEvent) {
///     match event {
///         PlaybackEvent::DeviceConfigured { device, sample_rate, .. } => {
///             eprintln!("Playing on {} at {}Hz", device, sample_rate);
///         }
///         PlaybackEvent::WriteFailed { attempt, error } => {
///             eprintln!("Write attempt {} failed: {}", attempt, error);
///         }
///         PlaybackEvent::PeriodDropped { slot, error } => {
///             eprintln!("Dropped buffer {}: {}", slot, error);
///         }
///         PlaybackEvent::Finished { buffers_written } => {
///             eprintln!("Done after {} buffers", buffers_written);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Hardware parameters were committed and playback is about to start.
    DeviceConfigured {
        /// Name of the device.
        device: String,
        /// Negotiated channel count.
        channels: u32,
        /// Rate reported by the device after commit.
        sample_rate: u32,
        /// Negotiated sample format.
        format: SampleFormat,
        /// Size of every buffer handed to the fill callback.
        period_bytes: usize,
    },

    /// A device write failed. The stream is re-prepared and the write
    /// retried while retries remain.
    WriteFailed {
        /// 1-based attempt number for this buffer.
        attempt: u32,
        /// Description of the error.
        error: String,
    },

    /// A buffer could not be written after all retries and was skipped.
    PeriodDropped {
        /// Pool index of the buffer.
        slot: usize,
        /// The last write error.
        error: String,
    },

    /// The final buffer has been written.
    Finished {
        /// Buffers written over the whole session.
        buffers_written: u64,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`PlaybackBuilder::on_event()`] to
/// receive notifications about write failures and session progress.
///
/// [`PlaybackBuilder::on_event()`]: crate::PlaybackBuilder::on_event
pub type EventCallback = Arc<dyn Fn(PlaybackEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use pcm_pipe::{event_callback, PlaybackEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(PlaybackEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Sends `event` to the callback if one is configured.
pub(crate) fn emit(callback: Option<&EventCallback>, event: PlaybackEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_event_debug() {
        let event = PlaybackEvent::Finished { buffers_written: 12 };
        let debug = format!("{:?}", event);
        assert!(debug.contains("Finished"));
        assert!(debug.contains("12"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            PlaybackEvent::WriteFailed {
                attempt: 1,
                error: "buffer underrun".to_string(),
            },
        );
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_emit_without_callback() {
        emit(None, PlaybackEvent::Finished { buffers_written: 0 });
    }
}
