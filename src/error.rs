//! Error types for pcm-pipe.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`PlaybackError`]): Prevent playback from starting, or
//!   end a session abnormally
//! - **Device errors** ([`DeviceError`]): Reported by a driver; during playback
//!   they are recovered locally and surfaced via
//!   [`EventCallback`](crate::EventCallback)

/// Fatal errors returned from [`play()`](crate::play) and
/// [`PlaybackBuilder::play()`](crate::PlaybackBuilder::play).
///
/// Setup errors mean no audio was written. Transient write failures never
/// show up here; they are recovered by re-preparing the stream.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The playback configuration is unusable.
    #[error("invalid playback config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The playback device could not be opened.
    #[error("can't open PCM device \"{name}\": {reason}")]
    DeviceOpen {
        /// Name of the device that was requested.
        name: String,
        /// Reason reported by the driver.
        reason: String,
    },

    /// The device does not support interleaved read/write access.
    #[error("access mode {access} not supported by the device")]
    UnsupportedAccess {
        /// The requested access mode.
        access: String,
    },

    /// The requested sample format is not supported by the device.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// The requested sample rate is not supported by the device.
    #[error("sample rate {requested}Hz not supported")]
    UnsupportedRate {
        /// The requested sample rate.
        requested: u32,
    },

    /// The requested channel count is not supported by the device.
    #[error("{requested} channel(s) not supported")]
    UnsupportedChannels {
        /// The requested channel count.
        requested: u32,
    },

    /// A sample format name or index does not match any known format.
    #[error("unknown sample format: {value}")]
    UnknownFormat {
        /// The value that failed to parse.
        value: String,
    },

    /// Applying the negotiated hardware parameters failed.
    #[error("failed to apply hardware parameters: {reason}")]
    Commit {
        /// Reason reported by the driver.
        reason: String,
    },

    /// A pipeline thread could not be started.
    #[error("failed to spawn {thread} thread: {source}")]
    ThreadSpawn {
        /// Name of the thread.
        thread: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The fill callback panicked.
    #[error("generator panicked: {message}")]
    GeneratorPanicked {
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The device write loop panicked.
    #[error("drain thread panicked: {message}")]
    DrainPanicked {
        /// Panic payload, if it was a string.
        message: String,
    },

    /// A background playback task failed to complete.
    #[error("playback task failed: {0}")]
    TaskFailed(String),

    /// An error from the underlying audio library.
    #[error("audio backend error: {0}")]
    BackendError(String),
}

impl PlaybackError {
    /// Creates an invalid config error with the given reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Builds the matching panic variant from a thread's panic payload.
    pub(crate) fn from_panic(thread: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        if thread == crate::session::GENERATOR_THREAD {
            Self::GeneratorPanicked { message }
        } else {
            Self::DrainPanicked { message }
        }
    }
}

/// Errors reported by a [`PcmDevice`](crate::device::PcmDevice) or
/// [`PcmDriver`](crate::device::PcmDriver).
///
/// During playback these are recoverable: the drain loop re-prepares the
/// stream and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The driver ran out of data and stopped the stream.
    #[error("buffer underrun")]
    Underrun,

    /// A write call failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The driver refused a hardware parameter value.
    #[error("rejected {parameter}")]
    Rejected {
        /// Which parameter was refused.
        parameter: String,
    },

    /// Any other driver error.
    #[error("{0}")]
    Backend(String),
}

impl DeviceError {
    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a rejected-parameter error.
    pub fn rejected(parameter: impl Into<String>) -> Self {
        Self::Rejected {
            parameter: parameter.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_error_display() {
        let err = PlaybackError::DeviceOpen {
            name: "hw:9".to_string(),
            reason: "No such device".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "can't open PCM device \"hw:9\": No such device"
        );
    }

    #[test]
    fn test_unsupported_channels_display() {
        let err = PlaybackError::UnsupportedChannels { requested: 6 };
        assert_eq!(err.to_string(), "6 channel(s) not supported");
    }

    #[test]
    fn test_invalid_config_helper() {
        let err = PlaybackError::invalid_config("pool_size must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid playback config: pool_size must be at least 1"
        );
    }

    #[test]
    fn test_from_panic_str_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = PlaybackError::from_panic(crate::session::GENERATOR_THREAD, payload.as_ref());
        assert!(matches!(err, PlaybackError::GeneratorPanicked { ref message } if message == "boom"));
    }

    #[test]
    fn test_from_panic_string_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("write loop"));
        let err = PlaybackError::from_panic(crate::session::DRAIN_THREAD, payload.as_ref());
        assert!(matches!(err, PlaybackError::DrainPanicked { ref message } if message == "write loop"));
    }

    #[test]
    fn test_device_error_write_failed() {
        let err = DeviceError::write_failed("broken pipe");
        assert_eq!(err.to_string(), "write failed: broken pipe");
    }
}
