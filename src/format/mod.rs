//! Sample formats and PCM encoding.
//!
//! This module provides:
//! - The sample format table (byte width, signedness, endianness)
//! - Encoding of normalized `f64` samples into any supported format

mod convert;
mod sample;

pub use convert::{encode_frame, encode_sample};
pub use sample::{byte_width, SampleFormat};
