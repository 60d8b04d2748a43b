//! Encoding normalized samples into raw PCM bytes.

use super::SampleFormat;

/// Encodes one normalized sample into `out` using `format`.
///
/// `value` should be in the range [-1.0, 1.0]; values outside it are
/// clamped. Integer formats use symmetric scaling (× `MAX`, not × `MAX + 1`),
/// so -1.0 maps one step above the type's minimum. Unsigned formats are
/// offset so that 0.0 lands on the midpoint.
///
/// # Panics
///
/// Panics if `out` is shorter than [`SampleFormat::byte_width`].
pub fn encode_sample(format: SampleFormat, value: f64, out: &mut [u8]) {
    let v = value.clamp(-1.0, 1.0);
    let big = format.is_big_endian();

    match format {
        SampleFormat::S8 => out[0] = ((v * f64::from(i8::MAX)) as i8).to_ne_bytes()[0],
        SampleFormat::U8 => out[0] = ((v * f64::from(i8::MAX)) as i16 + 128) as u8,
        SampleFormat::S16Le | SampleFormat::S16Be => {
            let s = (v * f64::from(i16::MAX)) as i16;
            put(out, s.to_le_bytes(), s.to_be_bytes(), big);
        }
        SampleFormat::U16Le | SampleFormat::U16Be => {
            let s = ((v * f64::from(i16::MAX)) as i32 + 32_768) as u16;
            put(out, s.to_le_bytes(), s.to_be_bytes(), big);
        }
        SampleFormat::S24Le | SampleFormat::S24Be => {
            let s = (v * f64::from(I24_MAX)) as i32;
            put_24(out, s.to_le_bytes(), big);
        }
        SampleFormat::U24Le | SampleFormat::U24Be => {
            let s = ((v * f64::from(I24_MAX)) as i32 + 8_388_608) as u32;
            put_24(out, s.to_le_bytes(), big);
        }
        SampleFormat::S32Le | SampleFormat::S32Be => {
            let s = (v * f64::from(i32::MAX)) as i32;
            put(out, s.to_le_bytes(), s.to_be_bytes(), big);
        }
        SampleFormat::U32Le | SampleFormat::U32Be => {
            let s = ((v * f64::from(i32::MAX)) as i64 + 2_147_483_648) as u32;
            put(out, s.to_le_bytes(), s.to_be_bytes(), big);
        }
        SampleFormat::FloatLe | SampleFormat::FloatBe => {
            let s = v as f32;
            put(out, s.to_le_bytes(), s.to_be_bytes(), big);
        }
        SampleFormat::Float64Le | SampleFormat::Float64Be => {
            put(out, v.to_le_bytes(), v.to_be_bytes(), big);
        }
    }
}

/// Writes `value` into every channel of one interleaved frame.
///
/// # Panics
///
/// Panics if `frame` is shorter than `channels × byte_width`.
pub fn encode_frame(format: SampleFormat, channels: usize, value: f64, frame: &mut [u8]) {
    let width = format.byte_width();
    for sample in frame[..channels * width].chunks_exact_mut(width) {
        encode_sample(format, value, sample);
    }
}

/// Largest 24-bit signed value.
const I24_MAX: i32 = 8_388_607;

#[inline]
fn put<const N: usize>(out: &mut [u8], le: [u8; N], be: [u8; N], big: bool) {
    out[..N].copy_from_slice(if big { &be } else { &le });
}

/// Packs the low three bytes of a little-endian 32-bit word.
#[inline]
fn put_24(out: &mut [u8], le: [u8; 4], big: bool) {
    if big {
        out[..3].copy_from_slice(&[le[2], le[1], le[0]]);
    } else {
        out[..3].copy_from_slice(&le[..3]);
    }
}
