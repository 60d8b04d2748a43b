//! Sample format table.

use std::fmt;
use std::str::FromStr;

use crate::PlaybackError;

/// Encoding of a single PCM sample: signedness, bit width and endianness.
///
/// Every variant has a fixed byte width; see [`SampleFormat::byte_width`].
/// The 24-bit variants use the packed three-byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Signed 8 bit.
    S8,
    /// Unsigned 8 bit.
    U8,
    /// Signed 16 bit little endian.
    S16Le,
    /// Signed 16 bit big endian.
    S16Be,
    /// Unsigned 16 bit little endian.
    U16Le,
    /// Unsigned 16 bit big endian.
    U16Be,
    /// Signed 24 bit little endian, three bytes.
    S24Le,
    /// Signed 24 bit big endian, three bytes.
    S24Be,
    /// Unsigned 24 bit little endian, three bytes.
    U24Le,
    /// Unsigned 24 bit big endian, three bytes.
    U24Be,
    /// Signed 32 bit little endian.
    S32Le,
    /// Signed 32 bit big endian.
    S32Be,
    /// Unsigned 32 bit little endian.
    U32Le,
    /// Unsigned 32 bit big endian.
    U32Be,
    /// 32 bit float little endian, range -1.0 to 1.0.
    #[default]
    FloatLe,
    /// 32 bit float big endian, range -1.0 to 1.0.
    FloatBe,
    /// 64 bit float little endian, range -1.0 to 1.0.
    Float64Le,
    /// 64 bit float big endian, range -1.0 to 1.0.
    Float64Be,
}

impl SampleFormat {
    /// All formats, in index order.
    pub const ALL: [Self; 18] = [
        Self::S8,
        Self::U8,
        Self::S16Le,
        Self::S16Be,
        Self::U16Le,
        Self::U16Be,
        Self::S24Le,
        Self::S24Be,
        Self::U24Le,
        Self::U24Be,
        Self::S32Le,
        Self::S32Be,
        Self::U32Le,
        Self::U32Be,
        Self::FloatLe,
        Self::FloatBe,
        Self::Float64Le,
        Self::Float64Be,
    ];

    /// Size of one sample in bytes.
    #[must_use]
    pub const fn byte_width(self) -> usize {
        match self {
            Self::S8 | Self::U8 => 1,
            Self::S16Le | Self::S16Be | Self::U16Le | Self::U16Be => 2,
            Self::S24Le | Self::S24Be | Self::U24Le | Self::U24Be => 3,
            Self::S32Le
            | Self::S32Be
            | Self::U32Le
            | Self::U32Be
            | Self::FloatLe
            | Self::FloatBe => 4,
            Self::Float64Le | Self::Float64Be => 8,
        }
    }

    /// Significant bits per sample.
    #[must_use]
    pub const fn bits(self) -> u32 {
        // byte_width is at most 8
        #[allow(clippy::cast_possible_truncation)]
        let width = self.byte_width() as u32;
        width * 8
    }

    /// Returns `true` for the IEEE float formats.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            Self::FloatLe | Self::FloatBe | Self::Float64Le | Self::Float64Be
        )
    }

    /// Returns `true` for signed integer and float formats.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        !matches!(
            self,
            Self::U8 | Self::U16Le | Self::U16Be | Self::U24Le | Self::U24Be | Self::U32Le | Self::U32Be
        )
    }

    /// Returns `true` for big-endian multi-byte formats.
    #[must_use]
    pub const fn is_big_endian(self) -> bool {
        matches!(
            self,
            Self::S16Be
                | Self::U16Be
                | Self::S24Be
                | Self::U24Be
                | Self::S32Be
                | Self::U32Be
                | Self::FloatBe
                | Self::Float64Be
        )
    }

    /// Conventional name, e.g. `S16_LE`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::S8 => "S8",
            Self::U8 => "U8",
            Self::S16Le => "S16_LE",
            Self::S16Be => "S16_BE",
            Self::U16Le => "U16_LE",
            Self::U16Be => "U16_BE",
            Self::S24Le => "S24_LE",
            Self::S24Be => "S24_BE",
            Self::U24Le => "U24_LE",
            Self::U24Be => "U24_BE",
            Self::S32Le => "S32_LE",
            Self::S32Be => "S32_BE",
            Self::U32Le => "U32_LE",
            Self::U32Be => "U32_BE",
            Self::FloatLe => "FLOAT_LE",
            Self::FloatBe => "FLOAT_BE",
            Self::Float64Le => "FLOAT64_LE",
            Self::Float64Be => "FLOAT64_BE",
        }
    }
}

/// Size of one sample of `format` in bytes.
#[must_use]
pub const fn byte_width(format: SampleFormat) -> usize {
    format.byte_width()
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for SampleFormat {
    type Error = PlaybackError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| PlaybackError::UnknownFormat {
                value: index.to_string(),
            })
    }
}

impl FromStr for SampleFormat {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlaybackError::UnknownFormat {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_widths() {
        assert_eq!(byte_width(SampleFormat::S16Le), 2);
        assert_eq!(byte_width(SampleFormat::FloatLe), 4);
        assert_eq!(byte_width(SampleFormat::Float64Le), 8);
    }

    #[test]
    fn test_width_table() {
        let expected = [1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 8, 8];
        let widths: Vec<usize> = SampleFormat::ALL.iter().map(|f| f.byte_width()).collect();
        assert_eq!(widths, expected);
    }

    #[test]
    fn test_try_from_index() {
        assert_eq!(SampleFormat::try_from(0).unwrap(), SampleFormat::S8);
        assert_eq!(SampleFormat::try_from(14).unwrap(), SampleFormat::FloatLe);
        assert_eq!(SampleFormat::try_from(17).unwrap(), SampleFormat::Float64Be);
    }

    #[test]
    fn test_try_from_out_of_range() {
        let err = SampleFormat::try_from(18).unwrap_err();
        assert!(matches!(err, PlaybackError::UnknownFormat { ref value } if value == "18"));
    }

    #[test]
    fn test_parse_name() {
        assert_eq!("S16_LE".parse::<SampleFormat>().unwrap(), SampleFormat::S16Le);
        assert_eq!("float64_be".parse::<SampleFormat>().unwrap(), SampleFormat::Float64Be);
        assert!("S20_LE".parse::<SampleFormat>().is_err());
    }

    #[test]
    fn test_display_matches_name() {
        for format in SampleFormat::ALL {
            assert_eq!(format.to_string().parse::<SampleFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_classification() {
        assert!(SampleFormat::FloatBe.is_float());
        assert!(SampleFormat::FloatBe.is_big_endian());
        assert!(!SampleFormat::U24Le.is_signed());
        assert!(SampleFormat::S8.is_signed());
        assert!(!SampleFormat::S8.is_big_endian());
        assert_eq!(SampleFormat::S24Be.bits(), 24);
    }

    #[test]
    fn test_default_is_float_le() {
        assert_eq!(SampleFormat::default(), SampleFormat::FloatLe);
    }
}
