//! Sample Format Descriptors
//!
//! A [`SampleFormat`] fully describes one PCM encoding: sample width, sign,
//! byte order and channel count. Every format determines a fixed frame size
//! in bytes.
//!
//! Formats can also be written as text (`16bit-unsigned-bendian-stereo`)
//! and as the compact 9-bit integer used by instrument patch libraries.

pub mod channel_map;

use std::fmt;
use std::str::FromStr;

use serde::{ser, Deserialize, Serialize, Serializer};

use crate::error::{Result, TransformError};

pub use channel_map::{ChannelMap, ChannelRoute};

// ============================================================================
// Constants
// ============================================================================

/// Largest channel count expressible in packed format integers and channel maps
pub const MAX_PACKED_CHANNELS: u16 = 8;

const WIDTH_MASK: u16 = 0x00F;
const CHANNEL_MASK: u16 = 0x070;
const CHANNEL_SHIFT: u16 = 4;
const UNSIGNED_BIT: u16 = 0x080;
const BIG_ENDIAN_BIT: u16 = 0x100;
const FORMAT_MASK: u16 = 0x1FF;

// ============================================================================
// Width / Sign / Endian
// ============================================================================

/// Numeric encoding of a single channel sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleWidth {
    /// 8 bit integer
    Bit8,
    /// 16 bit integer
    Bit16,
    /// 24 bit integer stored in a 4 byte slot
    Bit24,
    /// 32 bit integer
    Bit32,
    /// 32 bit IEEE float, full scale -1.0 to 1.0
    Float,
    /// 64 bit IEEE float, full scale -1.0 to 1.0
    Double,
    /// 24 bit integer packed into 3 bytes
    Real24,
}

impl SampleWidth {
    /// Every width, in packed code order
    pub const ALL: [SampleWidth; 7] = [
        SampleWidth::Bit8,
        SampleWidth::Bit16,
        SampleWidth::Bit24,
        SampleWidth::Bit32,
        SampleWidth::Float,
        SampleWidth::Double,
        SampleWidth::Real24,
    ];

    /// Bytes used to store one sample (not the effective precision)
    pub fn byte_size(self) -> usize {
        match self {
            SampleWidth::Bit8 => 1,
            SampleWidth::Bit16 => 2,
            SampleWidth::Real24 => 3,
            SampleWidth::Bit24 | SampleWidth::Bit32 | SampleWidth::Float => 4,
            SampleWidth::Double => 8,
        }
    }

    /// Effective precision in bits
    ///
    /// Only meaningful for comparing formats. Float reports 23 so that it
    /// ranks just below 24 bit integers.
    pub fn bit_width(self) -> u32 {
        match self {
            SampleWidth::Bit8 => 8,
            SampleWidth::Bit16 => 16,
            SampleWidth::Bit24 | SampleWidth::Real24 => 24,
            SampleWidth::Bit32 => 32,
            SampleWidth::Float => 23,
            SampleWidth::Double => 52,
        }
    }

    /// Whether samples are IEEE floating point
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, SampleWidth::Float | SampleWidth::Double)
    }

    /// Integer value corresponding to an amplitude of 1.0
    ///
    /// This is 2^(bits - 1) for integer widths and 1.0 for floats.
    pub fn full_scale(self) -> f64 {
        match self {
            SampleWidth::Bit8 => 128.0,
            SampleWidth::Bit16 => 32_768.0,
            SampleWidth::Bit24 | SampleWidth::Real24 => 8_388_608.0,
            SampleWidth::Bit32 => 2_147_483_648.0,
            SampleWidth::Float | SampleWidth::Double => 1.0,
        }
    }

    fn code(self) -> u16 {
        match self {
            SampleWidth::Bit8 => 1,
            SampleWidth::Bit16 => 2,
            SampleWidth::Bit24 => 3,
            SampleWidth::Bit32 => 4,
            SampleWidth::Float => 5,
            SampleWidth::Double => 6,
            SampleWidth::Real24 => 7,
        }
    }

    fn from_code(code: u16) -> Option<Self> {
        SampleWidth::ALL.into_iter().find(|w| w.code() == code)
    }

    fn name(self) -> &'static str {
        match self {
            SampleWidth::Bit8 => "8bit",
            SampleWidth::Bit16 => "16bit",
            SampleWidth::Bit24 => "24bit",
            SampleWidth::Bit32 => "32bit",
            SampleWidth::Float => "float",
            SampleWidth::Double => "double",
            SampleWidth::Real24 => "real24bit",
        }
    }
}

/// Sign of integer samples
///
/// Unsigned samples are offset by half the representable range, so for
/// unsigned 8 bit audio 128 is silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleSign {
    #[default]
    Signed,
    Unsigned,
}

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Byte order of the host
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;

    /// Byte order of the host
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;
}

// ============================================================================
// Sample Format
// ============================================================================

/// Complete description of one PCM encoding
///
/// Sign is ignored for float widths and byte order is ignored for 8 bit
/// widths; [`SampleFormat::canonical`] normalizes those fields so that
/// descriptors for identical byte layouts compare equal.
///
/// Serialized as its textual name. Serializing a format that fails
/// [`SampleFormat::validate`] is an error, since the name could not be read
/// back.
///
/// # Example
/// ```
/// use pcm_transform::format::{SampleFormat, SampleWidth};
///
/// let format = SampleFormat::new(SampleWidth::Bit16).unsigned().big_endian().with_channels(2);
/// assert_eq!(format.frame_size(), 4);
/// assert_eq!(format.to_string(), "16bit-unsigned-bendian-stereo");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct SampleFormat {
    width: SampleWidth,
    sign: SampleSign,
    endian: Endian,
    channels: u16,
}

impl SampleFormat {
    /// Create a mono, signed, little endian format of the given width
    pub fn new(width: SampleWidth) -> Self {
        Self {
            width,
            sign: SampleSign::Signed,
            endian: Endian::Little,
            channels: 1,
        }
    }

    /// Set the channel count
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Set the sign
    pub fn with_sign(mut self, sign: SampleSign) -> Self {
        self.sign = sign;
        self
    }

    /// Set the byte order
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Shorthand for `with_sign(SampleSign::Unsigned)`
    pub fn unsigned(self) -> Self {
        self.with_sign(SampleSign::Unsigned)
    }

    /// Shorthand for `with_endian(Endian::Big)`
    pub fn big_endian(self) -> Self {
        self.with_endian(Endian::Big)
    }

    /// Shorthand for `with_endian(Endian::NATIVE)`
    pub fn native(self) -> Self {
        self.with_endian(Endian::NATIVE)
    }

    #[inline]
    pub fn width(&self) -> SampleWidth {
        self.width
    }

    #[inline]
    pub fn sign(&self) -> SampleSign {
        self.sign
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels as usize
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.width.is_float()
    }

    /// Signed integer or float
    #[inline]
    pub fn is_signed(&self) -> bool {
        self.is_float() || self.sign == SampleSign::Signed
    }

    /// Big endian multi-byte samples (never true for 8 bit)
    #[inline]
    pub fn is_big_endian(&self) -> bool {
        self.width != SampleWidth::Bit8 && self.endian == Endian::Big
    }

    /// Bytes per channel sample
    #[inline]
    pub fn sample_size(&self) -> usize {
        self.width.byte_size()
    }

    /// Bytes per frame (sample size times channels)
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.sample_size() * self.channels()
    }

    /// Effective precision in bits, see [`SampleWidth::bit_width`]
    #[inline]
    pub fn bit_width(&self) -> u32 {
        self.width.bit_width()
    }

    /// Rewrite ignored fields: floats become signed, 8 bit becomes little endian
    pub fn canonical(self) -> Self {
        let sign = if self.is_float() {
            SampleSign::Signed
        } else {
            self.sign
        };
        let endian = if self.width == SampleWidth::Bit8 {
            Endian::Little
        } else {
            self.endian
        };
        Self {
            sign,
            endian,
            ..self
        }
    }

    /// Check that the format can describe a buffer
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(TransformError::invalid_format(format!(
                "{} has zero channels",
                self.width.name()
            )));
        }
        Ok(())
    }

    /// Encode as a packed 9-bit format integer
    ///
    /// Layout: bits 0-3 width code, bits 4-6 channel count - 1, bit 7
    /// unsigned, bit 8 big endian. Fails for more than
    /// [`MAX_PACKED_CHANNELS`] channels.
    pub fn to_bits(&self) -> Result<u16> {
        self.validate()?;
        if self.channels > MAX_PACKED_CHANNELS {
            return Err(TransformError::invalid_format(format!(
                "{} channels do not fit a packed format (max {})",
                self.channels, MAX_PACKED_CHANNELS
            )));
        }

        let canonical = self.canonical();
        let mut bits = canonical.width.code() | ((canonical.channels - 1) << CHANNEL_SHIFT);
        if canonical.sign == SampleSign::Unsigned {
            bits |= UNSIGNED_BIT;
        }
        if canonical.endian == Endian::Big {
            bits |= BIG_ENDIAN_BIT;
        }
        Ok(bits)
    }

    /// Decode a packed 9-bit format integer
    pub fn from_bits(bits: u16) -> Result<Self> {
        if bits & !FORMAT_MASK != 0 {
            return Err(TransformError::invalid_format(format!(
                "packed format {bits:#x} has bits outside {FORMAT_MASK:#x}"
            )));
        }

        let width = SampleWidth::from_code(bits & WIDTH_MASK).ok_or_else(|| {
            TransformError::invalid_format(format!(
                "packed format {bits:#x} has unknown width code {}",
                bits & WIDTH_MASK
            ))
        })?;

        let sign = if bits & UNSIGNED_BIT != 0 {
            SampleSign::Unsigned
        } else {
            SampleSign::Signed
        };
        let endian = if bits & BIG_ENDIAN_BIT != 0 {
            Endian::Big
        } else {
            Endian::Little
        };
        let channels = ((bits & CHANNEL_MASK) >> CHANNEL_SHIFT) + 1;

        Ok(Self {
            width,
            sign,
            endian,
            channels,
        })
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.width.name())?;

        if !self.is_float() {
            match self.sign {
                SampleSign::Signed => write!(f, "-signed")?,
                SampleSign::Unsigned => write!(f, "-unsigned")?,
            }
        }

        if self.width != SampleWidth::Bit8 {
            match self.endian {
                Endian::Little => write!(f, "-lendian")?,
                Endian::Big => write!(f, "-bendian")?,
            }
        }

        match self.channels {
            1 => Ok(()),
            2 => write!(f, "-stereo"),
            n => write!(f, "-{n}ch"),
        }
    }
}

impl FromStr for SampleFormat {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens = s.trim().split('-');

        let width_token = tokens.next().unwrap_or_default();
        let width = SampleWidth::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(width_token))
            .ok_or_else(|| {
                TransformError::invalid_format(format!("unknown sample width '{width_token}'"))
            })?;

        let mut sign = None;
        let mut endian = None;
        let mut channels = None;

        for token in tokens {
            let token = token.to_ascii_lowercase();
            let (repeated, field) = match token.as_str() {
                "signed" => (sign.replace(SampleSign::Signed).is_some(), "sign"),
                "unsigned" => (sign.replace(SampleSign::Unsigned).is_some(), "sign"),
                "lendian" => (endian.replace(Endian::Little).is_some(), "byte order"),
                "bendian" => (endian.replace(Endian::Big).is_some(), "byte order"),
                "mono" => (channels.replace(1).is_some(), "channel count"),
                "stereo" => (channels.replace(2).is_some(), "channel count"),
                other => {
                    let count = other
                        .strip_suffix("ch")
                        .and_then(|n| n.parse::<u16>().ok())
                        .filter(|&n| n > 0)
                        .ok_or_else(|| {
                            TransformError::invalid_format(format!(
                                "unknown format token '{other}' in '{s}'"
                            ))
                        })?;
                    (channels.replace(count).is_some(), "channel count")
                }
            };
            if repeated {
                return Err(TransformError::invalid_format(format!(
                    "{field} given twice in '{s}'"
                )));
            }
        }

        Ok(Self {
            width,
            sign: sign.unwrap_or_default(),
            endian: endian.unwrap_or_default(),
            channels: channels.unwrap_or(1),
        })
    }
}

impl TryFrom<String> for SampleFormat {
    type Error = TransformError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Serialize for SampleFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.validate().map_err(ser::Error::custom)?;
        serializer.collect_str(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
