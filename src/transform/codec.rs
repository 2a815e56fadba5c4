//! Sample Codecs
//!
//! Decoding turns the bytes of one sample into a normalized amplitude where
//! 1.0 is integer full scale (2^(bits - 1)). Encoding goes the other way,
//! rounding to the nearest integer step and clamping to the destination
//! range.
//!
//! All integer scales are powers of two, so decoding and re-encoding an
//! integer sample at the same or a wider width is exact.

use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

use crate::format::{Endian, SampleFormat, SampleSign, SampleWidth};

/// What to do when an amplitude does not fit the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipPolicy {
    /// Clamp to full scale without reporting
    #[default]
    Clamp,
    /// Clamp, finish the conversion, then report how many samples were clamped
    Strict,
}

/// Byte layout of one sample, resolved once from a [`SampleFormat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleCodec {
    /// Two's complement or offset-binary integer
    Int {
        /// One of the integer widths
        width: SampleWidth,
        unsigned: bool,
        big_endian: bool,
    },
    /// IEEE 754 single precision
    F32 { big_endian: bool },
    /// IEEE 754 double precision
    F64 { big_endian: bool },
}

impl SampleCodec {
    /// Resolve the codec for a format's width, sign and byte order
    pub fn for_format(format: &SampleFormat) -> Self {
        let format = format.canonical();
        let big_endian = format.endian() == Endian::Big;
        let unsigned = format.sign() == SampleSign::Unsigned;

        match format.width() {
            SampleWidth::Float => SampleCodec::F32 { big_endian },
            SampleWidth::Double => SampleCodec::F64 { big_endian },
            width => SampleCodec::Int {
                width,
                unsigned,
                big_endian,
            },
        }
    }

    /// Bytes per encoded sample
    pub fn sample_size(&self) -> usize {
        match *self {
            SampleCodec::Int { width, .. } => width.byte_size(),
            SampleCodec::F32 { .. } => 4,
            SampleCodec::F64 { .. } => 8,
        }
    }

    /// Decode one sample
    ///
    /// `bytes` must be exactly [`SampleCodec::sample_size`] long.
    #[inline]
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        match *self {
            SampleCodec::Int {
                width,
                unsigned,
                big_endian,
            } => {
                let bits = width.bit_width();
                let full_scale = width.full_scale();
                let raw = read_uint(bytes, big_endian) & low_mask(bits);
                let value = if unsigned {
                    raw as i64 - full_scale as i64
                } else {
                    sign_extend(raw, bits)
                };
                value as f64 / full_scale
            }
            SampleCodec::F32 { big_endian } => {
                f32::from_bits(read_uint(bytes, big_endian) as u32) as f64
            }
            SampleCodec::F64 { big_endian } => f64::from_bits(read_uint(bytes, big_endian)),
        }
    }

    /// Encode one sample, returning true if it had to be clamped
    ///
    /// `out` must be exactly [`SampleCodec::sample_size`] long.
    #[inline]
    pub fn encode(&self, amplitude: f64, out: &mut [u8]) -> bool {
        match *self {
            SampleCodec::Int {
                width,
                unsigned,
                big_endian,
            } => {
                let full_scale = width.full_scale();
                let (value, clipped) = quantize(amplitude, full_scale);
                let raw = if unsigned {
                    (value + full_scale as i64) as u64
                } else {
                    // keeps sign extension in the pad byte of 24 bit slots
                    value as u64 & low_mask(width.byte_size() as u32 * 8)
                };
                write_uint(raw, out, big_endian);
                clipped
            }
            SampleCodec::F32 { big_endian } => {
                let (value, clipped) = narrow_float::<f32>(amplitude);
                write_uint(value.to_bits() as u64, out, big_endian);
                clipped
            }
            SampleCodec::F64 { big_endian } => {
                write_uint(amplitude.to_bits(), out, big_endian);
                false
            }
        }
    }

    /// Decode consecutive samples from `src` into `out`
    pub fn decode_into(&self, src: &[u8], out: &mut [f64]) {
        for (bytes, amplitude) in src.chunks_exact(self.sample_size()).zip(out.iter_mut()) {
            *amplitude = self.decode(bytes);
        }
    }

    /// Encoded bytes of a zero amplitude (the bias value for unsigned formats)
    pub fn silence(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.sample_size()];
        self.encode(0.0, &mut bytes);
        bytes
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

#[inline]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[inline]
fn sign_extend(raw: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

#[inline]
fn read_uint(bytes: &[u8], big_endian: bool) -> u64 {
    if big_endian {
        bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
    } else {
        bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }
}

#[inline]
fn write_uint(mut value: u64, out: &mut [u8], big_endian: bool) {
    if big_endian {
        for byte in out.iter_mut().rev() {
            *byte = value as u8;
            value >>= 8;
        }
    } else {
        for byte in out.iter_mut() {
            *byte = value as u8;
            value >>= 8;
        }
    }
}

/// Scale an amplitude to a signed integer, clamping to [-full_scale, full_scale - 1]
#[inline]
fn quantize(amplitude: f64, full_scale: f64) -> (i64, bool) {
    if amplitude.is_nan() {
        return (0, true);
    }

    let scaled = (amplitude * full_scale).round();
    let clamped = num_traits::clamp(scaled, -full_scale, full_scale - 1.0);
    (clamped as i64, clamped != scaled)
}

/// Narrow an amplitude to a smaller float type, saturating at its finite range
fn narrow_float<F: Float>(amplitude: f64) -> (F, bool) {
    match <F as NumCast>::from(amplitude) {
        Some(value) if !(value.is_infinite() && amplitude.is_finite()) => (value, false),
        _ => {
            let max = F::max_value();
            let value = if amplitude.is_sign_negative() { -max } else { max };
            (value, true)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
