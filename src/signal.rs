//! Signal Helpers
//!
//! Test signals and measurements for checking conversions: a periodic sine
//! generator, packing of f64 samples to and from double format bytes, error
//! measurement and channel (de)interleaving.

use crate::format::Endian;

/// Generate a sine wave that repeats every `period` frames
///
/// Sample `i` is `sin((i mod period) / period * 2pi)`, so the signal covers
/// the full [-1.0, 1.0] range without depending on a sample rate.
///
/// # Arguments
/// * `frames` - Number of samples to generate
/// * `period` - Length of one cycle in samples
///
/// # Returns
/// A mono signal of `frames` samples. Empty when `period` is 0.
pub fn periodic_sine(frames: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }

    let period = period as f64;
    (0..frames)
        .map(|i| ((i as f64 % period) / period * std::f64::consts::TAU).sin())
        .collect()
}

/// Pack samples as double format bytes in the given byte order
pub fn f64s_to_bytes(samples: &[f64], endian: Endian) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| match endian {
            Endian::Little => s.to_le_bytes(),
            Endian::Big => s.to_be_bytes(),
        })
        .collect()
}

/// Unpack double format bytes, ignoring a trailing partial sample
pub fn bytes_to_f64s(bytes: &[u8], endian: Endian) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            match endian {
                Endian::Little => f64::from_le_bytes(raw),
                Endian::Big => f64::from_be_bytes(raw),
            }
        })
        .collect()
}

/// Find the largest absolute difference between two signals
///
/// # Arguments
/// * `expected` - Reference signal
/// * `actual` - Signal to compare, only the overlapping length is checked
///
/// # Returns
/// The difference and the index where it occurs. `(0.0, 0)` for empty input.
pub fn max_abs_diff(expected: &[f64], actual: &[f64]) -> (f64, usize) {
    expected
        .iter()
        .zip(actual)
        .map(|(a, b)| (a - b).abs())
        .enumerate()
        .fold((0.0, 0), |(max, at), (i, diff)| {
            if diff > max {
                (diff, i)
            } else {
                (max, at)
            }
        })
}

/// Largest absolute amplitude in a signal, 0.0 when empty
pub fn calculate_peak(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s.abs()).fold(0.0, f64::max)
}

/// Split an interleaved signal into one vector per channel
pub fn deinterleave(samples: &[f64], channels: usize) -> Vec<Vec<f64>> {
    if channels == 0 {
        return Vec::new();
    }

    let mut result = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, &sample) in result.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    result
}

/// Interleave per-channel vectors, stopping at the shortest channel
pub fn interleave(channels: &[Vec<f64>]) -> Vec<f64> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut result = Vec::with_capacity(frames * channels.len());
    for i in 0..frames {
        result.extend(channels.iter().map(|channel| channel[i]));
    }
    result
}
