//! pcm-transform - Round-trip safe PCM sample format conversion
//!
//! Converts interleaved PCM buffers between sample encodings: 8, 16, 24
//! (4 byte slot), 32 bit and packed 3 byte integers, either sign, either
//! byte order, 32 and 64 bit floats, with per-channel routing.
//!
//! # Architecture
//!
//! - `format`: sample format descriptors and channel maps
//! - `transform`: codecs, conversion plans and the [`SampleTransform`] engine
//! - `config`: serde-backed declarative setup
//! - `signal`: test signals and error measurement
//!
//! Every sample passes through a normalized f64 amplitude. Integer full
//! scales are powers of two, so conversions between integer formats of the
//! same width are exact.

pub mod config;
pub mod error;
pub mod format;
pub mod signal;
pub mod transform;

pub use config::TransformConfig;
pub use error::{ErrorKind, Result, TransformError};
pub use format::{ChannelMap, ChannelRoute, Endian, SampleFormat, SampleSign, SampleWidth};
pub use transform::{ClipPolicy, ConversionPlan, ConversionReport, SampleTransform};
