//! Sample Transform Engine
//!
//! Converts interleaved PCM buffers between sample formats through a
//! normalized f64 amplitude, in blocks bounded by a reusable staging area.

pub mod codec;
pub mod converter;
pub mod plan;

pub use codec::{ClipPolicy, SampleCodec};
pub use converter::{ConversionReport, SampleTransform, DEFAULT_STAGING_BYTES};
pub use plan::ConversionPlan;
