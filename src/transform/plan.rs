//! Conversion plans
//!
//! A plan is resolved once per configuration and tells the converter which
//! inner loop to run.

use std::fmt;

use crate::format::{ChannelMap, SampleFormat};
use crate::transform::codec::SampleCodec;

/// Inner loop selected for a (source, destination, channel map) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionPlan {
    /// Source and destination share a byte layout and channels pass straight
    /// through, so bytes are copied verbatim
    Copy,
    /// Decode every sample to a normalized amplitude, route channels, then
    /// encode
    Requantize {
        decoder: SampleCodec,
        encoder: SampleCodec,
    },
}

impl ConversionPlan {
    /// Pick the plan for a validated conversion
    pub fn resolve(source: &SampleFormat, dest: &SampleFormat, map: &ChannelMap) -> Self {
        let source = source.canonical();
        let dest = dest.canonical();

        if source == dest && map.is_identity(source.channels()) {
            return ConversionPlan::Copy;
        }

        ConversionPlan::Requantize {
            decoder: SampleCodec::for_format(&source),
            encoder: SampleCodec::for_format(&dest),
        }
    }

    #[inline]
    pub fn is_copy(&self) -> bool {
        matches!(self, ConversionPlan::Copy)
    }
}

impl fmt::Display for ConversionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionPlan::Copy => write!(f, "Copy"),
            ConversionPlan::Requantize { .. } => write!(f, "Requantize"),
        }
    }
}
