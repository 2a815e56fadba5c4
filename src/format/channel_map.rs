//! Channel routing between source and destination frames
//!
//! A [`ChannelMap`] holds one [`ChannelRoute`] per destination channel. Routes
//! may repeat a source channel (fan-out) or emit silence, and source channels
//! may go unused (drop).

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::format::MAX_PACKED_CHANNELS;

const PACKED_BITS_PER_CHANNEL: u32 = 3;
const PACKED_CHANNEL_MASK: u32 = 0x07;
const PACKED_MAP_MASK: u32 = 0xFF_FFFF;

/// Where one destination channel takes its samples from
///
/// Serialized as the source index, or `null` for silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<usize>", into = "Option<usize>")]
pub enum ChannelRoute {
    /// Copy the given source channel
    Source(usize),
    /// Emit zero amplitude
    Silence,
}

impl From<Option<usize>> for ChannelRoute {
    fn from(value: Option<usize>) -> Self {
        value.map_or(ChannelRoute::Silence, ChannelRoute::Source)
    }
}

impl From<ChannelRoute> for Option<usize> {
    fn from(route: ChannelRoute) -> Self {
        match route {
            ChannelRoute::Source(index) => Some(index),
            ChannelRoute::Silence => None,
        }
    }
}

/// Per-destination-channel routing table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMap {
    routes: Vec<ChannelRoute>,
}

impl ChannelMap {
    /// Packed map routing each of 8 channels to itself
    pub const UNITY_PACKED: u32 = 0xFA_C688;

    /// Route every channel to the same index
    pub fn identity(channels: usize) -> Self {
        (0..channels).map(ChannelRoute::Source).collect()
    }

    pub fn new(routes: Vec<ChannelRoute>) -> Self {
        Self { routes }
    }

    /// Build a map where destination channel `i` copies `sources[i]`
    pub fn from_sources(sources: &[usize]) -> Self {
        sources.iter().copied().map(ChannelRoute::Source).collect()
    }

    /// Duplicate a mono source into both stereo channels
    pub fn mono_to_stereo() -> Self {
        Self::from_sources(&[0, 0])
    }

    /// Keep the left channel of a stereo source
    pub fn stereo_to_left() -> Self {
        Self::from_sources(&[0])
    }

    /// Keep the right channel of a stereo source
    pub fn stereo_to_right() -> Self {
        Self::from_sources(&[1])
    }

    /// Number of destination channels described
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[inline]
    pub fn routes(&self) -> &[ChannelRoute] {
        &self.routes
    }

    /// True when this map sends every one of `source_channels` straight through
    pub fn is_identity(&self, source_channels: usize) -> bool {
        self.routes.len() == source_channels
            && self
                .routes
                .iter()
                .enumerate()
                .all(|(i, route)| *route == ChannelRoute::Source(i))
    }

    /// Check the map against the channel counts of a conversion
    pub fn validate(&self, source_channels: usize, dest_channels: usize) -> Result<()> {
        if self.routes.len() != dest_channels {
            return Err(TransformError::ChannelMapMismatch {
                map_channels: self.routes.len(),
                dest_channels,
            });
        }

        for (dest_channel, route) in self.routes.iter().enumerate() {
            if let ChannelRoute::Source(source_channel) = *route {
                if source_channel >= source_channels {
                    return Err(TransformError::ChannelOutOfRange {
                        dest_channel,
                        source_channel,
                        source_channels,
                    });
                }
            }
        }

        Ok(())
    }

    /// Decode a packed map: 3 bits of source index per destination channel
    ///
    /// Fails if any bit above bit 23 is set. Entries past `dest_channels`
    /// are ignored, so [`ChannelMap::UNITY_PACKED`] works for any count.
    pub fn from_packed(bits: u32, dest_channels: usize) -> Result<Self> {
        if bits & !PACKED_MAP_MASK != 0 {
            return Err(TransformError::invalid_format(format!(
                "packed channel map {bits:#x} has bits outside {PACKED_MAP_MASK:#x}"
            )));
        }
        if dest_channels > MAX_PACKED_CHANNELS as usize {
            return Err(TransformError::invalid_format(format!(
                "packed channel maps hold at most {MAX_PACKED_CHANNELS} channels, got {dest_channels}"
            )));
        }

        Ok((0..dest_channels)
            .map(|dest| {
                let source = (bits >> (dest as u32 * PACKED_BITS_PER_CHANNEL)) & PACKED_CHANNEL_MASK;
                ChannelRoute::Source(source as usize)
            })
            .collect())
    }

    /// Encode as a packed map
    ///
    /// Fails for silence routes, more than 8 destination channels or source
    /// indices above 7, none of which the packed form can express.
    pub fn to_packed(&self) -> Result<u32> {
        if self.routes.len() > MAX_PACKED_CHANNELS as usize {
            return Err(TransformError::invalid_format(format!(
                "packed channel maps hold at most {MAX_PACKED_CHANNELS} channels, got {}",
                self.routes.len()
            )));
        }

        let mut bits = 0u32;
        for (dest, route) in self.routes.iter().enumerate() {
            let source = match *route {
                ChannelRoute::Source(source) if source < MAX_PACKED_CHANNELS as usize => source,
                ChannelRoute::Source(source) => {
                    return Err(TransformError::invalid_format(format!(
                        "source channel {source} does not fit a packed channel map"
                    )))
                }
                ChannelRoute::Silence => {
                    return Err(TransformError::invalid_format(
                        "silence routes cannot be packed",
                    ))
                }
            };
            bits |= (source as u32) << (dest as u32 * PACKED_BITS_PER_CHANNEL);
        }
        Ok(bits)
    }
}

impl FromIterator<ChannelRoute> for ChannelMap {
    fn from_iter<I: IntoIterator<Item = ChannelRoute>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let map = ChannelMap::identity(3);
        assert_eq!(map.len(), 3);
        assert!(map.is_identity(3));
        assert!(!map.is_identity(4));
        assert!(!ChannelMap::from_sources(&[1, 0]).is_identity(2));
    }

    #[test]
    fn test_unity_packed() {
        assert_eq!(
            ChannelMap::identity(8).to_packed().unwrap(),
            ChannelMap::UNITY_PACKED
        );
        let stereo = ChannelMap::from_packed(ChannelMap::UNITY_PACKED, 2).unwrap();
        assert_eq!(stereo, ChannelMap::identity(2));
    }

    #[test]
    fn test_packed_roundtrip() {
        let map = ChannelMap::from_sources(&[3, 3, 0, 7, 1]);
        let bits = map.to_packed().unwrap();
        assert_eq!(ChannelMap::from_packed(bits, 5).unwrap(), map);
    }

    #[test]
    fn test_packed_rejects_unrepresentable() {
        let silence = ChannelMap::new(vec![ChannelRoute::Source(0), ChannelRoute::Silence]);
        assert!(silence.to_packed().is_err());
        assert!(ChannelMap::from_sources(&[8]).to_packed().is_err());
        assert!(ChannelMap::identity(9).to_packed().is_err());
        assert!(ChannelMap::from_packed(0, 9).is_err());
    }

    #[test]
    fn test_packed_rejects_high_bits() {
        assert!(ChannelMap::from_packed(1 << 24, 2).is_err());
        assert!(ChannelMap::from_packed(ChannelMap::UNITY_PACKED | 0x8000_0000, 8).is_err());
        assert!(ChannelMap::from_packed(0xFF_FFFF, 8).is_ok());
    }

    #[test]
    fn test_validate_cardinality() {
        let map = ChannelMap::mono_to_stereo();
        assert!(map.validate(1, 2).is_ok());
        assert!(matches!(
            map.validate(1, 3),
            Err(TransformError::ChannelMapMismatch {
                map_channels: 2,
                dest_channels: 3
            })
        ));
    }

    #[test]
    fn test_validate_source_range() {
        assert!(ChannelMap::stereo_to_right().validate(2, 1).is_ok());
        assert!(matches!(
            ChannelMap::stereo_to_right().validate(1, 1),
            Err(TransformError::ChannelOutOfRange {
                dest_channel: 0,
                source_channel: 1,
                source_channels: 1
            })
        ));
    }

    #[test]
    fn test_silence_always_valid() {
        let map = ChannelMap::new(vec![ChannelRoute::Silence; 4]);
        assert!(map.validate(1, 4).is_ok());
    }

    #[test]
    fn test_serde_null_is_silence() {
        let map: ChannelMap = serde_json::from_str("[1, null, 0]").unwrap();
        assert_eq!(
            map.routes(),
            &[
                ChannelRoute::Source(1),
                ChannelRoute::Silence,
                ChannelRoute::Source(0)
            ]
        );
        assert_eq!(serde_json::to_string(&map).unwrap(), "[1,null,0]");
    }
}
