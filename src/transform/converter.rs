//! Sample Transform
//!
//! [`SampleTransform`] holds one configured conversion and a reusable staging
//! area. Buffers of any length are converted block by block, so working
//! memory stays bounded by the staging size no matter how large the input.
//!
//! ```text
//! Unconfigured --configure()--> Configured --configure()--> Configured ...
//! ```
//!
//! # Example
//! ```
//! use pcm_transform::format::{SampleFormat, SampleWidth};
//! use pcm_transform::transform::SampleTransform;
//!
//! let src = SampleFormat::new(SampleWidth::Bit8).unsigned();
//! let dst = SampleFormat::new(SampleWidth::Bit16);
//! let mut transform = SampleTransform::with_formats(src, dst, None).unwrap();
//!
//! let output = transform.convert(&[0x80, 0xC0]).unwrap();
//! assert_eq!(output, vec![0x00, 0x00, 0x00, 0x40]);
//! ```

use std::mem::size_of;

use tracing::{debug, trace, warn};

use crate::error::{Result, TransformError};
use crate::format::{ChannelMap, ChannelRoute, SampleFormat};
use crate::transform::codec::{ClipPolicy, SampleCodec};
use crate::transform::plan::ConversionPlan;

/// Staging size used when none was reserved (32 KiB)
pub const DEFAULT_STAGING_BYTES: usize = 32 * 1024;

/// Outcome of one conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionReport {
    /// Frames converted
    pub frames: usize,
    /// Samples clamped to the destination range
    pub clipped_samples: usize,
}

impl ConversionReport {
    /// True when no sample had to be clamped
    pub fn is_clean(&self) -> bool {
        self.clipped_samples == 0
    }
}

/// A validated (source, destination, channel map) triple
#[derive(Debug, Clone)]
struct Configuration {
    source: SampleFormat,
    dest: SampleFormat,
    map: ChannelMap,
    plan: ConversionPlan,
}

impl Configuration {
    /// Staging bytes consumed per frame
    ///
    /// The larger of one decoded source frame (one f64 per channel) and one
    /// frame of either format.
    fn staged_frame(&self) -> usize {
        let decoded = self.source.channels() * size_of::<f64>();
        decoded
            .max(self.source.frame_size())
            .max(self.dest.frame_size())
    }
}

/// Stateful PCM format converter with bounded staging
#[derive(Debug, Clone, Default)]
pub struct SampleTransform {
    config: Option<Configuration>,

    /// Decoded source amplitudes for one block
    staging: Vec<f64>,

    /// Byte budget that sets the block size, 0 when nothing is reserved
    staging_bytes: usize,

    clip_policy: ClipPolicy,
}

impl SampleTransform {
    /// Create an unconfigured transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform and configure it in one step
    pub fn with_formats(
        source: SampleFormat,
        dest: SampleFormat,
        map: Option<ChannelMap>,
    ) -> Result<Self> {
        let mut transform = Self::new();
        transform.configure(source, dest, map)?;
        Ok(transform)
    }

    /// Set the clip policy, builder style
    pub fn with_clip_policy(mut self, policy: ClipPolicy) -> Self {
        self.clip_policy = policy;
        self
    }

    pub fn set_clip_policy(&mut self, policy: ClipPolicy) {
        self.clip_policy = policy;
    }

    pub fn clip_policy(&self) -> ClipPolicy {
        self.clip_policy
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Configure the conversion
    ///
    /// Without a map the channel counts must match and channels pass
    /// straight through. On error the previous configuration is kept.
    pub fn configure(
        &mut self,
        source: SampleFormat,
        dest: SampleFormat,
        map: Option<ChannelMap>,
    ) -> Result<()> {
        source.validate()?;
        dest.validate()?;

        let map = match map {
            Some(map) => map,
            None if source.channels() == dest.channels() => ChannelMap::identity(source.channels()),
            None => {
                return Err(TransformError::ChannelMapMismatch {
                    map_channels: source.channels(),
                    dest_channels: dest.channels(),
                })
            }
        };
        map.validate(source.channels(), dest.channels())?;

        let plan = ConversionPlan::resolve(&source, &dest, &map);
        let config = Configuration {
            source,
            dest,
            map,
            plan,
        };

        let required = config.staged_frame();
        if self.staging_bytes != 0 && self.staging_bytes < required {
            return Err(TransformError::StagingTooSmall {
                requested: self.staging_bytes,
                required,
            });
        }

        debug!(
            source = %config.source,
            dest = %config.dest,
            plan = %config.plan,
            "Configured sample transform"
        );

        self.config = Some(config);
        if self.staging_bytes != 0 {
            self.resize_staging();
        }
        Ok(())
    }

    /// Configure with the identity channel map
    pub fn configure_default(&mut self, source: SampleFormat, dest: SampleFormat) -> Result<()> {
        self.configure(source, dest, None)
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Set the staging size in bytes
    ///
    /// This only affects how many frames are converted per block. Once
    /// configured, the size must hold at least one decoded source frame and
    /// one frame of the wider format. The staging area never exceeds it.
    pub fn reserve_staging(&mut self, bytes: usize) -> Result<()> {
        let required = self.config.as_ref().map_or(1, Configuration::staged_frame);
        if bytes < required {
            return Err(TransformError::StagingTooSmall {
                requested: bytes,
                required,
            });
        }

        self.staging_bytes = bytes;
        if self.config.is_some() {
            self.resize_staging();
        }
        debug!(bytes, block_frames = self.block_frames(), "Reserved staging");
        Ok(())
    }

    /// Free the staging area
    ///
    /// The next conversion reserves [`DEFAULT_STAGING_BYTES`] again.
    pub fn release_staging(&mut self) {
        self.staging = Vec::new();
        self.staging_bytes = 0;
    }

    /// Reserved staging size in bytes, 0 when nothing is reserved
    pub fn staging_bytes(&self) -> usize {
        self.staging_bytes
    }

    /// Frames converted per staging block, 0 when unconfigured or unreserved
    pub fn block_frames(&self) -> usize {
        match &self.config {
            Some(config) if self.staging_bytes != 0 => self.staging_bytes / config.staged_frame(),
            _ => 0,
        }
    }

    fn resize_staging(&mut self) {
        let channels = self.config.as_ref().map_or(0, |c| c.source.channels());
        let len = self.block_frames() * channels;
        if self.staging.len() != len {
            self.staging = vec![0.0; len];
        }
    }

    /// Reserve the default staging if needed and return the block size
    fn ensure_staging(&mut self) -> Result<usize> {
        let required = self
            .config
            .as_ref()
            .map(Configuration::staged_frame)
            .ok_or(TransformError::NotConfigured)?;

        if self.staging_bytes == 0 {
            self.staging_bytes = DEFAULT_STAGING_BYTES.max(required);
            self.resize_staging();
            debug!(bytes = self.staging_bytes, "Reserved default staging");
        }
        Ok(self.block_frames())
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Convert a whole buffer, returning a new one
    ///
    /// Under [`ClipPolicy::Strict`] a conversion that clamped samples returns
    /// [`TransformError::Clipped`] carrying the complete output.
    pub fn convert(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let (src_frame, dst_frame) = self.frame_sizes().ok_or(TransformError::NotConfigured)?;
        check_aligned(input.len(), src_frame)?;

        let mut output = vec![0u8; input.len() / src_frame * dst_frame];
        let report = self.convert_into(input, &mut output)?;

        if self.clip_policy == ClipPolicy::Strict && !report.is_clean() {
            warn!(
                clipped_samples = report.clipped_samples,
                frames = report.frames,
                "Samples clamped to destination range"
            );
            return Err(TransformError::Clipped {
                clipped_samples: report.clipped_samples,
                output,
            });
        }
        Ok(output)
    }

    /// Convert into a caller supplied buffer
    ///
    /// `output` must be exactly the frame count times the destination frame
    /// size. The clip policy is not applied here; inspect the report.
    pub fn convert_into(&mut self, input: &[u8], output: &mut [u8]) -> Result<ConversionReport> {
        let (src_frame, dst_frame) = self.frame_sizes().ok_or(TransformError::NotConfigured)?;
        check_aligned(input.len(), src_frame)?;

        let frames = input.len() / src_frame;
        let expected = frames * dst_frame;
        if output.len() != expected {
            return Err(TransformError::OutputSizeMismatch {
                expected,
                actual: output.len(),
            });
        }

        let block_frames = self.ensure_staging()?;
        let config = self.config.as_ref().ok_or(TransformError::NotConfigured)?;

        let clipped_samples = match config.plan {
            ConversionPlan::Copy => {
                output.copy_from_slice(input);
                0
            }
            ConversionPlan::Requantize { decoder, encoder } => {
                let block = BlockCodec {
                    decoder,
                    encoder,
                    routes: config.map.routes(),
                    source_channels: config.source.channels(),
                };
                input
                    .chunks(block_frames * src_frame)
                    .zip(output.chunks_mut(block_frames * dst_frame))
                    .map(|(src, dst)| block.convert(src, dst, &mut self.staging))
                    .sum::<usize>()
            }
        };

        trace!(frames, clipped_samples, "Converted buffer");
        Ok(ConversionReport {
            frames,
            clipped_samples,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Source and destination frame sizes in bytes
    pub fn frame_sizes(&self) -> Option<(usize, usize)> {
        self.config
            .as_ref()
            .map(|c| (c.source.frame_size(), c.dest.frame_size()))
    }

    pub fn source_format(&self) -> Option<SampleFormat> {
        self.config.as_ref().map(|c| c.source)
    }

    pub fn dest_format(&self) -> Option<SampleFormat> {
        self.config.as_ref().map(|c| c.dest)
    }

    pub fn channel_map(&self) -> Option<&ChannelMap> {
        self.config.as_ref().map(|c| &c.map)
    }

    /// Inner loop chosen for the current configuration
    pub fn plan(&self) -> Option<ConversionPlan> {
        self.config.as_ref().map(|c| c.plan)
    }
}

// ============================================================================
// Block conversion
// ============================================================================

/// Everything the requantize loop needs for one block
struct BlockCodec<'a> {
    decoder: SampleCodec,
    encoder: SampleCodec,
    routes: &'a [ChannelRoute],
    source_channels: usize,
}

impl BlockCodec<'_> {
    /// Convert one block of whole frames, returning the clipped sample count
    fn convert(&self, src: &[u8], dst: &mut [u8], staging: &mut [f64]) -> usize {
        let frames = src.len() / (self.decoder.sample_size() * self.source_channels);
        let amplitudes = &mut staging[..frames * self.source_channels];
        self.decoder.decode_into(src, amplitudes);

        let sample_size = self.encoder.sample_size();
        let mut clipped = 0;

        for (frame, out_frame) in amplitudes
            .chunks_exact(self.source_channels)
            .zip(dst.chunks_exact_mut(self.routes.len() * sample_size))
        {
            for (route, out) in self.routes.iter().zip(out_frame.chunks_exact_mut(sample_size)) {
                let amplitude = match *route {
                    ChannelRoute::Source(channel) => frame[channel],
                    ChannelRoute::Silence => 0.0,
                };
                if self.encoder.encode(amplitude, out) {
                    clipped += 1;
                }
            }
        }
        clipped
    }
}

fn check_aligned(len: usize, frame_size: usize) -> Result<()> {
    if len % frame_size != 0 {
        return Err(TransformError::UnalignedInput { len, frame_size });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
