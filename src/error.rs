//! Error handling for pcm-transform
//!
//! Every failure is reported synchronously at the call that caused it.
//! Nothing here is transient, so nothing is retried internally.

use thiserror::Error;

/// Result type alias for transform operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Broad class of a [`TransformError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid formats, channel maps, staging sizes or call order
    Configuration,
    /// Buffer lengths that do not line up with the configured frame sizes
    Format,
    /// Amplitudes outside the destination range (strict mode only)
    Range,
    /// Reading or parsing configuration files
    Io,
}

/// Main error type for sample transforms
#[derive(Error, Debug)]
pub enum TransformError {
    // Configuration Errors
    #[error("Invalid sample format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Channel map has {map_channels} entries but destination has {dest_channels} channels")]
    ChannelMapMismatch {
        map_channels: usize,
        dest_channels: usize,
    },

    #[error(
        "Destination channel {dest_channel} routes from source channel {source_channel}, \
         but source only has {source_channels} channels"
    )]
    ChannelOutOfRange {
        dest_channel: usize,
        source_channel: usize,
        source_channels: usize,
    },

    #[error("Staging area of {requested} bytes cannot hold one frame ({required} bytes)")]
    StagingTooSmall { requested: usize, required: usize },

    #[error("Sample transform has not been configured")]
    NotConfigured,

    // Format Errors
    #[error("Input length {len} is not a multiple of the source frame size {frame_size}")]
    UnalignedInput { len: usize, frame_size: usize },

    #[error("Output buffer is {actual} bytes, conversion needs exactly {expected}")]
    OutputSizeMismatch { expected: usize, actual: usize },

    // Range Errors
    #[error("{clipped_samples} samples were clamped to the destination range")]
    Clipped {
        clipped_samples: usize,
        /// The complete converted buffer, clamped where needed
        output: Vec<u8>,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransformError {
    /// Build an [`TransformError::InvalidFormat`] from anything printable
    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        TransformError::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Get the broad class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::InvalidFormat { .. }
            | TransformError::ChannelMapMismatch { .. }
            | TransformError::ChannelOutOfRange { .. }
            | TransformError::StagingTooSmall { .. }
            | TransformError::NotConfigured => ErrorKind::Configuration,
            TransformError::UnalignedInput { .. } | TransformError::OutputSizeMismatch { .. } => {
                ErrorKind::Format
            }
            TransformError::Clipped { .. } => ErrorKind::Range,
            TransformError::Io(_) | TransformError::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TransformError::InvalidFormat { .. } => "INVALID_FORMAT",
            TransformError::ChannelMapMismatch { .. } => "CHANNEL_MAP_MISMATCH",
            TransformError::ChannelOutOfRange { .. } => "CHANNEL_OUT_OF_RANGE",
            TransformError::StagingTooSmall { .. } => "STAGING_TOO_SMALL",
            TransformError::NotConfigured => "NOT_CONFIGURED",
            TransformError::UnalignedInput { .. } => "UNALIGNED_INPUT",
            TransformError::OutputSizeMismatch { .. } => "OUTPUT_SIZE_MISMATCH",
            TransformError::Clipped { .. } => "CLIPPED",
            TransformError::Io(_) => "IO_ERROR",
            TransformError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can carry on after this error
    ///
    /// A clipped conversion still produced a full output buffer, and the
    /// buffer-shape errors only need a differently sized buffer.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TransformError::Clipped { .. }
                | TransformError::UnalignedInput { .. }
                | TransformError::OutputSizeMismatch { .. }
                | TransformError::StagingTooSmall { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TransformError::InvalidFormat { .. } => vec![
                "Check the sample width, sign and byte order names",
                "Known widths: 8bit, 16bit, 24bit, 32bit, float, double, real24bit",
            ],
            TransformError::ChannelMapMismatch { .. } => vec![
                "Give the channel map exactly one entry per destination channel",
                "Omit the map only when source and destination channel counts match",
            ],
            TransformError::ChannelOutOfRange { .. } => vec![
                "Route destination channels from existing source channels",
                "Use a silence entry for channels with no source",
            ],
            TransformError::StagingTooSmall { .. } => vec![
                "Reserve at least 8 bytes per source channel",
                "Reserve at least one frame of the wider format",
            ],
            TransformError::NotConfigured => vec!["Call configure() before converting"],
            TransformError::UnalignedInput { .. } => vec![
                "Pass whole frames only",
                "Check the source channel count and sample width",
            ],
            TransformError::OutputSizeMismatch { .. } => vec![
                "Size the output as frame count times the destination frame size",
            ],
            TransformError::Clipped { .. } => vec![
                "The converted output is attached to the error",
                "Lower the source gain or use a float destination to avoid clamping",
            ],
            _ => vec![],
        }
    }

    /// Take the converted buffer out of a [`TransformError::Clipped`] error
    pub fn into_output(self) -> Option<Vec<u8>> {
        match self {
            TransformError::Clipped { output, .. } => Some(output),
            _ => None,
        }
    }
}
