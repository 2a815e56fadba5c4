//! Declarative transform configuration
//!
//! A [`TransformConfig`] is the serializable form of a [`SampleTransform`]
//! setup. Formats are written by name:
//!
//! ```json
//! {
//!   "source": "16bit-signed-lendian-stereo",
//!   "dest": "float-bendian-stereo",
//!   "channel_map": [1, null],
//!   "staging_bytes": 65000,
//!   "clip_policy": "strict"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::format::{ChannelMap, SampleFormat};
use crate::transform::{ClipPolicy, SampleTransform};

/// Serializable description of a sample transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Format of the input buffers
    pub source: SampleFormat,

    /// Format of the output buffers
    pub dest: SampleFormat,

    /// Channel routing, identity when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_map: Option<ChannelMap>,

    /// Staging size in bytes, the default 32 KiB when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_bytes: Option<usize>,

    #[serde(default)]
    pub clip_policy: ClipPolicy,
}

impl TransformConfig {
    /// Minimal configuration: identity map, default staging, clamping
    pub fn new(source: SampleFormat, dest: SampleFormat) -> Self {
        Self {
            source,
            dest,
            channel_map: None,
            staging_bytes: None,
            clip_policy: ClipPolicy::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        debug!(path = %path.display(), "Loaded transform config");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Create a configured [`SampleTransform`]
    pub fn build(&self) -> Result<SampleTransform> {
        let mut transform = SampleTransform::new().with_clip_policy(self.clip_policy);
        if let Some(bytes) = self.staging_bytes {
            transform.reserve_staging(bytes)?;
        }
        transform.configure(self.source, self.dest, self.channel_map.clone())?;
        Ok(transform)
    }
}
