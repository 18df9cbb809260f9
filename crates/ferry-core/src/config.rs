//! Transfer context passed to the executor at invocation time.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Settings that shape how an operation runs.
///
/// The executor never reads ambient state; everything it needs beyond the
/// operation itself comes from here.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TransferContext {
    /// Send deleted items to the trash instead of removing them.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub use_trash: bool,

    /// Preserve timestamps and permission bits when copying.
    #[builder(default = "false")]
    #[serde(default)]
    pub copy_metadata: bool,

    /// Destination used when an operation is given an empty one.
    #[builder(default)]
    #[serde(default)]
    pub default_destination: Option<PathBuf>,

    /// Capacity of the progress event channel.
    #[builder(default = "100")]
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_channel_size() -> usize {
    100
}

impl TransferContextBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.channel_size == Some(0) {
            return Err("Channel size must be greater than zero".to_string());
        }
        if let Some(Some(dest)) = &self.default_destination {
            if dest.as_os_str().is_empty() {
                return Err("Default destination cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl TransferContext {
    /// Create a new context builder.
    pub fn builder() -> TransferContextBuilder {
        TransferContextBuilder::default()
    }

    /// Resolve the destination for an operation, falling back to the default.
    pub fn resolve_destination(&self, destination: &Path) -> PathBuf {
        if destination.as_os_str().is_empty() {
            if let Some(default) = &self.default_destination {
                return default.clone();
            }
        }
        destination.to_path_buf()
    }
}

impl Default for TransferContext {
    fn default() -> Self {
        Self {
            use_trash: true,
            copy_metadata: false,
            default_destination: None,
            channel_size: default_channel_size(),
        }
    }
}
