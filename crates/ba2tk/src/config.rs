//! Options for loading archives and extracting their contents

use serde::{Deserialize, Serialize};

/// Default size of the blocks yielded by streamed extraction (64 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// How extraction hands payloads back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// One buffer per entry
    #[default]
    Buffered,
    /// A lazy sequence of bounded blocks
    Streamed,
}

/// Options for opening an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Extraction mode used by [`Archive::read`](crate::Archive::read) and
    /// [`Archive::extract_all`](crate::Archive::extract_all)
    pub mode: ExtractMode,

    /// Reject unknown versions, bad sentinels, malformed mip ranges and
    /// duplicate names instead of warning about them
    pub strict: bool,

    /// Maximum block size for streamed extraction
    pub block_size: usize,

    /// Recompute every record hash from its name while opening
    pub verify_hashes: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mode: ExtractMode::Buffered,
            strict: true,
            block_size: DEFAULT_BLOCK_SIZE,
            verify_hashes: false,
        }
    }
}

impl LoadOptions {
    /// Default options: buffered, strict
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the extraction mode
    #[must_use]
    pub const fn with_mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable strict validation
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the streamed block size (values below 1 are treated as 1)
    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Enable or disable hash verification at open time
    #[must_use]
    pub const fn with_hash_verification(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }
}

/// Options for [`Archive::extract_all`](crate::Archive::extract_all)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Replace files that already exist; when false they are skipped
    pub overwrite: bool,

    /// Abort on the first failing entry instead of collecting failures
    pub stop_on_first_error: bool,

    /// Prefix texture payloads with a DDS header
    pub dds_headers: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            stop_on_first_error: false,
            dds_headers: true,
        }
    }
}

impl ExtractOptions {
    /// Default options: overwrite, collect failures, write DDS headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable overwriting
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Enable or disable stopping at the first failure
    #[must_use]
    pub const fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    /// Enable or disable DDS headers on texture output
    #[must_use]
    pub const fn with_dds_headers(mut self, enable: bool) -> Self {
        self.dds_headers = enable;
        self
    }
}
