//! Command implementations behind the `ba2tk` binary.
//!
//! Each command opens the archive through the public `ba2tk` API, writes
//! its report to the given writer and returns an error when the archive or
//! any entry is unusable, so the binary exits non-zero.

#![warn(missing_docs)]

pub mod commands;

use ba2tk::{ExtractMode, LoadOptions};

/// Options shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOptions {
    /// Extract through bounded blocks instead of whole buffers
    pub streamed: bool,
    /// Tolerate anomalies that strict opening rejects
    pub lax: bool,
}

impl GlobalOptions {
    /// Library load options for these flags
    pub fn load_options(self) -> LoadOptions {
        let mode = if self.streamed {
            ExtractMode::Streamed
        } else {
            ExtractMode::Buffered
        };
        LoadOptions::new().with_mode(mode).with_strict(!self.lax)
    }
}
