//! Bulk extraction of an archive into a directory tree

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::Archive;
use crate::config::{ExtractMode, ExtractOptions};
use crate::dds::dds_header;
use crate::entry::Entry;
use crate::error::{Ba2Error, Ba2Result};

/// One entry that could not be extracted
#[derive(Debug)]
pub struct ExtractFailure {
    /// Entry name
    pub name: String,
    /// Why it failed
    pub error: Ba2Error,
}

/// Outcome of [`Archive::extract_all`]
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Number of files written
    pub extracted: usize,
    /// Existing files left alone because overwriting was disabled
    pub skipped: Vec<PathBuf>,
    /// Entries that failed
    pub failures: Vec<ExtractFailure>,
}

impl ExtractReport {
    /// Check if every entry was extracted or deliberately skipped
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Map an entry name to a path relative to the extraction root.
///
/// Backslashes and slashes both separate components. Absolute names,
/// drive prefixes and `..` components are rejected.
pub fn relative_path(name: &str) -> Ba2Result<PathBuf> {
    let unsafe_path = || Ba2Error::UnsafePath(name.to_string());
    if name.starts_with(['\\', '/']) || name.contains(':') {
        return Err(unsafe_path());
    }

    let mut path = PathBuf::new();
    for part in name.split(['\\', '/']).filter(|p| !p.is_empty() && *p != ".") {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(normal)), None) => path.push(normal),
            _ => return Err(unsafe_path()),
        }
    }

    if path.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(path)
}

impl Archive {
    /// Extract every entry below `dest`, collecting per-entry failures
    pub fn extract_all(
        &self,
        dest: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Ba2Result<ExtractReport> {
        self.extract_all_with_progress(dest, options, |_, _, _| true)
    }

    /// Extract every entry below `dest`.
    ///
    /// `progress` is called with `(index, total, name)` before each entry;
    /// returning `false` stops extraction with [`Ba2Error::Canceled`].
    /// Closing the archive meanwhile aborts with [`Ba2Error::Closed`].
    pub fn extract_all_with_progress<F>(
        &self,
        dest: impl AsRef<Path>,
        options: &ExtractOptions,
        mut progress: F,
    ) -> Ba2Result<ExtractReport>
    where
        F: FnMut(usize, usize, &str) -> bool,
    {
        let dest = dest.as_ref();
        let entries = self.list_entries()?;
        let total = entries.len();
        fs::create_dir_all(dest)?;

        let mut report = ExtractReport::default();
        for (position, entry) in entries.enumerate() {
            if !progress(position, total, &entry.name) {
                info!("Extraction canceled after {} of {} entries", position, total);
                return Err(Ba2Error::Canceled);
            }

            let target = match relative_path(&entry.name) {
                Ok(relative) => dest.join(relative),
                Err(e) => {
                    record_failure(&mut report, entry, e, options)?;
                    continue;
                }
            };

            if !options.overwrite && target.exists() {
                debug!("Skipping existing {}", target.display());
                report.skipped.push(target);
                continue;
            }

            match self.write_entry(entry, &target, options) {
                Ok(written) => {
                    debug!("Extracted '{}' ({} bytes)", entry.name, written);
                    report.extracted += 1;
                }
                Err(e) => record_failure(&mut report, entry, e, options)?,
            }
        }

        info!(
            "Extracted {} of {} entries to {} ({} skipped, {} failed)",
            report.extracted,
            total,
            dest.display(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Write one entry through a `.part` sibling that is renamed on success
    fn write_entry(&self, entry: &Entry, target: &Path, options: &ExtractOptions) -> Ba2Result<u64> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut partial = target.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        match self.write_payload(entry, &partial, options) {
            Ok(written) => {
                fs::rename(&partial, target)?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&partial);
                Err(e)
            }
        }
    }

    fn write_payload(&self, entry: &Entry, path: &Path, options: &ExtractOptions) -> Ba2Result<u64> {
        let mut writer = BufWriter::new(File::create(path)?);
        let mut written = 0u64;

        if options.dds_headers
            && let Some(info) = entry.texture()
        {
            let header = dds_header(info)?;
            writer.write_all(&header)?;
            written += header.len() as u64;
        }

        match self.options().mode {
            ExtractMode::Buffered => {
                let data = self.extract(entry)?;
                writer.write_all(&data)?;
                written += data.len() as u64;
            }
            ExtractMode::Streamed => {
                for block in self.extract_streamed(entry)? {
                    let block = block?;
                    writer.write_all(&block)?;
                    written += block.len() as u64;
                }
            }
        }

        writer.flush()?;
        Ok(written)
    }
}

fn record_failure(
    report: &mut ExtractReport,
    entry: &Entry,
    error: Ba2Error,
    options: &ExtractOptions,
) -> Ba2Result<()> {
    if matches!(error, Ba2Error::Closed) || options.stop_on_first_error {
        return Err(error);
    }
    warn!("Failed to extract '{}': {}", entry.name, error);
    report.failures.push(ExtractFailure {
        name: entry.name.clone(),
        error,
    });
    Ok(())
}
