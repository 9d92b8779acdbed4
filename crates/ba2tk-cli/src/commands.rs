//! `info`, `list`, `extract` and `verify`

use anyhow::{Context, Result, bail};
use ba2tk::{Archive, ArchiveKind, Entry, ExtractOptions};
use comfy_table::{CellAlignment, ContentArrangement, Table, presets};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::GlobalOptions;

fn open(path: &Path, global: GlobalOptions) -> Result<Archive> {
    Archive::open(path, global.load_options())
        .with_context(|| format!("failed to open {}", path.display()))
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// Print the header fields and entry totals
pub fn info(path: &Path, global: GlobalOptions, out: &mut impl Write) -> Result<()> {
    let archive = open(path, global)?;
    let header = archive.header();
    let entries: Vec<&Entry> = archive.list_entries()?.collect();
    let unpacked: u64 = entries.iter().map(|e| e.uncompressed_size()).sum();
    let compressed = entries.iter().filter(|e| e.is_compressed()).count();

    let mut table = new_table(&["Field", "Value"]);
    table.add_row(vec!["Path".to_string(), path.display().to_string()]);
    table.add_row(vec!["Type".to_string(), archive.kind().to_string()]);
    table.add_row(vec!["Version".to_string(), header.version.to_string()]);
    table.add_row(vec!["Codec".to_string(), format!("{:?}", archive.codec())]);
    table.add_row(vec!["Entries".to_string(), entries.len().to_string()]);
    table.add_row(vec!["Compressed entries".to_string(), compressed.to_string()]);
    table.add_row(vec!["Unpacked size".to_string(), unpacked.to_string()]);
    table.add_row(vec![
        "Name table".to_string(),
        if header.has_names() {
            format!("{:#x}", header.name_table_offset)
        } else {
            "stripped".to_string()
        },
    ]);
    writeln!(out, "{table}")?;
    Ok(())
}

/// Print every entry, as a table or as JSON
pub fn list(path: &Path, global: GlobalOptions, json: bool, out: &mut impl Write) -> Result<()> {
    let archive = open(path, global)?;
    let entries: Vec<&Entry> = archive.list_entries()?.collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    let texture = archive.kind() == ArchiveKind::Texture;
    let mut header = vec!["Name", "Size", "Packed"];
    if texture {
        header.extend(["Dimensions", "Format", "Chunks"]);
    }
    let mut table = new_table(&header);
    for entry in entries {
        let mut row = vec![
            entry.name.clone(),
            entry.uncompressed_size().to_string(),
            entry.compressed_size().to_string(),
        ];
        if let Some(info) = entry.texture() {
            row.push(format!("{}x{}", info.width, info.height));
            row.push(info.format.to_string());
            row.push(info.chunks.len().to_string());
        }
        table.add_row(row);
    }
    for column in 1..3 {
        if let Some(column) = table.column_mut(column) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    writeln!(out, "{table}")?;
    Ok(())
}

/// Flags of the `extract` command
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractFlags {
    /// Leave existing files alone
    pub no_overwrite: bool,
    /// Abort on the first failing entry
    pub stop_on_error: bool,
    /// Write texture payloads without a DDS header
    pub raw_textures: bool,
}

/// Extract every entry below `dest`
pub fn extract(
    path: &Path,
    dest: &Path,
    global: GlobalOptions,
    flags: ExtractFlags,
    out: &mut impl Write,
) -> Result<()> {
    let archive = open(path, global)?;
    let options = ExtractOptions::new()
        .with_overwrite(!flags.no_overwrite)
        .with_stop_on_first_error(flags.stop_on_error)
        .with_dds_headers(!flags.raw_textures);

    let report = archive
        .extract_all(dest, &options)
        .with_context(|| format!("failed to extract {}", path.display()))?;

    for skipped in &report.skipped {
        writeln!(out, "skipped {}", skipped.display())?;
    }
    for failure in &report.failures {
        writeln!(out, "failed {}: {}", failure.name, failure.error)?;
    }
    writeln!(
        out,
        "Extracted {} files to {} ({} skipped, {} failed)",
        report.extracted,
        dest.display(),
        report.skipped.len(),
        report.failures.len()
    )?;

    if !report.is_success() {
        bail!("{} entries could not be extracted", report.failures.len());
    }
    Ok(())
}

/// Check stored hashes and decode every payload
pub fn verify(path: &Path, global: GlobalOptions, out: &mut impl Write) -> Result<()> {
    let archive = open(path, global)?;
    let mut problems = 0usize;

    for mismatch in archive.verify_hashes()? {
        writeln!(
            out,
            "hash mismatch {}: stored {}, computed {}",
            mismatch.name, mismatch.stored, mismatch.computed
        )?;
        problems += 1;
    }

    let mut checked = 0usize;
    for entry in archive.list_entries()? {
        let result = archive
            .extract_streamed(entry)
            .and_then(|stream| stream.map(|block| block.map(|b| b.len())).sum::<Result<usize, _>>());
        match result {
            Ok(_) => checked += 1,
            Err(e) => {
                warn!("Entry '{}' failed verification: {}", entry.name, e);
                writeln!(out, "bad payload {}: {}", entry.name, e)?;
                problems += 1;
            }
        }
    }

    info!("Verified {} payloads", checked);
    if problems > 0 {
        bail!("{problems} problems found in {}", path.display());
    }
    writeln!(out, "OK: {checked} entries verified")?;
    Ok(())
}
