//! Archive opener: header validation and eager record table parsing
//!
//! Everything needed for lookups is read here, so that no further I/O
//! happens until a payload is extracted. Any inconsistency between the
//! tables and the file (records or names running past the end, payloads
//! outside the file) is reported now as `CorruptIndex`.

use binrw::BinRead;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

use crate::config::LoadOptions;
use crate::entry::{Block, Entry};
use crate::error::{Ba2Error, Ba2Result};
use crate::hash::EntryHash;
use crate::header::{ArchiveKind, Ba2Header, MAX_HEADER_SIZE};
use crate::index::EntryIndex;
use crate::record::{ChunkRecord, GeneralRecord, RECORD_SENTINEL, TextureRecord};
use crate::source::ByteSource;

/// Parsed header and index of an archive
pub(crate) struct OpenedArchive {
    pub(crate) header: Ba2Header,
    pub(crate) index: EntryIndex,
}

/// Validate the header and build the entry index
pub(crate) fn open_source(source: &ByteSource, options: &LoadOptions) -> Ba2Result<OpenedArchive> {
    let file_len = source.len();
    let header_len = file_len.min(MAX_HEADER_SIZE as u64);
    let header_bytes = source.read_at(0, header_len, "header")?;
    let header = Ba2Header::parse(&header_bytes, options.strict)?;

    debug!(
        "BA2 v{} {} with {} records, name table at {:#x}",
        header.version,
        header.kind(),
        header.file_count,
        header.name_table_offset
    );

    let table_offset = header.size() as u64;
    let records = source.with_slice(
        table_offset,
        file_len - table_offset,
        "record table",
        |table| parse_records(table, &header, table_offset),
    )??;
    let names = read_names(source, &header, &records)?;

    let mut entries = Vec::with_capacity(records.len());
    for (record, name) in records.into_iter().zip(names) {
        let entry = match record {
            Record::General(record) => {
                check_sentinel(record.sentinel, &name, record.offset, options.strict)?;
                Entry::from_general(name, &record)
            }
            Record::Texture(record) => {
                check_chunk_header_size(&record, &name, options.strict)?;
                for chunk in &record.chunks {
                    check_chunk(chunk, &name, options.strict)?;
                }
                Entry::from_texture(name, &record)
            }
        };
        check_bounds(&entry, file_len)?;
        if options.verify_hashes && header.has_names() {
            check_hash(&entry)?;
        }
        entries.push(entry);
    }

    let index = EntryIndex::build(entries, options.strict)?;
    Ok(OpenedArchive { header, index })
}

enum Record {
    General(GeneralRecord),
    Texture(TextureRecord),
}

fn parse_records(table: &[u8], header: &Ba2Header, table_offset: u64) -> Ba2Result<Vec<Record>> {
    let count = header.file_count as usize;
    let min_record = match header.kind() {
        ArchiveKind::General => GeneralRecord::SIZE,
        ArchiveKind::Texture => TextureRecord::HEADER_SIZE,
    };
    if count.saturating_mul(min_record) > table.len() {
        return Err(Ba2Error::corrupt(
            format!(
                "{count} records need at least {} bytes, {} available",
                count.saturating_mul(min_record),
                table.len()
            ),
            table_offset,
        ));
    }

    let mut cursor = Cursor::new(table);
    let mut records = Vec::with_capacity(count);
    for position in 0..count {
        let record_offset = table_offset + cursor.position();
        let record = match header.kind() {
            ArchiveKind::General => GeneralRecord::read(&mut cursor).map(Record::General),
            ArchiveKind::Texture => TextureRecord::read(&mut cursor).map(Record::Texture),
        }
        .map_err(|e| {
            Ba2Error::corrupt(
                format!("record {position} of {count} is unreadable: {e}"),
                record_offset,
            )
        })?;
        records.push(record);
    }
    Ok(records)
}

fn read_names(source: &ByteSource, header: &Ba2Header, records: &[Record]) -> Ba2Result<Vec<String>> {
    if !header.has_names() {
        debug!("Archive has no name table, naming entries by hash");
        return Ok(records
            .iter()
            .map(|record| {
                let hash = match record {
                    Record::General(r) => EntryHash::from_parts(r.name_hash, r.extension, r.dir_hash),
                    Record::Texture(r) => EntryHash::from_parts(r.name_hash, r.extension, r.dir_hash),
                };
                hash.to_string()
            })
            .collect());
    }

    let offset = header.name_table_offset;
    let file_len = source.len();
    if offset > file_len {
        return Err(Ba2Error::corrupt(
            format!("name table starts past end of file ({file_len} bytes)"),
            offset,
        ));
    }

    source.with_slice(offset, file_len - offset, "name table", |table| {
        let mut cursor = Cursor::new(table);
        let mut names = Vec::with_capacity(records.len());
        for position in 0..records.len() {
            let name_offset = offset + cursor.position();
            let name = read_name(&mut cursor).map_err(|e| {
                Ba2Error::corrupt(format!("name {position} is unreadable: {e}"), name_offset)
            })?;
            names.push(name);
        }
        Ok(names)
    })?
}

fn read_name(cursor: &mut Cursor<&[u8]>) -> std::io::Result<String> {
    let mut len = [0u8; 2];
    cursor.read_exact(&mut len)?;
    let mut bytes = vec![0u8; usize::from(u16::from_le_bytes(len))];
    cursor.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn check_sentinel(sentinel: u32, name: &str, offset: u64, strict: bool) -> Ba2Result<()> {
    if sentinel == RECORD_SENTINEL {
        return Ok(());
    }
    if strict {
        return Err(Ba2Error::corrupt(
            format!("record for '{name}' ends with {sentinel:#010x} instead of {RECORD_SENTINEL:#010x}"),
            offset,
        ));
    }
    warn!("Record for '{}' has sentinel {:#010x}", name, sentinel);
    Ok(())
}

fn check_chunk_header_size(record: &TextureRecord, name: &str, strict: bool) -> Ba2Result<()> {
    let size = usize::from(record.chunk_header_size);
    if size == ChunkRecord::SIZE {
        return Ok(());
    }
    if strict {
        return Err(Ba2Error::corrupt(
            format!(
                "record for '{name}' declares {size}-byte chunk headers, expected {}",
                ChunkRecord::SIZE
            ),
            record.chunks.first().map_or(0, |chunk| chunk.offset),
        ));
    }
    warn!("Record for '{}' declares {}-byte chunk headers", name, size);
    Ok(())
}

fn check_chunk(chunk: &ChunkRecord, name: &str, strict: bool) -> Ba2Result<()> {
    check_sentinel(chunk.sentinel, name, chunk.offset, strict)?;
    if chunk.start_mip > chunk.end_mip {
        if strict {
            return Err(Ba2Error::corrupt(
                format!(
                    "chunk of '{name}' has mip range {}..{}",
                    chunk.start_mip, chunk.end_mip
                ),
                chunk.offset,
            ));
        }
        warn!(
            "Chunk of '{}' has inverted mip range {}..{}",
            name, chunk.start_mip, chunk.end_mip
        );
    }
    Ok(())
}

fn check_bounds(entry: &Entry, file_len: u64) -> Ba2Result<()> {
    let outside = |block: &&Block| block.end().is_none_or(|end| end > file_len);
    match entry.blocks().iter().find(outside) {
        Some(block) => Err(Ba2Error::corrupt(
            format!(
                "payload of '{}' ({} bytes stored) extends past end of file ({file_len} bytes)",
                entry.name,
                block.stored_size()
            ),
            block.offset,
        )),
        None => Ok(()),
    }
}

fn check_hash(entry: &Entry) -> Ba2Result<()> {
    let computed = EntryHash::from_path(&entry.name);
    if computed != entry.hash {
        return Err(Ba2Error::corrupt(
            format!(
                "invalid hash for '{}': stored {}, computed {}",
                entry.name, entry.hash, computed
            ),
            entry.offset(),
        ));
    }
    Ok(())
}
