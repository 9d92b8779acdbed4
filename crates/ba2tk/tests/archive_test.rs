//! Opening, lookup and extraction of general archives

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use ba2tk::{
    Archive, ArchiveKind, Ba2Error, Codec, EntryHash, ExtractMode, Extraction, LoadOptions,
    load_ba2,
};
use common::{Ba2Builder, foo_archive, patch_u32, patch_u64, pattern};
use pretty_assertions::assert_eq;
use std::io::Write;

fn open(data: Vec<u8>) -> Archive {
    Archive::from_bytes(data, LoadOptions::default()).expect("archive should open")
}

fn open_lax(data: Vec<u8>) -> Archive {
    Archive::from_bytes(data, LoadOptions::new().with_strict(false)).expect("archive should open")
}

fn open_err(data: Vec<u8>) -> Ba2Error {
    Archive::from_bytes(data, LoadOptions::default()).unwrap_err()
}

#[test]
fn test_foo_txt_scenario() {
    let archive = open(foo_archive());

    assert_eq!(archive.kind(), ArchiveKind::General);
    assert_eq!(archive.kind().as_str(), "general");
    assert_eq!(archive.version(), 1);
    assert_eq!(archive.codec(), Codec::Zlib);
    assert_eq!(archive.count().unwrap(), 1);

    let entry = archive.find_entry("FOO.txt").unwrap();
    assert_eq!(entry.name, "foo.txt");
    assert_eq!(entry.extension(), "txt");
    assert_eq!(entry.uncompressed_size(), 11);
    assert_eq!(entry.compressed_size(), 0);
    assert!(!entry.is_compressed());
    assert_eq!(entry.offset(), 24 + 36);

    let data = archive.extract(entry).unwrap();
    assert_eq!(data, b"hello world");
    assert_eq!(archive.extract("foo.txt").unwrap(), data);
}

#[test]
fn test_load_ba2_from_disk_and_close() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&foo_archive()).unwrap();
    file.flush().unwrap();

    let archive = load_ba2(file.path(), None).unwrap();
    assert_eq!(archive.file_list().unwrap(), vec!["foo.txt".to_string()]);
    assert_eq!(archive.extract("foo.txt").unwrap(), b"hello world");

    archive.close();
    archive.close();
    assert!(archive.is_closed());

    assert!(matches!(archive.count(), Err(Ba2Error::Closed)));
    assert!(matches!(archive.list_entries(), Err(Ba2Error::Closed)));
    assert!(matches!(archive.file_list(), Err(Ba2Error::Closed)));
    assert!(matches!(archive.find_entry("foo.txt"), Err(Ba2Error::Closed)));
    assert!(matches!(archive.extract("foo.txt"), Err(Ba2Error::Closed)));
    assert!(matches!(archive.verify_hashes(), Err(Ba2Error::Closed)));

    // Header data stays available
    assert_eq!(archive.kind(), ArchiveKind::General);
    assert_eq!(archive.header().file_count, 1);
}

#[test]
fn test_extract_with_entry_from_before_close() {
    let archive = open(foo_archive());
    let entry = archive.find_entry("foo.txt").unwrap().clone();
    archive.close();
    assert!(matches!(archive.extract(&entry), Err(Ba2Error::Closed)));
    assert!(matches!(archive.extract_streamed(&entry), Err(Ba2Error::Closed)));
}

#[test]
fn test_entry_from_another_archive_is_rejected() {
    let first = open(foo_archive());
    let second = open(
        Ba2Builder::general(1)
            .file("pad.bin", &pattern(100, 9))
            .file("foo.txt", b"other bytes")
            .build(),
    );
    let foreign = second.find_entry("foo.txt").unwrap();

    let err = first.extract(foreign).unwrap_err();
    assert!(matches!(err, Ba2Error::EntryNotFound(ref name) if name == "foo.txt"), "{err}");
    assert!(matches!(first.extract_streamed(foreign), Err(Ba2Error::EntryNotFound(_))));

    let copy = first.find_entry("foo.txt").unwrap().clone();
    assert!(matches!(first.extract(&copy), Err(Ba2Error::EntryNotFound(_))));
    assert_eq!(first.extract(copy.name.as_str()).unwrap(), b"hello world");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_ba2(dir.path().join("missing.ba2"), None).unwrap_err();
    assert!(matches!(err, Ba2Error::Io(_)));
}

#[test]
fn test_listing_and_lookup() {
    let archive = open(
        Ba2Builder::general(1)
            .file("Meshes\\Actors\\Deathclaw.nif", &pattern(100, 1))
            .compressed_file("sound/fx/boom.xwm", &pattern(4000, 2))
            .file("interface\\hud.swf", &pattern(7, 3))
            .build(),
    );

    let names = archive.file_list().unwrap();
    assert_eq!(
        names,
        vec![
            "Meshes\\Actors\\Deathclaw.nif",
            "sound/fx/boom.xwm",
            "interface\\hud.swf"
        ]
    );
    assert_eq!(archive.count().unwrap(), archive.list_entries().unwrap().count());
    for name in &names {
        assert_eq!(&archive.find_entry(name).unwrap().name, name);
    }

    // Listing can be restarted
    assert_eq!(archive.list_entries().unwrap().count(), 3);

    assert_eq!(
        archive.find_entry("meshes/actors/DEATHCLAW.NIF").unwrap().name,
        "Meshes\\Actors\\Deathclaw.nif"
    );
    assert_eq!(
        archive.find_entry("SOUND\\FX\\BOOM.XWM").unwrap().name,
        "sound/fx/boom.xwm"
    );

    let hash = EntryHash::from_path("interface/HUD.swf");
    assert_eq!(archive.find_by_hash(&hash).unwrap().name, "interface\\hud.swf");

    assert!(matches!(
        archive.find_entry("meshes\\missing.nif"),
        Err(Ba2Error::EntryNotFound(name)) if name == "meshes\\missing.nif"
    ));
    assert!(matches!(
        archive.find_by_hash(&EntryHash::from_path("nope.txt")),
        Err(Ba2Error::EntryNotFound(_))
    ));
}

#[test]
fn test_compressed_entry_has_exact_size() {
    let payload = pattern(70_000, 9);
    let archive = open(
        Ba2Builder::general(8)
            .compressed_file("textures\\data.bin", &payload)
            .build(),
    );

    let entry = archive.find_entry("textures\\data.bin").unwrap();
    assert!(entry.is_compressed());
    assert!(entry.compressed_size() > 0);
    assert_eq!(entry.uncompressed_size(), payload.len() as u64);

    let data = archive.extract(entry).unwrap();
    assert_eq!(data.len() as u64, entry.uncompressed_size());
    assert_eq!(data, payload);
}

#[test]
fn test_lz4_entries_v3() {
    let payload = pattern(10_000, 4);
    let archive = open(
        Ba2Builder::general(3)
            .lz4()
            .compressed_file("a\\lz4.bin", &payload)
            .file("a\\raw.bin", b"raw bytes")
            .build(),
    );

    assert_eq!(archive.codec(), Codec::Lz4);
    assert_eq!(archive.header().size(), 36);
    assert_eq!(archive.extract("a\\lz4.bin").unwrap(), payload);
    assert_eq!(archive.extract("a\\raw.bin").unwrap(), b"raw bytes");
}

#[test]
fn test_zlib_v2_and_v3() {
    for version in [2, 3] {
        let payload = pattern(3000, 5);
        let archive = open(
            Ba2Builder::general(version)
                .compressed_file("x.bin", &payload)
                .build(),
        );
        assert_eq!(archive.codec(), Codec::Zlib);
        assert_eq!(archive.extract("x.bin").unwrap(), payload);
    }
}

#[test]
fn test_corrupted_block_is_decompression_error() {
    let builder = Ba2Builder::general(1)
        .compressed_file("bad.bin", &pattern(500, 1))
        .file("good.txt", b"still fine");
    let mut data = builder.build();
    let payload_start = builder.record_offset(2);
    data[payload_start] = 0xFF;

    let archive = open(data);
    let err = archive.extract("bad.bin").unwrap_err();
    assert!(err.is_entry_failure());
    assert!(
        matches!(err, Ba2Error::Decompression { ref entry, offset, .. }
            if entry == "bad.bin" && offset == payload_start as u64),
        "{err}"
    );
    assert_eq!(archive.extract("good.txt").unwrap(), b"still fine");
}

#[test]
fn test_declared_size_mismatch_is_decompression_error() {
    for builder in [
        Ba2Builder::general(1).compressed_file("a.bin", &pattern(256, 2)),
        Ba2Builder::general(3)
            .lz4()
            .compressed_file("a.bin", &pattern(256, 2)),
    ] {
        let mut data = builder.build();
        // unpacked size field of record 0
        patch_u32(&mut data, builder.record_offset(0) + 28, 300);

        let archive = open(data);
        assert!(matches!(
            archive.extract("a.bin"),
            Err(Ba2Error::Decompression { .. })
        ));
    }
}

#[test]
fn test_wrong_magic_and_short_input() {
    let mut data = foo_archive();
    data[..4].copy_from_slice(b"BSA\0");
    assert!(matches!(open_err(data), Ba2Error::InvalidFormat(_)));

    assert!(matches!(open_err(b"BTD".to_vec()), Ba2Error::InvalidFormat(_)));
    assert!(matches!(open_err(Vec::new()), Ba2Error::InvalidFormat(_)));

    let truncated = foo_archive()[..12].to_vec();
    assert!(matches!(open_err(truncated), Ba2Error::Truncated { .. }));
}

#[test]
fn test_unknown_type_tag() {
    let mut data = foo_archive();
    data[8..12].copy_from_slice(b"GNMF");
    assert!(matches!(open_err(data), Ba2Error::InvalidFormat(_)));
}

#[test]
fn test_unknown_version_strict_and_lax() {
    let mut data = foo_archive();
    patch_u32(&mut data, 4, 4);

    assert!(matches!(
        open_err(data.clone()),
        Ba2Error::UnsupportedVersion(4)
    ));

    let archive = open_lax(data);
    assert_eq!(archive.version(), 4);
    assert_eq!(archive.extract("foo.txt").unwrap(), b"hello world");
}

#[test]
fn test_entry_past_end_of_file() {
    let builder = Ba2Builder::general(1).file("foo.txt", b"hello world");
    let mut data = builder.build();
    let len = data.len() as u64;
    patch_u64(&mut data, builder.record_offset(0) + 16, len - 4);

    let err = open_err(data);
    assert!(err.is_open_failure());
    assert!(
        matches!(err, Ba2Error::CorruptIndex { ref reason, offset }
            if reason.contains("foo.txt") && offset == len - 4),
        "{err}"
    );
}

#[test]
fn test_packed_size_past_end_of_file() {
    let builder = Ba2Builder::general(1).compressed_file("a.bin", &pattern(64, 0));
    let mut data = builder.build();
    patch_u32(&mut data, builder.record_offset(0) + 24, 1 << 20);
    assert!(matches!(open_err(data), Ba2Error::CorruptIndex { .. }));
}

#[test]
fn test_record_count_past_end_of_file() {
    let mut data = foo_archive();
    patch_u32(&mut data, 12, 1000);
    assert!(matches!(open_err(data), Ba2Error::CorruptIndex { .. }));

    let mut data = foo_archive();
    patch_u32(&mut data, 12, u32::MAX);
    assert!(matches!(open_err(data), Ba2Error::CorruptIndex { .. }));
}

#[test]
fn test_name_table_out_of_bounds() {
    let mut data = foo_archive();
    patch_u64(&mut data, 16, 1 << 40);
    assert!(matches!(open_err(data), Ba2Error::CorruptIndex { .. }));

    // Name length runs past the end
    let mut data = foo_archive();
    data.truncate(data.len() - 2);
    assert!(matches!(open_err(data), Ba2Error::CorruptIndex { .. }));
}

#[test]
fn test_bad_sentinel_strict_and_lax() {
    let builder = Ba2Builder::general(1).file("foo.txt", b"hello world");
    let mut data = builder.build();
    patch_u32(&mut data, builder.record_offset(0) + 32, 0xDEAD_BEEF);

    assert!(matches!(
        open_err(data.clone()),
        Ba2Error::CorruptIndex { .. }
    ));
    assert_eq!(open_lax(data).extract("foo.txt").unwrap(), b"hello world");
}

#[test]
fn test_duplicate_names() {
    let data = Ba2Builder::general(1)
        .file("dup.txt", b"first")
        .file("DUP.TXT", b"second")
        .build();

    assert!(matches!(
        open_err(data.clone()),
        Ba2Error::CorruptIndex { ref reason, .. } if reason.contains("duplicate")
    ));

    let archive = open_lax(data);
    assert_eq!(archive.count().unwrap(), 2);
    assert_eq!(archive.file_list().unwrap(), vec!["dup.txt", "DUP.TXT"]);
    assert_eq!(archive.extract("dup.txt").unwrap(), b"second");
    assert_eq!(
        archive
            .find_by_hash(&EntryHash::from_path("dup.txt"))
            .unwrap()
            .name,
        "DUP.TXT"
    );
}

#[test]
fn test_stripped_names_are_synthesized() {
    let archive = open(
        Ba2Builder::general(1)
            .without_names()
            .file("Meshes\\a.nif", b"nif")
            .build(),
    );

    let hash = EntryHash::from_path("meshes\\a.nif");
    let expected = format!("{:08x}\\{:08x}.nif", hash.directory, hash.file);
    assert!(!archive.header().has_names());
    assert_eq!(archive.file_list().unwrap(), vec![expected.clone()]);
    assert_eq!(archive.extract(expected.as_str()).unwrap(), b"nif");
    assert_eq!(archive.extract(archive.find_by_hash(&hash).unwrap()).unwrap(), b"nif");
    assert!(archive.verify_hashes().unwrap().is_empty());
}

#[test]
fn test_hash_verification() {
    let builder = Ba2Builder::general(1)
        .file("ok.txt", b"ok")
        .file("tampered.txt", b"bad");
    let mut data = builder.build();
    patch_u32(&mut data, builder.record_offset(1), 0x1234_5678);

    let archive = open(data.clone());
    let mismatches = archive.verify_hashes().unwrap();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].name, "tampered.txt");
    assert_eq!(mismatches[0].stored.file, 0x1234_5678);
    assert_eq!(mismatches[0].computed, EntryHash::from_path("tampered.txt"));

    let err = Archive::from_bytes(data, LoadOptions::new().with_hash_verification(true))
        .unwrap_err();
    assert!(
        matches!(err, Ba2Error::CorruptIndex { ref reason, .. } if reason.contains("hash")),
        "{err}"
    );
}

#[test]
fn test_general_entry_is_not_a_texture() {
    let archive = open(foo_archive());
    assert!(matches!(
        archive.extract_chunk("foo.txt", 0),
        Err(Ba2Error::NotATexture(_))
    ));
    assert!(matches!(
        archive.extract_dds("foo.txt"),
        Err(Ba2Error::NotATexture(_))
    ));
}

#[test]
fn test_read_follows_configured_mode() {
    let payload = pattern(200_000, 7);
    let data = Ba2Builder::general(1)
        .compressed_file("big.bin", &payload)
        .build();

    let buffered = Archive::from_bytes(data.clone(), LoadOptions::default()).unwrap();
    match buffered.read("big.bin").unwrap() {
        Extraction::Buffered(bytes) => assert_eq!(bytes, payload),
        Extraction::Streamed(_) => panic!("expected a buffered extraction"),
    }

    let streamed = Archive::from_bytes(
        data,
        LoadOptions::new().with_mode(ExtractMode::Streamed),
    )
    .unwrap();
    let extraction = streamed.read("big.bin").unwrap();
    assert!(matches!(extraction, Extraction::Streamed(_)));
    assert_eq!(extraction.into_bytes().unwrap(), payload);
}

#[test]
fn test_empty_archive() {
    let archive = open(Ba2Builder::general(1).build());
    assert_eq!(archive.count().unwrap(), 0);
    assert!(archive.file_list().unwrap().is_empty());
}

#[test]
fn test_zero_length_entry() {
    let archive = open(Ba2Builder::general(1).file("empty.txt", b"").build());
    assert!(archive.extract("empty.txt").unwrap().is_empty());
    assert_eq!(archive.extract_streamed("empty.txt").unwrap().count(), 0);
}
