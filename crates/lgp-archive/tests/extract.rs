mod common;

use std::fs;

use common::{padded, ArchiveBuilder};
use lgp_archive::{extract_archive, ArchiveIndex, Error, ReadOptions};
use tempfile::TempDir;

fn index(data: Vec<u8>) -> ArchiveIndex {
    ArchiveIndex::parse("test.lgp", data, &ReadOptions::default()).unwrap()
}

/// Two unique files, laid out by hand.
fn two_file_archive() -> Vec<u8> {
    let mut data = b"TESTCREATOR0".to_vec();
    data.extend_from_slice(&2u32.to_le_bytes());

    data.extend(padded("a.txt", 20));
    data.extend_from_slice(&70u32.to_le_bytes());
    data.push(14);
    data.extend_from_slice(&0u16.to_le_bytes());

    data.extend(padded("b.txt", 20));
    data.extend_from_slice(&99u32.to_le_bytes());
    data.push(14);
    data.extend_from_slice(&0u16.to_le_bytes());

    assert_eq!(data.len(), 70);
    data.extend(padded("a.txt", 20));
    data.extend_from_slice(&5u32.to_le_bytes());
    data.extend_from_slice(b"hello");

    assert_eq!(data.len(), 99);
    data.extend(padded("b.txt", 20));
    data.extend_from_slice(&5u32.to_le_bytes());
    data.extend_from_slice(b"world");
    data
}

#[test]
fn test_extract_two_files_to_root() {
    let out = TempDir::new().unwrap();
    let archive = index(two_file_archive());

    let report = extract_archive(&archive, out.path()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.succeeded, ["a.txt", "b.txt"]);

    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(out.path().join("b.txt")).unwrap(), b"world");
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 2);
}

#[test]
fn test_extract_round_trip() {
    let payloads: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i| {
            let payload = (0..i * 37).map(|b| (b * 7 + i) as u8).collect();
            (format!("file{i:02}.bin"), payload)
        })
        .collect();

    let mut builder = ArchiveBuilder::new();
    for (name, payload) in &payloads {
        builder = builder.file(name, payload);
    }
    let archive = index(builder.reverse_toc().build());
    assert_eq!(archive.len(), payloads.len());

    let out = TempDir::new().unwrap();
    let report = extract_archive(&archive, out.path()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.total(), payloads.len());

    for (name, payload) in &payloads {
        assert_eq!(&fs::read(out.path().join(name)).unwrap(), payload, "{name}");
    }
}

#[test]
fn test_extract_conflicts_into_subdirectories() {
    let archive = index(
        ArchiveBuilder::new()
            .file_in("field", "same.dat", b"field copy")
            .file("unique.dat", b"unique")
            .file_in("world\\map", "same.dat", b"world copy")
            .build(),
    );

    let out = TempDir::new().unwrap();
    let report = extract_archive(&archive, out.path()).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.succeeded,
        ["field/same.dat", "unique.dat", "world/map/same.dat"]
    );

    let root = out.path();
    assert_eq!(fs::read(root.join("field/same.dat")).unwrap(), b"field copy");
    assert_eq!(fs::read(root.join("world/map/same.dat")).unwrap(), b"world copy");
    assert_eq!(fs::read(root.join("unique.dat")).unwrap(), b"unique");
    assert!(!root.join("same.dat").exists());
}

#[test]
fn test_extract_empty_archive() {
    let mut data = b"TESTCREATOR0".to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    let archive = index(data);

    let out = TempDir::new().unwrap();
    let dest = out.path().join("nested/dest");
    let report = extract_archive(&archive, &dest).unwrap();

    assert!(report.is_success());
    assert_eq!(report.total(), 0);
    assert!(dest.is_dir());
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
}

#[test]
fn test_truncated_payload_fails_one_entry() {
    let mut data = ArchiveBuilder::new()
        .file("a.txt", b"hello")
        .file("b.txt", b"world")
        .build();
    data.truncate(data.len() - 1);
    let archive = index(data);

    let out = TempDir::new().unwrap();
    let report = extract_archive(&archive, out.path()).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.succeeded, ["a.txt"]);
    assert_eq!(report.failed.len(), 1);

    let (path, error) = &report.failed[0];
    assert_eq!(path, "b.txt");
    assert!(matches!(error, Error::TruncatedPayload { .. }));
    assert!(error.is_per_entry());

    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"hello");
    assert!(!out.path().join("b.txt").exists());
}

#[test]
fn test_extract_overwrites_existing_files() {
    let archive = index(ArchiveBuilder::new().file("a.txt", b"new").build());

    let out = TempDir::new().unwrap();
    fs::write(out.path().join("a.txt"), b"old contents, longer").unwrap();

    let report = extract_archive(&archive, out.path()).unwrap();
    assert!(report.is_success());
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"new");

    // A second run over the same tree succeeds too.
    let again = extract_archive(&archive, out.path()).unwrap();
    assert!(again.is_success());
}

#[test]
fn test_unsafe_subdirectory_rejected() {
    let archive = index(
        ArchiveBuilder::new()
            .file_in("../escape", "x.bin", b"bad")
            .file_in("safe", "x.bin", b"good")
            .build(),
    );

    let out = TempDir::new().unwrap();
    let dest = out.path().join("dest");
    let report = extract_archive(&archive, &dest).unwrap();

    assert_eq!(report.succeeded, ["safe/x.bin"]);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, Error::UnsafePath { .. }));
    assert!(!out.path().join("escape").exists());
    assert_eq!(fs::read(dest.join("safe/x.bin")).unwrap(), b"good");
}

#[test]
fn test_destination_is_a_file() {
    let archive = index(ArchiveBuilder::new().file("a.txt", b"hello").build());

    let out = TempDir::new().unwrap();
    let blocker = out.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let err = extract_archive(&archive, &blocker).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_unresolved_conflicts_are_not_written() {
    let mut data = ArchiveBuilder::new()
        .file_in("a", "dup.tex", b"first")
        .file_in("b", "dup.tex", b"secnd")
        .build();
    // Both members name TOC position 7, which does not exist.
    let table = 16 + 2 * 27 + common::TYPICAL_LOOKUP_PREFIX;
    for member in 0..2 {
        let at = table + 4 + member * 130 + 128;
        data[at..at + 2].copy_from_slice(&7u16.to_le_bytes());
    }
    let archive = index(data);

    let out = TempDir::new().unwrap();
    let report = extract_archive(&archive, out.path()).unwrap();

    assert!(report.succeeded.is_empty());
    assert_eq!(report.failed.len(), 2);
    for (path, error) in &report.failed {
        assert_eq!(path, "dup.tex");
        assert!(matches!(
            error,
            Error::UnresolvedConflict { conflict_index: 1, .. }
        ));
    }
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_colliding_paths_keep_first_entry() {
    let archive = index(
        ArchiveBuilder::new()
            .file_in("same", "x.bin", b"first")
            .file_in("same", "x.bin", b"second")
            .build(),
    );

    let out = TempDir::new().unwrap();
    let report = extract_archive(&archive, out.path()).unwrap();

    assert_eq!(report.succeeded, ["same/x.bin"]);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        &report.failed[0].1,
        Error::DuplicatePath { path } if path == "same/x.bin"
    ));
    assert_eq!(fs::read(out.path().join("same/x.bin")).unwrap(), b"first");
}
