//! Integration tests for archives that need the ZIP64 end records.

mod common;

use std::sync::Arc;

use common::{ZipBuilder, sample_jar, write_file};
use nestjar::{ByteArrayData, JarFile};

const ENTRY_COUNT: usize = 70_000;

fn entry_name(i: usize) -> String {
    format!("data/{:03}/{i:05}.txt", i % 100)
}

#[test]
fn seventy_thousand_entries() {
    let mut builder = ZipBuilder::new();
    for i in 0..ENTRY_COUNT {
        builder = builder.stored(&entry_name(i), b"");
    }
    let bytes = builder.build();

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "big.jar", &bytes);
    let jar = JarFile::open(&path).unwrap();

    let record = jar.end_record();
    assert!(record.zip64);
    assert_eq!(record.entries, ENTRY_COUNT as u64);
    assert_eq!(record.archive_start_offset, 0);
    assert!(record.central_directory_offset > u64::from(u16::MAX));
    assert_eq!(jar.len(), ENTRY_COUNT);

    for i in 0..ENTRY_COUNT {
        let name = entry_name(i);
        let entry = jar.entry(&name).unwrap_or_else(|| panic!("{name} missing"));
        assert_eq!(entry.name, name);
    }
    assert!(jar.entry("data/000/70000.txt").is_none());

    let first: Vec<String> = jar.entries().take(3).map(|e| e.name).collect();
    assert_eq!(first, [entry_name(0), entry_name(1), entry_name(2)]);
}

#[test]
fn zip64_record_behind_a_prefix() {
    let prefix = b"#!/bin/sh\nexec java -jar \"$0\"\n".to_vec();
    let mut bytes = prefix.clone();
    bytes.extend(sample_jar().zip64().build());

    let jar = JarFile::from_data(Arc::new(ByteArrayData::new(bytes)), "app.jar").unwrap();
    let record = jar.end_record();
    assert!(record.zip64);
    assert_eq!(record.entries, 3);
    assert_eq!(record.archive_start_offset, prefix.len() as u64);
    assert_eq!(jar.read_entry("a/b.txt").unwrap().unwrap(), b"hello from b");
}

#[test]
fn zip64_nested_jar() {
    let inner = sample_jar().zip64().build();
    let outer = ZipBuilder::new().stored("lib/inner.jar", &inner).build();
    let jar = JarFile::from_data(Arc::new(ByteArrayData::new(outer)), "outer.jar").unwrap();
    let nested = jar.nested_jar_file_by_name("lib/inner.jar").unwrap().unwrap();
    assert!(nested.end_record().zip64);
    assert_eq!(nested.len(), 3);
    assert_eq!(nested.read_entry("a/b.txt").unwrap().unwrap(), b"hello from b");
}
