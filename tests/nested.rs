//! Integration tests for jars nested in jars and for `jar:` URLs.

mod common;

use std::io::Read;
use std::sync::Arc;

use common::{ZipBuilder, dir_listing, sample_jar, write_file};
use nestjar::{ByteArrayData, Error, Handler, JarFile, JarFileKind, JarFileOptions};

const CLASS_BYTES: [u8; 8] = [0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];

fn library_jar() -> Vec<u8> {
    ZipBuilder::new()
        .directory("META-INF/")
        .stored(
            "META-INF/MANIFEST.MF",
            b"Manifest-Version: 1.0\r\nImplementation-Title: lib\r\n\r\n",
        )
        .directory("com/")
        .directory("com/example/")
        .deflated("com/example/Lib.class", &CLASS_BYTES.repeat(64))
        .stored("com/example/lib.properties", b"name=lib\n")
        .build()
}

fn application_jar() -> Vec<u8> {
    ZipBuilder::new()
        .stored(
            "META-INF/MANIFEST.MF",
            b"Manifest-Version: 1.0\r\nMain-Class: org.example.Launcher\r\n\r\n",
        )
        .directory("BOOT-INF/")
        .directory("BOOT-INF/classes/")
        .directory("BOOT-INF/classes/com/")
        .directory("BOOT-INF/classes/com/example/")
        .stored("BOOT-INF/classes/com/example/Foo.class", b"foo class bytes")
        .stored("BOOT-INF/classes/application.yml", b"server:\n  port: 8080\n")
        .directory("BOOT-INF/lib/")
        .stored("BOOT-INF/lib/lib.jar", &library_jar())
        .local_extra(&[0xFE, 0xCA, 0x00, 0x00])
        .deflated("BOOT-INF/lib/packed.jar", &sample_jar().build())
        .build()
}

#[test]
fn nested_jar_lists_its_own_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.jar", &application_jar());
    let before = dir_listing(dir.path());

    let outer = JarFile::open(&path).unwrap();
    let lib = outer
        .nested_jar_file_by_name("BOOT-INF/lib/lib.jar")
        .unwrap()
        .unwrap();

    assert_eq!(lib.kind(), JarFileKind::NestedJar);
    assert_eq!(lib.path_from_root(), "!/BOOT-INF/lib/lib.jar");
    let names: Vec<String> = lib.entries().map(|e| e.name).collect();
    assert_eq!(
        names,
        [
            "META-INF/",
            "META-INF/MANIFEST.MF",
            "com/",
            "com/example/",
            "com/example/Lib.class",
            "com/example/lib.properties",
        ]
    );

    let class = lib.read_entry("com/example/Lib.class").unwrap().unwrap();
    assert_eq!(class, CLASS_BYTES.repeat(64));
    let manifest = lib.manifest().unwrap().unwrap();
    assert_eq!(manifest.value("Implementation-Title"), Some("lib"));

    assert!(lib.url().ends_with("app.jar!/BOOT-INF/lib/lib.jar!/"));

    // Nothing was extracted next to the jar
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn nested_jar_inside_nested_jar() {
    let inner = sample_jar().build();
    let middle = ZipBuilder::new().stored("lib/inner.jar", &inner).build();
    let outer = ZipBuilder::new()
        .stored("BOOT-INF/lib/middle.jar", &middle)
        .build();
    let jar = JarFile::from_data(Arc::new(ByteArrayData::new(outer)), "outer.jar").unwrap();

    let inner = jar
        .nested_jar_file_by_name("BOOT-INF/lib/middle.jar")
        .unwrap()
        .unwrap()
        .nested_jar_file_by_name("lib/inner.jar")
        .unwrap()
        .unwrap();
    assert_eq!(inner.path_from_root(), "!/BOOT-INF/lib/middle.jar!/lib/inner.jar");
    assert_eq!(inner.read_entry("a/b.txt").unwrap().unwrap(), b"hello from b");
}

#[test]
fn nested_directory_shares_the_outer_index() {
    let bytes = application_jar();
    let outer = JarFile::from_data(Arc::new(ByteArrayData::new(bytes)), "app.jar").unwrap();
    let classes = outer
        .nested_jar_file_by_name("BOOT-INF/classes/")
        .unwrap()
        .unwrap();

    assert_eq!(classes.kind(), JarFileKind::NestedDirectory);
    assert_eq!(classes.path_from_root(), "!/BOOT-INF/classes");

    let nested = classes.entry("com/example/Foo.class").unwrap();
    let direct = outer.entry("BOOT-INF/classes/com/example/Foo.class").unwrap();
    assert_eq!(nested.name, "com/example/Foo.class");
    assert_eq!(nested.directory_offset(), direct.directory_offset());
    assert_eq!(nested.local_header_offset(), direct.local_header_offset());
    assert_eq!(
        classes.read_entry("com/example/Foo.class").unwrap().unwrap(),
        b"foo class bytes"
    );

    let names: Vec<String> = classes.entries().map(|e| e.name).collect();
    assert_eq!(
        names,
        ["com/", "com/example/", "com/example/Foo.class", "application.yml"]
    );
    assert_eq!(classes.len(), 4);
    assert!(classes.entry("BOOT-INF/lib/lib.jar").is_none());

    // No manifest of its own, so the enclosing archive's applies
    let manifest = classes.manifest().unwrap().unwrap();
    assert_eq!(manifest.value("Main-Class"), Some("org.example.Launcher"));
}

#[test]
fn nested_directory_without_trailing_slash() {
    let bytes = application_jar();
    let outer = JarFile::from_data(Arc::new(ByteArrayData::new(bytes)), "app.jar").unwrap();
    let classes = outer
        .nested_jar_file_by_name("BOOT-INF/classes")
        .unwrap()
        .unwrap();
    assert_eq!(classes.kind(), JarFileKind::NestedDirectory);
    let com = classes.nested_jar_file_by_name("com/").unwrap().unwrap();
    assert_eq!(com.path_from_root(), "!/BOOT-INF/classes!/com");
    assert!(com.contains("example/Foo.class"));
}

#[test]
fn compressed_nested_jars_are_rejected() {
    let bytes = application_jar();
    let outer = JarFile::from_data(Arc::new(ByteArrayData::new(bytes)), "app.jar").unwrap();
    let err = outer
        .nested_jar_file_by_name("BOOT-INF/lib/packed.jar")
        .unwrap_err();
    assert!(matches!(err, Error::CompressedNestedJar(name) if name == "BOOT-INF/lib/packed.jar"));
}

#[test]
fn handler_resolves_multi_level_urls() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.jar", &application_jar());
    let outer = JarFile::open(&path).unwrap();
    let lib = outer
        .nested_jar_file_by_name("BOOT-INF/lib/lib.jar")
        .unwrap()
        .unwrap();
    let entry = lib.entry("com/example/lib.properties").unwrap();
    let url = lib.entry_url(&entry);

    let handler = Handler::new(JarFileOptions::default());
    let connection = handler.open_connection(&url).unwrap();
    assert_eq!(connection.content_length(), Some(9));
    let mut content = String::new();
    connection
        .input_stream()
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "name=lib\n");

    let classes_url = format!("{}BOOT-INF/classes!/application.yml", outer.url());
    let connection = Handler::global().open_connection(&classes_url).unwrap();
    assert_eq!(connection.jar_file().kind(), JarFileKind::NestedDirectory);
    assert_eq!(connection.entry().unwrap().name, "application.yml");

    let missing = format!("{}BOOT-INF/lib/missing.jar!/a.txt", outer.url());
    assert!(matches!(
        handler.open_connection(&missing),
        Err(Error::NotFound(name)) if name == "BOOT-INF/lib/missing.jar"
    ));
}

#[test]
fn concurrent_reads_through_nested_views() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.jar", &application_jar());
    let outer = JarFile::open(&path).unwrap();
    let lib = outer
        .nested_jar_file_by_name("BOOT-INF/lib/lib.jar")
        .unwrap()
        .unwrap();
    let classes = outer
        .nested_jar_file_by_name("BOOT-INF/classes/")
        .unwrap()
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    assert_eq!(
                        lib.read_entry("com/example/lib.properties").unwrap().unwrap(),
                        b"name=lib\n"
                    );
                    assert_eq!(
                        classes.read_entry("application.yml").unwrap().unwrap(),
                        b"server:\n  port: 8080\n"
                    );
                }
            });
        }
    });
}

#[cfg(unix)]
#[test]
fn handler_reopens_a_replaced_root_jar() {
    let dir = tempfile::tempdir().unwrap();
    let first = ZipBuilder::new().stored("version.txt", b"1").build();
    let path = write_file(dir.path(), "app.jar", &first);
    let url = format!("{}version.txt", JarFile::open(&path).unwrap().url());

    let handler = Handler::new(JarFileOptions::default());
    let mut content = String::new();
    handler
        .open_connection(&url)
        .unwrap()
        .input_stream()
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "1");

    // A rename gives the path a new inode
    let second = ZipBuilder::new()
        .stored("version.txt", b"2")
        .stored("added.txt", b"new")
        .build();
    let staged = write_file(dir.path(), "app.jar.new", &second);
    std::fs::rename(&staged, &path).unwrap();

    let connection = handler.open_connection(&url).unwrap();
    assert_eq!(connection.jar_file().len(), 2);
    let mut content = String::new();
    connection
        .input_stream()
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "2");
    assert_eq!(handler.open_roots(), 1);
}
