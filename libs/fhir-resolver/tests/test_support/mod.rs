//! Synthetic archive deployments for resolver tests.

#![allow(dead_code)]

use fhirau_resolver::{ArchiveSource, MemoryArchiveSource, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use tar::{Builder, Header};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in entries {
        let mut header = Header::new_gnu();
        header.set_mode(0o644);
        header.set_size(data.len() as u64);
        builder
            .append_data(&mut header, path, *data)
            .expect("append file");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

pub fn zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, data) in entries {
        writer
            .start_file(*path, SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(data).expect("write file");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A definition whose `name` tells the tests which archive it came from.
pub fn definition(url: &str, version: &str, origin: &str) -> Vec<u8> {
    format!(
        r#"{{"resourceType":"StructureDefinition","url":"{url}","version":"{version}","name":"{origin}"}}"#
    )
    .into_bytes()
}

/// A package containing the given `(url, version)` definitions.
pub fn package(name: &str, definitions: &[(&str, &str)]) -> Vec<u8> {
    let manifest = format!(r#"{{"name":"{name}","version":"1.0.0"}}"#).into_bytes();
    let files: Vec<(String, Vec<u8>)> = definitions
        .iter()
        .enumerate()
        .map(|(i, (url, version))| {
            (
                format!("package/StructureDefinition-{i}.json"),
                definition(url, version, name),
            )
        })
        .collect();

    let mut entries: Vec<(&str, &[u8])> = vec![("package/package.json", manifest.as_slice())];
    entries.extend(files.iter().map(|(path, data)| (path.as_str(), data.as_slice())));
    tar_gz(&entries)
}

/// A curated zip containing the given `(url, version)` definitions.
pub fn curated(definitions: &[(&str, &str)]) -> Vec<u8> {
    let files: Vec<(String, Vec<u8>)> = definitions
        .iter()
        .enumerate()
        .map(|(i, (url, version))| {
            (
                format!("Bundle/StructureDefinition-{i}.json"),
                definition(url, version, "curated"),
            )
        })
        .collect();
    let entries: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(path, data)| (path.as_str(), data.as_slice()))
        .collect();
    zip(&entries)
}

pub const FOO: &str = "http://example.org/StructureDefinition/Foo";
pub const SHARED: &str = "http://example.org/StructureDefinition/Shared";
pub const BASIS: &str = "http://example.org/StructureDefinition/Basis";
pub const PATCHED: &str = "http://example.org/StructureDefinition/Patched";

/// Two bundle versions, a shared base package and a curated archive.
pub fn deployment() -> MemoryArchiveSource {
    MemoryArchiveSource::new()
        .with_archive(
            "1.0.2/kbv.ita.eau-1.0.2.tgz",
            package("eau-1.0.2", &[(FOO, "1.0.2"), (SHARED, "1.0.2"), (PATCHED, "1.0.2")]),
        )
        .with_archive(
            "1.1.0/kbv.ita.eau-1.1.0.tgz",
            package("eau-1.1.0", &[(FOO, "1.1.0"), (PATCHED, "1.1.0")]),
        )
        .with_archive(
            "base/kbv.basis.tgz",
            package("basis", &[(BASIS, "1.3.0"), (SHARED, "1.3.0")]),
        )
        .with_archive("Bundle.zip", curated(&[(PATCHED, "1.1.0")]))
        .with_archive("README.md", b"not an archive".to_vec())
}

/// Counts how often archives are opened, to observe population.
pub struct CountingSource {
    inner: MemoryArchiveSource,
    opens: AtomicUsize,
}

impl CountingSource {
    pub fn new(inner: MemoryArchiveSource) -> Self {
        Self {
            inner,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ArchiveSource for CountingSource {
    fn names(&self) -> Result<Vec<String>> {
        self.inner.names()
    }

    fn open(&self, name: &str) -> Result<Option<Box<dyn Read + Send + '_>>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(name)
    }
}

/// Holds the first open of an archive under `prefix` until released.
///
/// `wait_until_blocked` returns once that open has started; `release` lets it
/// continue. Later opens pass straight through.
pub struct GatedSource {
    inner: MemoryArchiveSource,
    prefix: String,
    armed: AtomicBool,
    entered: Barrier,
    released: Barrier,
}

impl GatedSource {
    pub fn new(inner: MemoryArchiveSource, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.to_string(),
            armed: AtomicBool::new(true),
            entered: Barrier::new(2),
            released: Barrier::new(2),
        }
    }

    pub fn wait_until_blocked(&self) {
        self.entered.wait();
    }

    pub fn release(&self) {
        self.released.wait();
    }
}

impl ArchiveSource for GatedSource {
    fn names(&self) -> Result<Vec<String>> {
        self.inner.names()
    }

    fn open(&self, name: &str) -> Result<Option<Box<dyn Read + Send + '_>>> {
        if name.starts_with(&self.prefix) && self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.released.wait();
        }
        self.inner.open(name)
    }
}
