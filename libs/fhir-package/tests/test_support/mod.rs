//! In-memory archive builders shared by the integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};
use tar::{Builder, EntryType, Header};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Build a tar.gz archive. Paths ending in `/` become directory entries.
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in entries {
        let mut header = Header::new_gnu();
        if path.ends_with('/') {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder
                .append_data(&mut header, path, std::io::empty())
                .expect("append directory");
        } else {
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            builder
                .append_data(&mut header, path, *data)
                .expect("append file");
        }
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

/// Build a zip archive. Paths ending in `/` become directory entries.
pub fn zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (path, data) in entries {
        if path.ends_with('/') {
            writer.add_directory(*path, options).expect("add directory");
        } else {
            writer.start_file(*path, options).expect("start file");
            writer.write_all(data).expect("write file");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn definition(url: &str, version: &str) -> Vec<u8> {
    format!(
        r#"{{"resourceType":"StructureDefinition","url":"{url}","version":"{version}"}}"#
    )
    .into_bytes()
}
