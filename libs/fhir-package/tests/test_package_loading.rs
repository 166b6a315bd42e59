//! Loading FHIR packages and curated archives from in-memory streams.

use fhirau_package::{
    load_curated_archive, FhirPackage, FhirParser, PackageDescriptor, PackageError,
};

mod test_support;

use test_support::{definition, tar_gz, zip};

#[test]
fn demo_package_yields_descriptor_and_resources() {
    let archive = tar_gz(&[
        ("package/", b""),
        (
            "package/package.json",
            br#"{"name":"demo","version":"1.0.0","dependencies":{"base":"1.0.0"}}"#,
        ),
        (
            "package/StructureDefinition-Foo.json",
            br#"{"url":"http://example.org/Foo","version":"2.0"}"#,
        ),
    ]);

    let package = FhirPackage::from_tar_gz_bytes(&archive, &FhirParser).expect("loads");

    assert_eq!(package.descriptor.name, "demo");
    assert_eq!(package.descriptor.version, "1.0.0");
    assert_eq!(package.descriptor.dependencies, vec!["base|1.0.0".to_string()]);
    assert_eq!(package.resources.len(), 1);
    assert_eq!(package.resources[0].url(), "http://example.org/Foo");
    assert_eq!(package.resources[0].version(), "2.0");
}

#[test]
fn bad_entry_is_dropped_and_loading_continues() {
    let good_a = definition("http://example.org/A", "1.0");
    let good_b = definition("http://example.org/B", "1.0");
    let archive = tar_gz(&[
        ("package/StructureDefinition-A.json", good_a.as_slice()),
        ("package/Bad.json", b"\x00\x01 this is not json"),
        ("package/StructureDefinition-B.json", good_b.as_slice()),
    ]);

    let package = FhirPackage::from_tar_gz_bytes(&archive, &FhirParser).expect("loads");
    let urls: Vec<&str> = package.resources.iter().map(|r| r.url()).collect();

    assert_eq!(urls, vec!["http://example.org/A", "http://example.org/B"]);
}

#[test]
fn only_direct_json_children_of_package_are_harvested() {
    let direct = definition("http://example.org/Direct", "1");
    let nested = definition("http://example.org/Nested", "1");
    let outside = definition("http://example.org/Outside", "1");
    let xml = br#"<ValueSet xmlns="http://hl7.org/fhir"><url value="http://example.org/Xml"/></ValueSet>"#;
    let index = br#"{"index-version":1,"url":"http://example.org/Index","files":[]}"#;
    let no_url = br#"{"resourceType":"ImplementationGuide","id":"ig"}"#;

    let archive = tar_gz(&[
        ("PACKAGE/StructureDefinition-Direct.JSON", direct.as_slice()),
        ("package/examples/StructureDefinition-Nested.json", nested.as_slice()),
        ("other/StructureDefinition-Outside.json", outside.as_slice()),
        ("package/ValueSet-Xml.xml", xml),
        ("package/.index.json", index),
        ("package/ImplementationGuide-ig.json", no_url),
        ("package/other/package.json", br#"{"name":"shadow"}"#),
    ]);

    let package = FhirPackage::from_tar_gz_bytes(&archive, &FhirParser).expect("loads");
    let urls: Vec<&str> = package.resources.iter().map(|r| r.url()).collect();

    assert_eq!(urls, vec!["http://example.org/Direct"]);
    assert_eq!(package.descriptor.name, "");
}

#[test]
fn missing_manifest_keeps_empty_descriptor() {
    let foo = definition("http://example.org/Foo", "1");
    let archive = tar_gz(&[("package/StructureDefinition-Foo.json", foo.as_slice())]);

    let package = FhirPackage::from_tar_gz_bytes(&archive, &FhirParser).expect("loads");

    assert_eq!(package.descriptor, PackageDescriptor::default());
    assert_eq!(package.resources.len(), 1);
}

#[test]
fn manifest_is_matched_case_insensitively() {
    let archive = tar_gz(&[(
        "package/Package.JSON",
        br#"{"name":"kbv.ita.eau","version":"1.1.0","description":"eAU","fhirVersions":["4.0.1"]}"#,
    )]);

    let package = FhirPackage::from_tar_gz_bytes(&archive, &FhirParser).expect("loads");

    assert_eq!(package.descriptor.name, "kbv.ita.eau");
    assert_eq!(package.descriptor.description, "eAU");
    assert_eq!(package.descriptor.fhir_versions, vec!["4.0.1".to_string()]);
    assert!(package.resources.is_empty());
}

#[test]
fn zip_container_is_rejected_as_package() {
    let archive = zip(&[("package/package.json", br#"{"name":"demo"}"#)]);

    let err = FhirPackage::from_tar_gz_bytes(&archive, &FhirParser).unwrap_err();

    assert!(matches!(err, PackageError::UnsupportedContainer(_)));
}

#[test]
fn gzip_without_tar_is_corrupt() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(br#"{"name":"not a tarball"}"#)
        .unwrap();
    let bytes = encoder.finish().unwrap();

    let err = FhirPackage::from_tar_gz_bytes(&bytes, &FhirParser).unwrap_err();

    assert!(matches!(err, PackageError::CorruptArchive(_)));
}

#[test]
fn curated_archive_accepts_json_and_xml_at_any_depth() {
    let json = definition("http://example.org/Json", "1.0");
    let xml = br#"<CodeSystem xmlns="http://hl7.org/fhir"><url value="http://example.org/Xml"/><version value="1.1.0"/></CodeSystem>"#;
    let archive = zip(&[
        ("Bundle/", b""),
        ("Bundle/StructureDefinition-Json.json", json.as_slice()),
        ("Bundle/nested/CodeSystem-Xml.xml", xml),
        ("Bundle/notes.txt", b"not a resource"),
        ("Bundle/Broken.xml", b"<CodeSystem>"),
    ]);

    let resources = load_curated_archive(archive.as_slice(), &FhirParser).expect("loads");
    let keys: Vec<String> = resources.iter().map(|r| r.versioned_key()).collect();

    assert_eq!(
        keys,
        vec![
            "http://example.org/Json|1.0".to_string(),
            "http://example.org/Xml|1.1.0".to_string()
        ]
    );
}

#[test]
fn curated_archive_must_be_zip() {
    let archive = tar_gz(&[("package/package.json", br#"{"name":"demo"}"#)]);

    let err = load_curated_archive(archive.as_slice(), &FhirParser).unwrap_err();

    assert!(matches!(err, PackageError::Zip(_)));
}
