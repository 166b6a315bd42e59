use crate::{PackageError, PackageResult, ResourceProxy};
use fhirau_format::ResourceParser;
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use std::io::{BufRead, BufReader, Read};
use tar::Archive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const PACKAGE_DIR: &str = "package";
const MANIFEST_FILE: &str = "package.json";
const INDEX_FILE: &str = ".index.json";

/// Package metadata read from `package/package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub fhir_versions: Vec<String>,
    /// Dependencies encoded as `name|versionConstraint`.
    pub dependencies: Vec<String>,
}

impl PackageDescriptor {
    /// Read a manifest. Absent fields default to empty values; `fhirVersions`
    /// falls back to the legacy `fhir-version-list` member.
    pub fn from_manifest(bytes: &[u8]) -> PackageResult<Self> {
        let manifest = fhirau_format::parse_json(bytes)?;
        let manifest = manifest.as_object().ok_or_else(|| {
            PackageError::InvalidManifest("package.json is not a JSON object".into())
        })?;

        let text = |key: &str| manifest.get(key).and_then(node_text).unwrap_or_default();

        let fhir_versions = manifest
            .get("fhirVersions")
            .and_then(Value::as_array)
            .or_else(|| manifest.get("fhir-version-list").and_then(Value::as_array))
            .map(|versions| versions.iter().filter_map(node_text).collect())
            .unwrap_or_default();

        let dependencies = manifest
            .get("dependencies")
            .and_then(Value::as_object)
            .map(encode_dependencies)
            .unwrap_or_default();

        Ok(Self {
            name: text("name"),
            version: text("version"),
            description: text("description"),
            fhir_versions,
            dependencies,
        })
    }

    /// `name#version`, the usual way packages are referred to.
    pub fn package_id(&self) -> String {
        format!("{}#{}", self.name, self.version)
    }
}

fn node_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn encode_dependencies(dependencies: &Map<String, Value>) -> Vec<String> {
    dependencies
        .iter()
        .map(|(name, constraint)| {
            let constraint = node_text(constraint).unwrap_or_default();
            format!("{name}|{constraint}")
                .chars()
                .filter(|&c| c != '"' && c != ' ')
                .collect()
        })
        .collect()
}

/// A loaded FHIR package: its descriptor and every canonical resource found
/// directly under `package/`.
#[derive(Debug, Clone, Default)]
pub struct FhirPackage {
    pub descriptor: PackageDescriptor,
    pub resources: Vec<ResourceProxy>,
}

impl FhirPackage {
    /// Load a package from a gzip-compressed tar stream.
    ///
    /// Resources keep archive order. Entries in sub-directories of `package/`
    /// (such as `package/examples/`) and non-JSON entries are ignored.
    pub fn from_tar_gz<R: Read>(reader: R, parser: &dyn ResourceParser) -> PackageResult<Self> {
        let mut reader = BufReader::new(reader);
        if !reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
            return Err(PackageError::UnsupportedContainer(
                "FHIR package must be a gzip-compressed tar archive".into(),
            ));
        }

        let mut archive = Archive::new(GzDecoder::new(reader));
        let mut package = Self::default();

        let entries = archive.entries().map_err(corrupt)?;
        for entry in entries {
            let mut entry = entry.map_err(corrupt)?;
            if entry.header().entry_type().is_dir() {
                continue;
            }

            let path = entry.path().map_err(corrupt)?.to_string_lossy().into_owned();
            let Some(file_name) = package_member(&path) else {
                continue;
            };
            if file_name.eq_ignore_ascii_case(INDEX_FILE) {
                continue;
            }

            let is_manifest = file_name.eq_ignore_ascii_case(MANIFEST_FILE);
            let is_json = file_name
                .rsplit_once('.')
                .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("json"));
            if !is_manifest && !is_json {
                continue;
            }

            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).map_err(corrupt)?;

            if is_manifest {
                package.descriptor = PackageDescriptor::from_manifest(&contents)?;
            } else if let Some(proxy) = ResourceProxy::create(&path, &contents, parser) {
                package.resources.push(proxy);
            }
        }

        tracing::debug!(
            package = %package.descriptor.package_id(),
            resources = package.resources.len(),
            "Loaded FHIR package"
        );
        Ok(package)
    }

    /// Load a package from tar.gz bytes.
    pub fn from_tar_gz_bytes(bytes: &[u8], parser: &dyn ResourceParser) -> PackageResult<Self> {
        Self::from_tar_gz(bytes, parser)
    }

    pub fn into_resources(self) -> Vec<ResourceProxy> {
        self.resources
    }
}

fn corrupt(e: std::io::Error) -> PackageError {
    PackageError::CorruptArchive(e.to_string())
}

/// File name of an entry whose parent directory is `package` (any case).
fn package_member(path: &str) -> Option<&str> {
    let path = path.trim_start_matches("./");
    let (dir, file_name) = path.rsplit_once(['/', '\\'])?;
    (dir.eq_ignore_ascii_case(PACKAGE_DIR) && !file_name.is_empty()).then_some(file_name)
}
