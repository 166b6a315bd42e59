//! FHIR NPM package archives as sources of canonical resources.
//!
//! - [`ResourceProxy`] pairs a parsed resource with its canonical identity.
//! - [`FhirPackage`] reads a `.tgz` package: the `package/package.json`
//!   manifest and every definition beside it.
//! - [`load_curated_archive`] reads a hand-maintained zip of override resources.
//!
//! Individual definitions that fail to parse or carry no `url` are dropped
//! without an error. Archives in the wrong container format are fatal.

mod curated;
mod package;
mod proxy;

pub use curated::load_curated_archive;
pub use package::{FhirPackage, PackageDescriptor};
pub use proxy::ResourceProxy;

pub use fhirau_format::{FhirParser, ResourceFormat, ResourceParser};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported container: {0}")]
    UnsupportedContainer(String),
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("Manifest parse error: {0}")]
    Format(#[from] fhirau_format::FormatError),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type PackageResult<T> = Result<T, PackageError>;
