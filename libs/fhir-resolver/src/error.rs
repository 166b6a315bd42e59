//! Error types for the resource resolver

use fhirau_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported bundle version '{selector}' (supported: {})", .supported.join(", "))]
    UnknownBundleVersion {
        selector: String,
        supported: Vec<String>,
    },

    #[error("Archive not found: {0}")]
    MissingArchive(String),

    #[error("No package archives under '{archive_prefix}' for bundle version '{selector}'")]
    NoPackages {
        selector: String,
        archive_prefix: String,
    },

    #[error("Cannot list archive directory {}: {source}", .path.display())]
    ArchiveDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load archive {archive}: {source}")]
    Package {
        archive: String,
        #[source]
        source: PackageError,
    },

    #[error("Invalid resolver configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
