//! Versioned canonical resource resolution over embedded FHIR packages.
//!
//! The resolver answers "which StructureDefinition, ValueSet, ... has this
//! canonical url" for a validator. Resources come from FHIR package archives
//! (`.tgz`) grouped into bundle versions, plus a curated zip of corrections
//! that always wins.
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirau_resolver::{
//!     DirectoryArchiveSource, LocalResourceResolver, ResolverConfig, ResourceResolver,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = LocalResourceResolver::new(
//!     ResolverConfig::default(),
//!     DirectoryArchiveSource::new("packages"),
//! );
//! resolver.set_bundle_version("1.0.2");
//! let resource = resolver
//!     .resolve_by_canonical_uri("https://fhir.kbv.de/StructureDefinition/KBV_PR_EAU_Bundle|1.0.2")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod partition;
pub mod profile;
pub mod resolver;
pub mod source;
pub mod traits;

pub use config::{BundleVersionRule, ResolverConfig};
pub use error::{Error, Result};
pub use partition::Partition;
pub use profile::BundleVersionDetector;
pub use resolver::LocalResourceResolver;
pub use source::{ArchiveSource, DirectoryArchiveSource, MemoryArchiveSource};
pub use traits::{AsyncResourceResolver, ResourceResolver};

pub use fhirau_package::ResourceProxy;
