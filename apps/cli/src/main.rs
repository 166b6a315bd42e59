//! fhirau - resolve canonical FHIR resources from local package archives.

mod logging;
mod settings;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fhirau_format::{FhirParser, ResourceFormat, ResourceParser};
use fhirau_package::{load_curated_archive, FhirPackage, ResourceProxy};
use fhirau_resolver::{
    BundleVersionDetector, DirectoryArchiveSource, LocalResourceResolver, ResourceResolver,
};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use settings::Settings;

#[derive(Parser)]
#[command(name = "fhirau", version, about = "Versioned FHIR resource resolver")]
struct Cli {
    /// Settings file (TOML); ignored when absent
    #[arg(long, global = true, default_value = "fhirau.toml")]
    config: PathBuf,

    /// Directory with package archives (overrides settings)
    #[arg(long, global = true)]
    packages: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve canonical urls (`url` or `url|version`) and print the resources
    Resolve {
        /// Bundle version to resolve against (defaults to the configured one)
        #[arg(long, short = 'b')]
        bundle_version: Option<String>,

        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Show the manifest and canonical resources of a .tgz package or curated .zip
    Inspect { archive: PathBuf },
    /// Detect the bundle version a JSON or XML document declares
    Detect { document: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config).context("Failed to load settings")?;
    if let Some(packages) = cli.packages {
        settings.packages_dir = packages;
    }
    if cli.json_logs {
        settings.logging.json = true;
    }

    logging::init_logging(&settings.logging).context("Failed to initialize logging")?;

    match cli.command {
        Command::Resolve {
            bundle_version,
            urls,
        } => resolve(&settings, bundle_version, &urls),
        Command::Inspect { archive } => inspect(&archive),
        Command::Detect { document } => detect(&settings, &document),
    }
}

fn resolve(settings: &Settings, bundle_version: Option<String>, urls: &[String]) -> anyhow::Result<()> {
    tracing::info!(
        packages_dir = %settings.packages_dir.display(),
        "Resolving against local packages"
    );
    let resolver = LocalResourceResolver::new(
        settings.resolver.clone(),
        DirectoryArchiveSource::new(&settings.packages_dir),
    );
    if let Some(version) = bundle_version {
        resolver.set_bundle_version(version);
    }

    let mut missing = Vec::new();
    for url in urls {
        match resolver.resolve_by_canonical_uri(url)? {
            Some(resource) => println!("{}", serde_json::to_string_pretty(resource.as_ref())?),
            None => missing.push(url.as_str()),
        }
    }

    if !missing.is_empty() {
        bail!(
            "Not found in bundle version {}: {}",
            resolver.bundle_version(),
            missing.join(", ")
        );
    }
    Ok(())
}

fn inspect(archive: &Path) -> anyhow::Result<()> {
    let reader = BufReader::new(
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?,
    );

    let is_zip = archive
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    let resources = if is_zip {
        load_curated_archive(reader, &FhirParser)?
    } else {
        let package = FhirPackage::from_tar_gz(reader, &FhirParser)?;
        let descriptor = &package.descriptor;
        println!("name:         {}", descriptor.name);
        println!("version:      {}", descriptor.version);
        println!("description:  {}", descriptor.description);
        println!("fhirVersions: {}", descriptor.fhir_versions.join(", "));
        println!("dependencies: {}", descriptor.dependencies.join(", "));
        package.into_resources()
    };

    println!("resources:    {}", resources.len());
    for proxy in &resources {
        println!("  {}", describe(proxy));
    }
    Ok(())
}

fn describe(proxy: &ResourceProxy) -> String {
    let resource_type = proxy.resource_type().unwrap_or("?");
    if proxy.version().is_empty() {
        format!("{resource_type} {}", proxy.url())
    } else {
        format!("{resource_type} {}", proxy.versioned_key())
    }
}

fn detect(settings: &Settings, document: &Path) -> anyhow::Result<()> {
    let name = document.to_string_lossy();
    let Some(format) = ResourceFormat::from_path(&name) else {
        bail!("Unsupported document format: {name} (expected .json or .xml)");
    };

    let bytes = fs::read(document).with_context(|| format!("Failed to read {name}"))?;
    let parsed = FhirParser
        .parse(format, &bytes)
        .with_context(|| format!("Failed to parse {name}"))?;

    match BundleVersionDetector::from_config(&settings.resolver).detect(&parsed) {
        Some(version) => {
            println!("{version}");
            Ok(())
        }
        None => bail!(
            "{name} declares no profile starting with {}",
            settings.resolver.profile_prefix
        ),
    }
}
