use crate::{PackageResult, ResourceProxy};
use fhirau_format::ResourceParser;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Load every canonical resource from a curated zip archive.
///
/// Unlike a FHIR package, the archive has no manifest and no fixed layout:
/// each file at any depth is a candidate, in either JSON or XML form.
/// Entries keep the order of the zip directory.
pub fn load_curated_archive<R: Read>(
    mut reader: R,
    parser: &dyn ResourceParser,
) -> PackageResult<Vec<ResourceProxy>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut resources = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        if let Some(proxy) = ResourceProxy::create(&name, &contents, parser) {
            resources.push(proxy);
        }
    }

    tracing::debug!(resources = resources.len(), "Loaded curated archive");
    Ok(resources)
}
