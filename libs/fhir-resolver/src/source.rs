//! Archive sources: where package and curated archives come from.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Named binary archives available to the resolver.
pub trait ArchiveSource: Send + Sync {
    /// All archive names this source can open.
    fn names(&self) -> Result<Vec<String>>;

    /// Open an archive by name, `None` if the source has no such archive.
    fn open(&self, name: &str) -> Result<Option<Box<dyn Read + Send + '_>>>;
}

impl<T: ArchiveSource + ?Sized> ArchiveSource for Arc<T> {
    fn names(&self) -> Result<Vec<String>> {
        (**self).names()
    }

    fn open(&self, name: &str) -> Result<Option<Box<dyn Read + Send + '_>>> {
        (**self).open(name)
    }
}

/// Archives held in memory, e.g. embedded with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchiveSource {
    archives: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryArchiveSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.archives.insert(name.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }
}

impl ArchiveSource for MemoryArchiveSource {
    fn names(&self) -> Result<Vec<String>> {
        Ok(self.archives.keys().cloned().collect())
    }

    fn open(&self, name: &str) -> Result<Option<Box<dyn Read + Send + '_>>> {
        Ok(self
            .archives
            .get(name)
            .map(|bytes| Box::new(&bytes[..]) as Box<dyn Read + Send + '_>))
    }
}

/// Archives below a directory. Names are `/`-separated paths relative to the root.
#[derive(Debug, Clone)]
pub struct DirectoryArchiveSource {
    root: PathBuf,
}

impl DirectoryArchiveSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Symlinked directories are not descended into.
    fn collect(&self, dir: &Path, names: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.collect(&path, names)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                names.push(name);
            }
        }
        Ok(())
    }
}

impl ArchiveSource for DirectoryArchiveSource {
    fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.collect(&self.root, &mut names)
            .map_err(|source| Error::ArchiveDirectory {
                path: self.root.clone(),
                source,
            })?;
        names.sort();
        Ok(names)
    }

    fn open(&self, name: &str) -> Result<Option<Box<dyn Read + Send + '_>>> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Box::new(BufReader::new(File::open(path)?))))
    }
}
