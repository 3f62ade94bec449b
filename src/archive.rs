//! Open jar handles and the handle set used for loader teardown.
//!
//! A `JarHandle` keeps one jar mapped read-only and carries a pre-built entry
//! name index. Loaders that read through a handle register it in a
//! `HandleSet`; closing the set releases every mapping exactly once.

use anyhow::Context;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use zip::ZipArchive;

use crate::error::LoadError;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open, mmap-backed jar. `close()` drops the mapping; a later read
/// re-opens it, so a handle shared across loaders survives one loader's
/// teardown.
#[derive(Debug)]
pub struct JarHandle {
    path: PathBuf,
    canonical: PathBuf,
    names: Vec<String>,
    state: Mutex<Option<Mmap>>,
}

impl JarHandle {
    pub fn open(path: &Path) -> Result<Arc<Self>, LoadError> {
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| LoadError::io(path.display().to_string(), e))?;
        let mmap = map_file(path)?;
        let mut names: Vec<String> = {
            let archive = ZipArchive::new(Cursor::new(&mmap[..]))
                .map_err(|e| LoadError::io(path.display().to_string(), zip_to_io(e)))?;
            archive.file_names().map(str::to_string).collect()
        };
        names.sort_unstable();

        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            canonical,
            names,
            state: Mutex::new(Some(mmap)),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical path, the identity handles are deduplicated by.
    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    /// Entry names in sorted order.
    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(entry)).is_ok()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).is_some()
    }

    /// Reads one entry fully into memory. Returns `Ok(None)` if the entry
    /// does not exist. Re-opens the mapping if the handle was closed.
    pub fn read(&self, entry: &str) -> Result<Option<Vec<u8>>, LoadError> {
        let mut state = lock(&self.state);
        if state.is_none() {
            *state = Some(map_file(&self.path)?);
        }
        let mmap = state.as_ref().ok_or_else(|| {
            LoadError::io(
                self.path.display().to_string(),
                io::Error::other("jar handle closed"),
            )
        })?;

        let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
            .map_err(|e| LoadError::io(self.path.display().to_string(), zip_to_io(e)))?;
        match archive.by_name(entry) {
            Ok(mut file) => {
                let mut buf = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut buf)
                    .map_err(|e| LoadError::io(format!("{}!{entry}", self.path.display()), e))?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(LoadError::io(
                format!("{}!{entry}", self.path.display()),
                zip_to_io(e),
            )),
        }
    }

    /// Releases the mapping. Idempotent: a handle that is already closed
    /// stays closed without error.
    pub fn close(&self) -> Result<(), LoadError> {
        lock(&self.state).take();
        Ok(())
    }
}

/// Thread-safe set of jar handles, deduplicated by canonical path.
#[derive(Debug, Default)]
pub struct HandleSet {
    inner: Mutex<HashMap<PathBuf, Arc<JarHandle>>>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent per unique canonical path.
    pub fn register(&self, handle: Arc<JarHandle>) {
        lock(&self.inner)
            .entry(handle.canonical_path().to_path_buf())
            .or_insert(handle);
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Closes and drains every registered handle while holding the set lock,
    /// so lookups racing with teardown cannot slip a handle past the close.
    /// Every handle is attempted even after a failure; the last failure is
    /// surfaced. Calling this twice is a no-op the second time.
    pub fn close_all(&self) -> Result<(), LoadError> {
        let mut inner = lock(&self.inner);
        let mut last_err = None;
        for (_, handle) in inner.drain() {
            if let Err(e) = handle.close() {
                last_err = Some(e);
            }
        }
        match last_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

fn map_file(path: &Path) -> Result<Mmap, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::io(path.display().to_string(), e))?;
    // SAFETY: The file is opened read-only and the mapping is dropped before
    // any truncation this process could perform.
    unsafe { Mmap::map(&file) }.map_err(|e| LoadError::io(path.display().to_string(), e))
}

fn zip_to_io(e: zip::result::ZipError) -> io::Error {
    match e {
        zip::result::ZipError::Io(io) => io,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Writes a jar from `(entry name, bytes)` pairs, creating parent
/// directories as needed.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create jar: {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}
