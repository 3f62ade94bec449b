//! The class loader abstraction.
//!
//! Loaders form a single-owner chain through `parent()`, which always returns
//! the constructing parent. There is no second, cosmetic parent notion, so
//! walking a chain for teardown needs no special cases. Classes are "defined"
//! by producing a `ClassDefinition` stamped with the defining loader's id;
//! two definitions of the same name from different loaders coexist because
//! their ids differ.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::archive::{JarHandle, lock};
use crate::classfile;
use crate::error::LoadError;

static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one loader instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LoaderId(u64);

impl LoaderId {
    pub fn next() -> Self {
        Self(NEXT_LOADER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loader#{}", self.0)
    }
}

/// Where a resource's bytes came from.
#[derive(Debug, Clone)]
pub enum ResourceOrigin {
    Archive(Arc<JarHandle>),
    File(PathBuf),
}

impl ResourceOrigin {
    pub fn path(&self) -> PathBuf {
        match self {
            Self::Archive(handle) => handle.path().to_path_buf(),
            Self::File(path) => path.clone(),
        }
    }
}

/// A fully read resource plus its origin, so callers can track the archive
/// handle it was served from.
#[derive(Debug, Clone)]
pub struct Resource {
    /// The path the resource was found under, including any world prefix.
    pub path: String,
    pub bytes: Vec<u8>,
    pub origin: ResourceOrigin,
}

impl Resource {
    pub fn archive_handle(&self) -> Option<&Arc<JarHandle>> {
        match &self.origin {
            ResourceOrigin::Archive(handle) => Some(handle),
            ResourceOrigin::File(_) => None,
        }
    }
}

/// A defined class: validated bytes plus the identity of the loader that
/// defined them.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDefinition {
    pub name: String,
    pub package: Option<String>,
    pub major_version: u16,
    pub size: usize,
    pub sha256: String,
    pub defined_by: LoaderId,
    pub origin: Option<PathBuf>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

pub trait ClassLoader: Send + Sync {
    fn id(&self) -> LoaderId;

    /// The constructing parent, or `None` for a root loader.
    fn parent(&self) -> Option<Arc<dyn ClassLoader>>;

    /// Locates and defines a class from this loader's own space, without
    /// consulting the parent.
    fn find_class(&self, name: &str) -> Result<ClassDefinition, LoadError>;

    /// Locates a resource in this loader's own space.
    fn find_resource(&self, path: &str) -> Result<Option<Resource>, LoadError>;

    /// All matches for `path` in this loader's own space.
    fn find_resources(&self, path: &str) -> Result<Vec<Resource>, LoadError>;

    /// Parent-first class resolution.
    fn load_class(&self, name: &str) -> Result<ClassDefinition, LoadError> {
        if let Some(parent) = self.parent() {
            match parent.load_class(name) {
                Ok(def) => return Ok(def),
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
        }
        self.find_class(name)
    }

    /// Parent-first resource resolution.
    fn get_resource(&self, path: &str) -> Result<Option<Resource>, LoadError> {
        if let Some(parent) = self.parent() {
            if let Some(found) = parent.get_resource(path)? {
                return Ok(Some(found));
            }
        }
        self.find_resource(path)
    }

    /// Parent matches first, then this loader's own.
    fn get_resources(&self, path: &str) -> Result<Vec<Resource>, LoadError> {
        let mut out = match self.parent() {
            Some(parent) => parent.get_resources(path)?,
            None => Vec::new(),
        };
        out.extend(self.find_resources(path)?);
        Ok(out)
    }

    /// Releases whatever this loader holds open. Loaders with nothing to
    /// release keep this default.
    fn close(&self) -> Result<(), LoadError> {
        Ok(())
    }
}

impl fmt::Debug for dyn ClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Validates class bytes and produces the definition. The declared binary
/// name must round-trip to the requested one; the class's package is recorded
/// in `packages` (name only, no sealing or version metadata) the first time
/// it is seen.
pub fn define_class(
    defined_by: LoaderId,
    packages: &Mutex<BTreeSet<String>>,
    name: &str,
    bytes: Vec<u8>,
    origin: Option<PathBuf>,
) -> Result<ClassDefinition, LoadError> {
    let info = classfile::inspect(name, &bytes)?;
    if info.binary_name != name {
        return Err(LoadError::NameMismatch {
            requested: name.to_string(),
            declared: info.binary_name,
        });
    }

    let package = name.rsplit_once('.').map(|(pkg, _)| pkg.to_string());
    if let Some(pkg) = &package {
        let mut defined = lock(packages);
        if !defined.contains(pkg) {
            defined.insert(pkg.clone());
        }
    }

    let sha256 = hex::encode(Sha256::digest(&bytes));
    Ok(ClassDefinition {
        name: name.to_string(),
        package,
        major_version: info.major_version,
        size: bytes.len(),
        sha256,
        defined_by,
        origin,
        bytes,
    })
}

/// Walks from `from` toward the chain's root via constructing parents,
/// closing each loader, stopping before (and never closing) `boundary`.
/// Every loader is attempted even after a close failure; the last failure
/// is surfaced.
pub fn close_chain(
    from: Option<Arc<dyn ClassLoader>>,
    boundary: &Arc<dyn ClassLoader>,
) -> Result<(), LoadError> {
    let mut cursor = from;
    let mut last_err = None;
    while let Some(loader) = cursor {
        if loader.id() == boundary.id() {
            break;
        }
        if let Err(e) = loader.close() {
            last_err = Some(e);
        }
        cursor = loader.parent();
    }
    match last_err {
        None => Ok(()),
        Some(e) => Err(e),
    }
}
