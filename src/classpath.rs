//! Root loader over an ordered list of jar files and directories.
//!
//! This is the loader everything else delegates to: it owns the open jar
//! handles for its roots and serves raw resource bytes. Jars are indexed in
//! parallel when the loader is built over many of them.

use rayon::prelude::*;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::archive::JarHandle;
use crate::error::LoadError;
use crate::loader::{
    ClassDefinition, ClassLoader, LoaderId, Resource, ResourceOrigin, define_class,
};

/// Binary class name to resource path: `a.b.C` -> `a/b/C.class`.
pub fn class_resource_path(name: &str) -> String {
    format!("{}.class", name.replace('.', "/"))
}

#[derive(Debug)]
enum Root {
    Jar(Arc<JarHandle>),
    Dir(PathBuf),
}

#[derive(Debug)]
pub struct ClassPathLoader {
    id: LoaderId,
    parent: Option<Arc<dyn ClassLoader>>,
    roots: Vec<Root>,
    packages: Mutex<BTreeSet<String>>,
}

impl ClassPathLoader {
    /// Builds a loader over `paths` in order. Directories are used as-is;
    /// everything else is opened as a jar.
    pub fn new(parent: Option<Arc<dyn ClassLoader>>, paths: &[PathBuf]) -> Result<Self, LoadError> {
        let roots = paths
            .par_iter()
            .map(|path| {
                if path.is_dir() {
                    Ok(Root::Dir(path.clone()))
                } else {
                    JarHandle::open(path).map(Root::Jar)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: LoaderId::next(),
            parent,
            roots,
            packages: Mutex::new(BTreeSet::new()),
        })
    }

    /// The jar handles this loader opened, in root order.
    pub fn jar_handles(&self) -> Vec<Arc<JarHandle>> {
        self.roots
            .iter()
            .filter_map(|root| match root {
                Root::Jar(handle) => Some(handle.clone()),
                Root::Dir(_) => None,
            })
            .collect()
    }

    fn read_root(&self, root: &Root, path: &str) -> Result<Option<Resource>, LoadError> {
        match root {
            Root::Jar(handle) => {
                if !handle.contains(path) {
                    return Ok(None);
                }
                let Some(bytes) = handle.read(path)? else {
                    return Ok(None);
                };
                Ok(Some(Resource {
                    path: path.to_string(),
                    bytes,
                    origin: ResourceOrigin::Archive(handle.clone()),
                }))
            }
            Root::Dir(dir) => {
                let full = dir.join(path);
                match std::fs::read(&full) {
                    Ok(bytes) => Ok(Some(Resource {
                        path: path.to_string(),
                        bytes,
                        origin: ResourceOrigin::File(full),
                    })),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(LoadError::io(full.display().to_string(), e)),
                }
            }
        }
    }
}

impl ClassLoader for ClassPathLoader {
    fn id(&self) -> LoaderId {
        self.id
    }

    fn parent(&self) -> Option<Arc<dyn ClassLoader>> {
        self.parent.clone()
    }

    fn find_class(&self, name: &str) -> Result<ClassDefinition, LoadError> {
        let path = class_resource_path(name);
        let resource = self
            .find_resource(&path)?
            .ok_or_else(|| LoadError::ClassNotFound(name.to_string()))?;
        let origin = resource.origin.path();
        define_class(self.id, &self.packages, name, resource.bytes, Some(origin))
    }

    fn find_resource(&self, path: &str) -> Result<Option<Resource>, LoadError> {
        for root in &self.roots {
            if let Some(found) = self.read_root(root, path)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn find_resources(&self, path: &str) -> Result<Vec<Resource>, LoadError> {
        let mut out = Vec::new();
        for root in &self.roots {
            if let Some(found) = self.read_root(root, path)? {
                out.push(found);
            }
        }
        Ok(out)
    }

    fn close(&self) -> Result<(), LoadError> {
        let mut last_err = None;
        for root in &self.roots {
            if let Root::Jar(handle) = root {
                if let Err(e) = handle.close() {
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
