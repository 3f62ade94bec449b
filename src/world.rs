//! Parallel-world class loading.
//!
//! A parallel world is a copy of a class tree living under a fixed resource
//! prefix inside the same artifact. With the following jar:
//!
//! ```text
//! /
//! +- com/sun/tools/Driver.class        (new API, publicly visible)
//! +- 1.0/com/sun/tools/Driver.class    (old API, parallel world)
//! ```
//!
//! a `ParallelWorldLoader` with prefix `"1.0/"` defines `com.sun.tools.Driver`
//! from `1.0/com/sun/tools/Driver.class`, so both versions of the class can
//! be live in one process, told apart by their defining loader. Combine with
//! a `MaskingLoader` as the parent so the publicly visible copy cannot leak
//! through parent-first delegation.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::archive::{HandleSet, JarHandle};
use crate::classpath::class_resource_path;
use crate::error::LoadError;
use crate::loader::{ClassDefinition, ClassLoader, LoaderId, Resource, define_class};

pub struct ParallelWorldLoader {
    id: LoaderId,
    parent: Arc<dyn ClassLoader>,
    /// `"1.0/"`-style prefix, or `""` to load from the normal location.
    prefix: String,
    packages: Mutex<BTreeSet<String>>,
    handles: HandleSet,
}

impl ParallelWorldLoader {
    pub fn new(parent: Arc<dyn ClassLoader>, prefix: impl Into<String>) -> Self {
        Self {
            id: LoaderId::next(),
            parent,
            prefix: prefix.into(),
            packages: Mutex::new(BTreeSet::new()),
            handles: HandleSet::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of archive handles registered for teardown so far.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    fn prefixed(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    /// Opportunistic bookkeeping: remember the archive a resource was served
    /// from so `close()` can release it. Never fails a lookup.
    fn register_origin(&self, resource: &Resource) {
        if let Some(handle) = resource.archive_handle() {
            self.handles.register(handle.clone());
        }
    }
}

impl ClassLoader for ParallelWorldLoader {
    fn id(&self) -> LoaderId {
        self.id
    }

    fn parent(&self) -> Option<Arc<dyn ClassLoader>> {
        Some(self.parent.clone())
    }

    fn find_class(&self, name: &str) -> Result<ClassDefinition, LoadError> {
        let path = self.prefixed(&class_resource_path(name));

        // Resolve through the parent's RESOURCE lookup, never its class
        // lookup: the parent must not get a chance to define this name.
        let resource = match self.parent.get_resource(&path) {
            Ok(Some(resource)) => resource,
            // absent and unreadable both collapse to not-found
            Ok(None) | Err(_) => return Err(LoadError::ClassNotFound(name.to_string())),
        };

        self.register_origin(&resource);
        let origin = resource.origin.path();
        define_class(self.id, &self.packages, name, resource.bytes, Some(origin))
    }

    fn find_resource(&self, path: &str) -> Result<Option<Resource>, LoadError> {
        let found = self.parent.get_resource(&self.prefixed(path))?;
        if let Some(resource) = &found {
            self.register_origin(resource);
        }
        Ok(found)
    }

    fn find_resources(&self, path: &str) -> Result<Vec<Resource>, LoadError> {
        let found = self.parent.get_resources(&self.prefixed(path))?;
        for resource in &found {
            self.register_origin(resource);
        }
        Ok(found)
    }

    fn close(&self) -> Result<(), LoadError> {
        self.handles.close_all()
    }
}

/// Candidate parallel-world prefixes in a jar: top-level segments whose
/// subtree shadows class entries that also exist at the root.
pub fn detect_world_prefixes(handle: &JarHandle) -> Vec<String> {
    let names = handle.entry_names();
    let mut worlds = BTreeSet::new();
    for name in names {
        let Some((segment, rest)) = name.split_once('/') else {
            continue;
        };
        if !rest.ends_with(".class") {
            continue;
        }
        if handle.contains(rest) {
            worlds.insert(format!("{segment}/"));
        }
    }
    worlds.into_iter().collect()
}

/// Class names visible under `prefix` in a jar, prefix stripped, inner
/// classes skipped, sorted.
pub fn catalog_world(handle: &JarHandle, prefix: &str) -> Vec<String> {
    let mut classes: Vec<String> = handle
        .entry_names()
        .iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .filter(|rest| rest.ends_with(".class") && !rest.contains('$'))
        .map(|rest| rest.trim_end_matches(".class").replace('/', "."))
        .collect();
    classes.sort();
    classes
}
