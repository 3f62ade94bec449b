//! # class-world
//!
//! Isolated dual-version class loading for Java artifacts: two classes with
//! the same fully-qualified name can be defined side by side in one process,
//! one from the artifact's normal location and one from a "parallel world"
//! reached through a fixed resource prefix.
//!
//! ## Architecture
//!
//! - **error**: typed failure taxonomy for loading and task execution
//! - **archive**: mmap-backed jar handles and the teardown handle set
//! - **classfile**: class-file header inspection (magic, version, name)
//! - **loader**: the `ClassLoader` trait, class definitions, chain teardown
//! - **classpath**: root loader over jar files and directories
//! - **world**: parallel-world loader remapping lookups under a prefix
//! - **mask**: masking loader vetoing configured class name prefixes
//! - **context**: thread-scoped ambient loader slot
//! - **element**: declarative configuration tree replayed onto delegates
//! - **task**: isolated task execution with guaranteed chain teardown
//! - **scan**: jar discovery in Maven repository structure
//! - **config**: CLI default path resolution
//! - **cli**: command-line interface definitions

pub mod archive;
pub mod classfile;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod loader;
pub mod mask;
pub mod scan;
pub mod task;
pub mod world;

#[cfg(test)]
pub(crate) mod testdata;
