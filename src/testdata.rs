//! Shared fixtures for unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!(
        "class_world_test_{}_{}_{}_{}",
        std::process::id(),
        nanos,
        COUNTER.fetch_add(1, Ordering::Relaxed),
        name
    )
}

pub(crate) fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(unique(name))
}

pub(crate) fn temp_dir(name: &str) -> PathBuf {
    let dir = temp_path(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Minimal but structurally valid class file: magic, versions, a constant
/// pool holding this class and java/lang/Object, and empty member tables.
/// `internal_name` uses slash form, e.g. `org/example/Foo`.
pub(crate) fn class_bytes(internal_name: &str, major: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // minor
    out.extend_from_slice(&major.to_be_bytes());

    out.extend_from_slice(&5u16.to_be_bytes()); // constant pool count
    // #1 Utf8 this class name
    out.push(1);
    out.extend_from_slice(&(internal_name.len() as u16).to_be_bytes());
    out.extend_from_slice(internal_name.as_bytes());
    // #2 Class -> #1
    out.push(7);
    out.extend_from_slice(&1u16.to_be_bytes());
    // #3 Utf8 super class name
    let object = b"java/lang/Object";
    out.push(1);
    out.extend_from_slice(&(object.len() as u16).to_be_bytes());
    out.extend_from_slice(object);
    // #4 Class -> #3
    out.push(7);
    out.extend_from_slice(&3u16.to_be_bytes());

    out.extend_from_slice(&0x0021u16.to_be_bytes()); // access flags
    out.extend_from_slice(&2u16.to_be_bytes()); // this_class
    out.extend_from_slice(&4u16.to_be_bytes()); // super_class
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    out.extend_from_slice(&0u16.to_be_bytes()); // fields
    out.extend_from_slice(&0u16.to_be_bytes()); // methods
    out.extend_from_slice(&0u16.to_be_bytes()); // attributes
    out
}
