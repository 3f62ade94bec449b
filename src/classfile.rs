//! Class-file header inspection.
//!
//! Reads just enough of a compiled class file to gate on the format version
//! and to recover the binary name the file declares: magic, version numbers,
//! and the constant pool up to `this_class`. No verification beyond that.

use crate::error::LoadError;

/// Highest class-file major version this tool accepts (Java 25).
pub const MAX_SUPPORTED_MAJOR: u16 = 69;

const MAGIC: u32 = 0xCAFE_BABE;

const CP_UTF8: u8 = 1;
const CP_INTEGER: u8 = 3;
const CP_FLOAT: u8 = 4;
const CP_LONG: u8 = 5;
const CP_DOUBLE: u8 = 6;
const CP_CLASS: u8 = 7;
const CP_STRING: u8 = 8;
const CP_FIELDREF: u8 = 9;
const CP_METHODREF: u8 = 10;
const CP_INTERFACE_METHODREF: u8 = 11;
const CP_NAME_AND_TYPE: u8 = 12;
const CP_METHOD_HANDLE: u8 = 15;
const CP_METHOD_TYPE: u8 = 16;
const CP_DYNAMIC: u8 = 17;
const CP_INVOKE_DYNAMIC: u8 = 18;
const CP_MODULE: u8 = 19;
const CP_PACKAGE: u8 = 20;

#[derive(Debug, Clone)]
pub struct ClassFileInfo {
    pub minor_version: u16,
    pub major_version: u16,
    /// Declared binary name in dotted form, e.g. `org.example.Foo`.
    pub binary_name: String,
}

/// Inspects `bytes` as a class file. `name` is only used to label errors.
pub fn inspect(name: &str, bytes: &[u8]) -> Result<ClassFileInfo, LoadError> {
    let mut r = Reader {
        name,
        bytes,
        pos: 0,
    };

    if r.u32()? != MAGIC {
        return Err(r.malformed("bad magic"));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;
    if major_version > MAX_SUPPORTED_MAJOR {
        return Err(LoadError::UnsupportedVersion {
            name: name.to_string(),
            found: major_version,
            max: MAX_SUPPORTED_MAJOR,
        });
    }

    let cp_count = r.u16()? as usize;
    let mut utf8: Vec<Option<String>> = vec![None; cp_count];
    let mut classes: Vec<Option<u16>> = vec![None; cp_count];

    let mut index = 1usize;
    while index < cp_count {
        let tag = r.u8()?;
        match tag {
            CP_UTF8 => {
                let len = r.u16()? as usize;
                let raw = r.take(len)?;
                // Java "modified UTF-8" diverges from UTF-8 only for NUL and
                // supplementary characters, neither of which occurs in names
                // we care about. Keep whatever decodes.
                utf8[index] = Some(String::from_utf8_lossy(raw).into_owned());
            }
            CP_CLASS => classes[index] = Some(r.u16()?),
            CP_STRING | CP_METHOD_TYPE | CP_MODULE | CP_PACKAGE => {
                r.skip(2)?;
            }
            CP_METHOD_HANDLE => r.skip(3)?,
            CP_INTEGER | CP_FLOAT | CP_FIELDREF | CP_METHODREF | CP_INTERFACE_METHODREF
            | CP_NAME_AND_TYPE | CP_DYNAMIC | CP_INVOKE_DYNAMIC => r.skip(4)?,
            CP_LONG | CP_DOUBLE => {
                r.skip(8)?;
                // 8-byte constants occupy two constant pool slots.
                index += 1;
            }
            other => {
                return Err(r.malformed(&format!("unknown constant pool tag {other}")));
            }
        }
        index += 1;
    }

    let _access_flags = r.u16()?;
    let this_class = r.u16()? as usize;

    let name_index = classes
        .get(this_class)
        .copied()
        .flatten()
        .ok_or_else(|| r.malformed("this_class does not point at a class constant"))?
        as usize;
    let internal = utf8
        .get(name_index)
        .cloned()
        .flatten()
        .ok_or_else(|| r.malformed("class constant does not point at a utf8 constant"))?;

    Ok(ClassFileInfo {
        minor_version,
        major_version,
        binary_name: internal.replace('/', "."),
    })
}

struct Reader<'a> {
    name: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], LoadError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.malformed("truncated")),
        }
    }

    fn skip(&mut self, n: usize) -> Result<(), LoadError> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn malformed(&self, reason: &str) -> LoadError {
        LoadError::ClassFormat {
            name: self.name.to_string(),
            reason: format!("{reason} (offset {})", self.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::class_bytes;

    #[test]
    fn inspect_reads_version_and_declared_name() {
        let bytes = class_bytes("org/example/Foo", 61);
        let info = inspect("org.example.Foo", &bytes).unwrap();
        assert_eq!(info.major_version, 61);
        assert_eq!(info.binary_name, "org.example.Foo");
    }

    #[test]
    fn inspect_rejects_bad_magic() {
        let mut bytes = class_bytes("A", 52);
        bytes[0] = 0;
        let err = inspect("A", &bytes).unwrap_err();
        assert!(matches!(err, LoadError::ClassFormat { .. }));
    }

    #[test]
    fn inspect_rejects_truncated_input() {
        let bytes = class_bytes("A", 52);
        let err = inspect("A", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, LoadError::ClassFormat { .. }));
    }

    #[test]
    fn inspect_gates_on_major_version() {
        let bytes = class_bytes("A", MAX_SUPPORTED_MAJOR + 1);
        let err = inspect("A", &bytes).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnsupportedVersion { found, max, .. }
                if found == MAX_SUPPORTED_MAJOR + 1 && max == MAX_SUPPORTED_MAJOR
        ));
    }
}
