//! Masking loader: refuses to resolve class names under configured prefixes
//! so that a child loader (typically a parallel world) is forced to supply
//! them instead. Resources are deliberately left visible; only compiled
//! class definitions are hidden.

use std::sync::Arc;

use crate::error::LoadError;
use crate::loader::{ClassDefinition, ClassLoader, LoaderId, Resource};

pub struct MaskingLoader {
    id: LoaderId,
    parent: Arc<dyn ClassLoader>,
    masks: Vec<String>,
}

impl MaskingLoader {
    /// `masks` may be empty, in which case nothing is masked.
    pub fn new<I, S>(parent: Arc<dyn ClassLoader>, masks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: LoaderId::next(),
            parent,
            masks: masks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn masks(&self) -> &[String] {
        &self.masks
    }

    pub fn is_masked(&self, name: &str) -> bool {
        self.masks.iter().any(|mask| name.starts_with(mask))
    }
}

impl ClassLoader for MaskingLoader {
    fn id(&self) -> LoaderId {
        self.id
    }

    fn parent(&self) -> Option<Arc<dyn ClassLoader>> {
        Some(self.parent.clone())
    }

    /// Masked names fail before the parent is ever consulted.
    fn load_class(&self, name: &str) -> Result<ClassDefinition, LoadError> {
        if self.is_masked(name) {
            return Err(LoadError::ClassNotFound(name.to_string()));
        }
        self.parent.load_class(name)
    }

    fn find_class(&self, name: &str) -> Result<ClassDefinition, LoadError> {
        Err(LoadError::ClassNotFound(name.to_string()))
    }

    fn find_resource(&self, _path: &str) -> Result<Option<Resource>, LoadError> {
        Ok(None)
    }

    fn find_resources(&self, _path: &str) -> Result<Vec<Resource>, LoadError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::write_jar;
    use crate::classpath::ClassPathLoader;
    use crate::testdata::{class_bytes, temp_path};

    fn parent_over(entries: &[(&str, &[u8])], jar_name: &str) -> anyhow::Result<Arc<dyn ClassLoader>> {
        let jar = temp_path(jar_name);
        write_jar(&jar, entries)?;
        Ok(Arc::new(ClassPathLoader::new(None, &[jar])?))
    }

    #[test]
    fn masked_prefix_fails_even_when_the_parent_could_resolve() -> anyhow::Result<()> {
        let service = class_bytes("javax/xml/ws/Service", 52);
        let object = class_bytes("java/lang/Object", 52);
        let parent = parent_over(
            &[
                ("javax/xml/ws/Service.class", service.as_slice()),
                ("java/lang/Object.class", object.as_slice()),
            ],
            "mask_veto.jar",
        )?;
        assert!(parent.load_class("javax.xml.ws.Service").is_ok());

        let masking = MaskingLoader::new(parent, ["javax.xml.ws"]);
        assert!(matches!(
            masking.load_class("javax.xml.ws.Service"),
            Err(LoadError::ClassNotFound(n)) if n == "javax.xml.ws.Service"
        ));

        // unmasked names still resolve through the parent
        let object = masking.load_class("java.lang.Object")?;
        assert_eq!(object.name, "java.lang.Object");
        Ok(())
    }

    #[test]
    fn resources_are_never_masked() -> anyhow::Result<()> {
        let parent = parent_over(
            &[("javax/xml/ws/wsdl.properties", b"visible".as_slice())],
            "mask_resources.jar",
        )?;
        let masking = MaskingLoader::new(parent, ["javax.xml.ws"]);

        let found = masking.get_resource("javax/xml/ws/wsdl.properties")?.unwrap();
        assert_eq!(found.bytes, b"visible");
        Ok(())
    }

    #[test]
    fn empty_mask_list_masks_nothing() -> anyhow::Result<()> {
        let object = class_bytes("java/lang/Object", 52);
        let parent = parent_over(
            &[("java/lang/Object.class", object.as_slice())],
            "mask_empty.jar",
        )?;
        let masking = MaskingLoader::new(parent, Vec::<String>::new());
        assert!(masking.load_class("java.lang.Object").is_ok());
        Ok(())
    }
}
