//! Deferred, declarative delegate configuration.
//!
//! A `ConfigElement` is a tree of string attributes and named child elements,
//! built while a task is being configured and replayed once onto the freshly
//! constructed delegate: attributes first, then children, both in declaration
//! order. Delegates opt in by implementing `Configurable`; there is no
//! open-ended reflection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Contract a delegate implements to receive replayed configuration.
pub trait Configurable {
    fn set_attribute(&mut self, name: &str, value: &str) -> Result<()>;

    /// Creates the named nested element and returns it for recursive
    /// configuration.
    fn create_child(&mut self, name: &str) -> Result<&mut dyn Configurable>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigElement {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub children: Vec<ConfigElement>,
}

impl ConfigElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(name, value);
        self
    }

    pub fn child(mut self, element: ConfigElement) -> Self {
        self.children.push(element);
        self
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    /// Appends a named child and returns it for incremental building.
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut ConfigElement {
        self.children.push(ConfigElement::new(name));
        self.children.last_mut().expect("just pushed")
    }

    /// Replays this tree onto `target`: attributes in declaration order,
    /// then children in declaration order, recursively.
    pub fn apply(&self, target: &mut dyn Configurable) -> Result<()> {
        for (name, value) in &self.attributes {
            target
                .set_attribute(name, value)
                .with_context(|| format!("setting attribute {name} on <{}>", self.name))?;
        }
        for element in &self.children {
            let child = target
                .create_child(&element.name)
                .with_context(|| format!("creating child <{}> of <{}>", element.name, self.name))?;
            element.apply(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call so tests can assert on replay order.
    #[derive(Default)]
    struct Recorder {
        label: String,
        log: Vec<String>,
        children: Vec<Recorder>,
    }

    impl Recorder {
        fn flat_log(&self) -> Vec<String> {
            let mut out = self.log.clone();
            for child in &self.children {
                out.extend(child.flat_log());
            }
            out
        }
    }

    impl Configurable for Recorder {
        fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
            if name == "boom" {
                anyhow::bail!("rejected attribute");
            }
            self.log.push(format!("{}:{name}={value}", self.label));
            Ok(())
        }

        fn create_child(&mut self, name: &str) -> Result<&mut dyn Configurable> {
            self.log.push(format!("{}:<{name}>", self.label));
            self.children.push(Recorder {
                label: name.to_string(),
                ..Recorder::default()
            });
            Ok(self.children.last_mut().expect("just pushed"))
        }
    }

    #[test]
    fn apply_replays_attributes_then_children_in_order() {
        let tree = ConfigElement::new("root")
            .attribute("schema", "a.xsd")
            .attribute("package", "org.example")
            .child(
                ConfigElement::new("produces")
                    .attribute("dir", "out")
                    .child(ConfigElement::new("include").attribute("name", "**/*.java")),
            )
            .child(ConfigElement::new("arg").attribute("value", "-verbose"));

        let mut target = Recorder {
            label: "root".to_string(),
            ..Recorder::default()
        };
        tree.apply(&mut target).unwrap();

        assert_eq!(
            target.flat_log(),
            vec![
                "root:schema=a.xsd",
                "root:package=org.example",
                "root:<produces>",
                "root:<arg>",
                "produces:dir=out",
                "produces:<include>",
                "include:name=**/*.java",
                "arg:value=-verbose",
            ]
        );
    }

    #[test]
    fn apply_surfaces_a_rejected_attribute_with_its_element() {
        let tree = ConfigElement::new("root").attribute("boom", "1");
        let mut target = Recorder {
            label: "root".to_string(),
            ..Recorder::default()
        };
        let err = tree.apply(&mut target).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(err.to_string().contains("<root>"));
    }

    #[test]
    fn config_element_round_trips_through_json() {
        let tree = ConfigElement::new("root")
            .attribute("k", "v")
            .child(ConfigElement::new("nested"));
        let json = serde_json::to_string(&tree).unwrap();
        let back: ConfigElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "root");
        assert_eq!(back.attributes, vec![("k".to_string(), "v".to_string())]);
        assert_eq!(back.children.len(), 1);
    }
}
