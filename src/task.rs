//! Isolated task execution.
//!
//! Runs one delegate unit of work inside a freshly assembled loader chain,
//! then deterministically tears the chain down. The lifecycle is linear:
//! capture the ambient state, build the chain, prove it can supply the
//! delegate's class, construct and configure the delegate, install the chain
//! as the thread's context, execute, and finally restore the context and
//! close every loader the execution created — never the ambient one.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context;
use crate::element::{ConfigElement, Configurable};
use crate::error::{LoadError, TaskError};
use crate::loader::{ClassDefinition, ClassLoader, close_chain};
use crate::mask::MaskingLoader;
use crate::world::ParallelWorldLoader;

/// What a delegate sees while it runs.
pub struct TaskContext {
    /// The isolation chain; also installed as the thread's context loader
    /// for the duration of the execution.
    pub loader: Arc<dyn ClassLoader>,
    /// The delegate's own class as resolved through the chain.
    pub class: ClassDefinition,
}

/// A unit of work executed inside an isolation chain.
pub trait IsolatedTask: Configurable {
    fn execute(&mut self, ctx: &TaskContext) -> Result<()>;
}

/// Builds the isolation chain on top of the ambient loader.
pub trait LoaderFactory {
    fn create_loader(&self, ambient: &Arc<dyn ClassLoader>)
    -> Result<Arc<dyn ClassLoader>, LoadError>;
}

/// The standard chain: ambient -> masking (hide the new API's packages) ->
/// parallel world (remap the old API's resources).
#[derive(Debug, Clone, Default)]
pub struct IsolationPlan {
    pub masks: Vec<String>,
    pub world_prefix: String,
}

impl LoaderFactory for IsolationPlan {
    fn create_loader(
        &self,
        ambient: &Arc<dyn ClassLoader>,
    ) -> Result<Arc<dyn ClassLoader>, LoadError> {
        let masked: Arc<dyn ClassLoader> =
            Arc::new(MaskingLoader::new(ambient.clone(), self.masks.clone()));
        Ok(Arc::new(ParallelWorldLoader::new(
            masked,
            self.world_prefix.clone(),
        )))
    }
}

type DelegateCtor = Box<dyn Fn() -> Result<Box<dyn IsolatedTask>> + Send + Sync>;

/// Maps delegate class names to constructors. Stands in for reflective
/// default-constructor instantiation: the class is still loaded through the
/// isolation chain first, construction itself is a registered closure.
#[derive(Default)]
pub struct DelegateRegistry {
    ctors: HashMap<String, DelegateCtor>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, class_name: impl Into<String>, ctor: F)
    where
        F: Fn() -> Result<Box<dyn IsolatedTask>> + Send + Sync + 'static,
    {
        self.ctors.insert(class_name.into(), Box::new(ctor));
    }

    pub fn construct(&self, class_name: &str) -> Result<Box<dyn IsolatedTask>, TaskError> {
        let ctor = self
            .ctors
            .get(class_name)
            .ok_or_else(|| TaskError::UnknownDelegate(class_name.to_string()))?;
        ctor().map_err(|source| TaskError::Construction {
            name: class_name.to_string(),
            source,
        })
    }
}

pub struct IsolatedTaskRunner {
    factory: Box<dyn LoaderFactory>,
    registry: DelegateRegistry,
}

impl IsolatedTaskRunner {
    pub fn new(factory: impl LoaderFactory + 'static, registry: DelegateRegistry) -> Self {
        Self {
            factory: Box::new(factory),
            registry,
        }
    }

    /// Runs `delegate_class` configured from `config` inside a chain built on
    /// `ambient`. The config tree is consumed by this one execution.
    ///
    /// Teardown is unconditional once the chain has been installed: the
    /// thread's context loader is restored to exactly its previous value and
    /// every loader from the chain head down to (but excluding) `ambient` is
    /// closed, whether the delegate succeeded or not.
    pub fn run(
        &self,
        ambient: &Arc<dyn ClassLoader>,
        delegate_class: &str,
        config: ConfigElement,
    ) -> Result<(), TaskError> {
        let saved = context::current();
        let mut installed = false;

        let result = self.run_inner(ambient, delegate_class, config, &mut installed);

        let chain_head = context::current();
        context::install(saved);

        if installed {
            if let Err(close_err) = close_chain(chain_head, ambient) {
                match &result {
                    Ok(()) => return Err(TaskError::Teardown(close_err)),
                    Err(_) => {
                        // the delegate's failure wins; don't lose the cleanup
                        // failure entirely
                        eprintln!(
                            "[class-world] loader close failed during teardown after a delegate error: {close_err}"
                        );
                    }
                }
            }
        }

        result
    }

    fn run_inner(
        &self,
        ambient: &Arc<dyn ClassLoader>,
        delegate_class: &str,
        config: ConfigElement,
        installed: &mut bool,
    ) -> Result<(), TaskError> {
        let chain = self
            .factory
            .create_loader(ambient)
            .map_err(TaskError::LoaderSetup)?;

        // Prove the chain can supply the delegate's definition before doing
        // anything else; this is where masking, world remapping, and the
        // class-file version gate all bite.
        let class = chain.load_class(delegate_class).map_err(|e| match e {
            e @ LoadError::UnsupportedVersion { .. } => TaskError::UnsupportedClassVersion(e),
            e => TaskError::DelegateLoad {
                name: delegate_class.to_string(),
                source: e,
            },
        })?;

        let mut delegate = self.registry.construct(delegate_class)?;

        config
            .apply(&mut *delegate)
            .map_err(|source| TaskError::Configuration {
                name: delegate_class.to_string(),
                source,
            })?;

        context::install(Some(chain.clone()));
        *installed = true;

        let ctx = TaskContext {
            loader: chain,
            class,
        };
        delegate.execute(&ctx).map_err(TaskError::Execution)
    }
}
