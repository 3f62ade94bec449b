//! Thread-scoped ambient loader slot.
//!
//! Loaders are passed explicitly everywhere in this crate; this slot exists
//! only so a delegate running inside an isolation chain can reach the chain
//! from code that has no parameter to carry it (legacy service-discovery
//! style lookups). The task runner saves and restores it with stack
//! discipline, so nested isolated executions compose.

use std::cell::RefCell;
use std::sync::Arc;

use crate::loader::ClassLoader;

thread_local! {
    static AMBIENT: RefCell<Option<Arc<dyn ClassLoader>>> = const { RefCell::new(None) };
}

/// The loader currently installed on this thread, if any.
pub fn current() -> Option<Arc<dyn ClassLoader>> {
    AMBIENT.with(|slot| slot.borrow().clone())
}

/// Installs `loader` on this thread and returns what was installed before.
pub fn install(loader: Option<Arc<dyn ClassLoader>>) -> Option<Arc<dyn ClassLoader>> {
    AMBIENT.with(|slot| slot.replace(loader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::ClassPathLoader;

    #[test]
    fn install_returns_the_previous_value() -> anyhow::Result<()> {
        assert!(current().is_none());

        let first: Arc<dyn ClassLoader> = Arc::new(ClassPathLoader::new(None, &[])?);
        let second: Arc<dyn ClassLoader> = Arc::new(ClassPathLoader::new(None, &[])?);

        assert!(install(Some(first.clone())).is_none());
        assert_eq!(current().unwrap().id(), first.id());

        let previous = install(Some(second.clone())).unwrap();
        assert_eq!(previous.id(), first.id());
        assert_eq!(current().unwrap().id(), second.id());

        install(None);
        assert!(current().is_none());
        Ok(())
    }
}
