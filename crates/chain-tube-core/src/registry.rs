//! Environment registry.
//!
//! Handles are dense and assigned from 1 upwards; a handle is never reused,
//! even after its environment has been removed. Each entry sits behind its
//! own mutex, so operations mutate the environment in place and two calls on
//! the same handle serialize instead of overwriting each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::environment::Environment;
use crate::errors::{FatalError, FatalResult};

pub type EnvHandle = Arc<Mutex<Environment>>;

#[derive(Default)]
struct RegistryInner {
    counter: u64,
    envs: HashMap<u64, EnvHandle>,
}

#[derive(Default)]
pub struct EnvironmentRegistry {
    inner: RwLock<RegistryInner>,
}

impl std::fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("EnvironmentRegistry")
            .field("counter", &inner.counter)
            .field("live", &inner.envs.len())
            .finish()
    }
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `env` under a fresh handle.
    pub fn insert(&self, env: Environment) -> u64 {
        let mut inner = self.inner.write();
        inner.counter += 1;
        let id = inner.counter;
        inner.envs.insert(id, Arc::new(Mutex::new(env)));
        id
    }

    pub fn load(&self, id: u64) -> FatalResult<EnvHandle> {
        self.inner
            .read()
            .envs
            .get(&id)
            .cloned()
            .ok_or(FatalError::UnknownHandle(id))
    }

    /// Drop the entry; `None` if it was never there or already removed.
    pub fn remove(&self, id: u64) -> Option<EnvHandle> {
        self.inner.write().envs.remove(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.inner.read().envs.contains_key(&id)
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.inner.read().envs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.read().envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().envs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::param_registry::ParamTypeRegistry;

    fn env() -> Environment {
        Environment::create(&HarnessConfig::default(), Arc::new(ParamTypeRegistry::default()))
            .unwrap()
    }

    #[test]
    fn test_handles_start_at_one_and_are_not_reused() {
        let registry = EnvironmentRegistry::new();
        assert_eq!(registry.insert(env()), 1);
        assert_eq!(registry.insert(env()), 2);
        assert!(registry.contains(2));
        assert!(registry.remove(2).is_some());
        assert!(!registry.contains(2));
        assert!(registry.remove(2).is_none());
        assert_eq!(registry.insert(env()), 3);
        assert_eq!(registry.handles(), vec![1, 3]);
    }

    #[test]
    fn test_load_unknown_handle_is_fatal() {
        let registry = EnvironmentRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.load(42).unwrap_err(),
            FatalError::UnknownHandle(42)
        );
    }

    #[test]
    fn test_entries_mutate_in_place() {
        let registry = EnvironmentRegistry::new();
        let id = registry.insert(env());
        registry.load(id).unwrap().lock().finalize_block().unwrap();
        assert_eq!(registry.load(id).unwrap().lock().block_height(), 2);
    }
}
