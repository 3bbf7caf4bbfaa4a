use crate::error::AuthError;
use crate::Provider;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Maps provider names to providers.
///
/// Reads and writes are guarded, so providers may be registered after
/// traffic has started.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`ProviderRegistryBuilder`].
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Register `provider` under its name, returning the provider it replaced.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Option<Arc<dyn Provider>> {
        let name = provider.name().to_string();
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, provider)
    }

    /// Replace the whole set of providers.
    pub fn replace_all(&self, providers: impl IntoIterator<Item = Arc<dyn Provider>>) {
        let map = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        *self.providers.write().unwrap_or_else(PoisonError::into_inner) = map;
    }

    /// Remove the provider registered under `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, AuthError> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider(name.to_string()))
    }

    /// All registered providers, sorted by name.
    pub fn all(&self) -> Vec<Arc<dyn Provider>> {
        let mut all: Vec<_> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Names of all registered providers, sorted.
    pub fn names(&self) -> Vec<String> {
        self.all().iter().map(|p| p.name().to_string()).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for the [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistryBuilder {
    /// Add a provider. A later provider with the same name wins.
    pub fn provider<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
        self
    }

    /// Build the [`ProviderRegistry`].
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: RwLock::new(self.providers),
        }
    }
}

fn global() -> &'static ProviderRegistry {
    static REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ProviderRegistry::new)
}

/// Register a provider in the process-wide registry.
pub fn register_provider<P: Provider + 'static>(provider: P) -> Option<Arc<dyn Provider>> {
    global().register(Arc::new(provider))
}

/// Replace every provider in the process-wide registry.
pub fn with_providers(providers: impl IntoIterator<Item = Arc<dyn Provider>>) {
    global().replace_all(providers)
}

/// Look up a provider in the process-wide registry.
pub fn provider(name: &str) -> Result<Arc<dyn Provider>, AuthError> {
    global().get(name)
}

/// All providers in the process-wide registry, sorted by name.
pub fn providers() -> Vec<Arc<dyn Provider>> {
    global().all()
}
