//! The adapter table: adapter kinds mapped to client constructors.
//!
//! Resolution only ever accepts a kind that has a constructor here, so the
//! table is the single place that decides which adapters are usable.

use modelgate_core::{ModelClient, ProviderConfig};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::adapter::AdapterKind;
use crate::error::RegistryError;
use crate::generic::GenericClient;

/// Builds a client for one provider configuration.
pub type ClientConstructor =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn ModelClient>, RegistryError> + Send + Sync>;

/// Adapter kinds with their constructors.
#[derive(Clone, Default)]
pub struct AdapterTable {
    constructors: HashMap<AdapterKind, ClientConstructor>,
}

impl AdapterTable {
    /// Creates a table with no adapters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the built-in table.
    ///
    /// Every OpenAI-compatible kind is served by [`GenericClient`]. Other
    /// kinds are left unregistered and resolve to the fallback.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for kind in AdapterKind::all().iter().filter(|k| k.is_openai_compatible()) {
            table.register(*kind, Arc::new(generic_constructor));
        }
        table
    }

    /// Registers (or replaces) the constructor of a kind.
    pub fn register(&mut self, kind: AdapterKind, constructor: ClientConstructor) -> &mut Self {
        debug!(adapter = %kind, "Registering adapter");
        self.constructors.insert(kind, constructor);
        self
    }

    /// Returns true if `kind` has a constructor.
    pub fn contains(&self, kind: AdapterKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Returns the constructor of a kind.
    pub fn constructor(&self, kind: AdapterKind) -> Option<ClientConstructor> {
        self.constructors.get(&kind).cloned()
    }

    /// Returns the registered kinds, sorted.
    pub fn kinds(&self) -> Vec<AdapterKind> {
        let mut kinds: Vec<_> = self.constructors.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for AdapterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterTable")
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn generic_constructor(config: &ProviderConfig) -> Result<Arc<dyn ModelClient>, RegistryError> {
    Ok(Arc::new(GenericClient::new(config.clone())?))
}
