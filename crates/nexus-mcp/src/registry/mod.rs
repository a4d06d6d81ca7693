//! Tool, resource, and prompt registries behind one reader/writer lock.

pub mod store;

pub use store::{Keyed, KeyedStore};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::types::{McpError, McpResult, Prompt, Resource, Tool};

/// The three stores guarded together.
#[derive(Debug, Default)]
pub struct RegistryTables {
    tools: KeyedStore<Tool>,
    resources: KeyedStore<Resource>,
    prompts: KeyedStore<Prompt>,
}

/// An entry type with a home in [`RegistryTables`].
pub trait Registered: Keyed + Clone + Send + Sync + 'static {
    fn table(tables: &RegistryTables) -> &KeyedStore<Self>;
    fn table_mut(tables: &mut RegistryTables) -> &mut KeyedStore<Self>;
}

impl Keyed for Tool {
    const KIND: &'static str = "tool";
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for Resource {
    const KIND: &'static str = "resource";
    fn key(&self) -> &str {
        &self.uri
    }
}

impl Keyed for Prompt {
    const KIND: &'static str = "prompt";
    fn key(&self) -> &str {
        &self.name
    }
}

impl Registered for Tool {
    fn table(tables: &RegistryTables) -> &KeyedStore<Self> {
        &tables.tools
    }
    fn table_mut(tables: &mut RegistryTables) -> &mut KeyedStore<Self> {
        &mut tables.tools
    }
}

impl Registered for Resource {
    fn table(tables: &RegistryTables) -> &KeyedStore<Self> {
        &tables.resources
    }
    fn table_mut(tables: &mut RegistryTables) -> &mut KeyedStore<Self> {
        &mut tables.resources
    }
}

impl Registered for Prompt {
    fn table(tables: &RegistryTables) -> &KeyedStore<Self> {
        &tables.prompts
    }
    fn table_mut(tables: &mut RegistryTables) -> &mut KeyedStore<Self> {
        &mut tables.prompts
    }
}

/// Registries owned by one host session.
///
/// Reads take the shared lock, mutations the exclusive one. The lock is
/// held only for the map operation; every accessor returns owned clones so
/// callers never run tool, resource, or prompt logic while holding it.
#[derive(Debug, Default)]
pub struct Registries {
    tables: RwLock<RegistryTables>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry. Fails with `DuplicateKey` if the key exists.
    pub async fn add<T: Registered>(&self, entry: T) -> McpResult<()> {
        let mut tables = self.tables.write().await;
        T::table_mut(&mut tables).add(entry)
    }

    pub async fn get<T: Registered>(&self, key: &str) -> Option<T> {
        let tables = self.tables.read().await;
        T::table(&tables).get(key).cloned()
    }

    /// Lookup that reports a missing key as `NotFound`.
    pub async fn require<T: Registered>(&self, key: &str) -> McpResult<T> {
        self.get(key)
            .await
            .ok_or_else(|| McpError::not_found(T::KIND, key))
    }

    pub async fn list<T: Registered>(&self) -> Vec<T> {
        let tables = self.tables.read().await;
        T::table(&tables).list()
    }

    pub async fn remove<T: Registered>(&self, key: &str) -> McpResult<T> {
        let mut tables = self.tables.write().await;
        T::table_mut(&mut tables).remove(key)
    }

    pub async fn len<T: Registered>(&self) -> usize {
        let tables = self.tables.read().await;
        T::table(&tables).len()
    }

    /// Replace a resource's metadata, leaving every other field as is.
    pub async fn write_resource_metadata(&self, uri: &str, metadata: Value) -> McpResult<()> {
        let mut tables = self.tables.write().await;
        let resource = tables
            .resources
            .get_mut(uri)
            .ok_or_else(|| McpError::not_found(Resource::KIND, uri))?;
        resource.metadata = Some(metadata);
        Ok(())
    }
}
