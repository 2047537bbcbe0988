//! Directory Domain Ports
//!
//! Each directory kind is served by its own [`DirectoryPort`]; the three ports
//! are bundled in a [`Directory`], which is the lookup table used to resolve a
//! polymorphic [`EntityRef`] without branching on type strings at call sites.
//!
//! The live caseload of an entity is owned by the case store, so the directory
//! only sees it through the narrow [`ActiveCaseCounter`] port.
//!
//! ```rust,ignore
//! let directory = Directory::new(clients, providers, hospitals);
//! let insurer = directory.resolve(case.insurer).await?;
//! let fee = insurer.case_fee;
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use core_kernel::{DomainPort, HealthCheckable, PortError};

use crate::entry::{DirectoryEntry, EntityKind, EntityRef};

/// Storage port for one directory collection
#[async_trait]
pub trait DirectoryPort: DomainPort + HealthCheckable {
    /// The collection this port serves
    fn kind(&self) -> EntityKind;

    /// Retrieves a record by id, or `PortError::NotFound`
    async fn get(&self, id: Uuid) -> Result<DirectoryEntry, PortError>;

    /// Exact, case-sensitive name lookup
    async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryEntry>, PortError>;

    /// All records, ordered by name
    async fn list(&self) -> Result<Vec<DirectoryEntry>, PortError>;

    /// Inserts a record; a duplicate name surfaces as `PortError::Conflict`
    async fn insert(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, PortError>;

    /// Replaces a stored record
    async fn update(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, PortError>;

    async fn delete(&self, id: Uuid) -> Result<(), PortError>;
}

/// Counts currently open cases per directory entity
///
/// Clients and providers are counted as insurers; hospitals are counted as
/// the case's service location.
#[async_trait]
pub trait ActiveCaseCounter: Send + Sync {
    async fn active_case_counts(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, PortError>;
}

/// Lookup table of the three directory ports
#[derive(Clone)]
pub struct Directory {
    clients: Arc<dyn DirectoryPort>,
    providers: Arc<dyn DirectoryPort>,
    hospitals: Arc<dyn DirectoryPort>,
}

impl Directory {
    pub fn new(
        clients: Arc<dyn DirectoryPort>,
        providers: Arc<dyn DirectoryPort>,
        hospitals: Arc<dyn DirectoryPort>,
    ) -> Self {
        Self {
            clients,
            providers,
            hospitals,
        }
    }

    /// The port serving the given collection
    pub fn port(&self, kind: EntityKind) -> &Arc<dyn DirectoryPort> {
        match kind {
            EntityKind::Clients => &self.clients,
            EntityKind::Providers => &self.providers,
            EntityKind::Hospitals => &self.hospitals,
        }
    }

    /// Loads the record a polymorphic reference points to
    pub async fn resolve(&self, entity: EntityRef) -> Result<DirectoryEntry, PortError> {
        self.port(entity.kind()).get(entity.id()).await
    }

    /// Like [`Directory::resolve`], but absence is `None` rather than an error
    pub async fn lookup(&self, entity: EntityRef) -> Result<Option<DirectoryEntry>, PortError> {
        match self.resolve(entity).await {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Runs the health check of every port
    pub async fn health_checks(&self) -> Vec<core_kernel::HealthCheckResult> {
        let mut results = Vec::with_capacity(3);
        for kind in EntityKind::ALL {
            results.push(self.port(kind).health_check().await);
        }
        results
    }
}

/// In-memory implementations for tests and local runs
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::{AdapterHealth, HealthCheckResult};
    use tokio::sync::RwLock;

    /// In-memory directory collection with a unique name index
    #[derive(Debug)]
    pub struct InMemoryDirectoryPort {
        kind: EntityKind,
        entries: Arc<RwLock<HashMap<Uuid, DirectoryEntry>>>,
    }

    impl InMemoryDirectoryPort {
        pub fn new(kind: EntityKind) -> Self {
            Self {
                kind,
                entries: Arc::new(RwLock::new(HashMap::new())),
            }
        }

        /// Pre-populates the collection
        pub async fn with_entries(kind: EntityKind, entries: Vec<DirectoryEntry>) -> Self {
            let port = Self::new(kind);
            {
                let mut stored = port.entries.write().await;
                for entry in entries {
                    stored.insert(entry.id, entry);
                }
            }
            port
        }
    }

    impl DomainPort for InMemoryDirectoryPort {}

    #[async_trait]
    impl HealthCheckable for InMemoryDirectoryPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: format!("memory-{}", self.kind),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: None,
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl DirectoryPort for InMemoryDirectoryPort {
        fn kind(&self) -> EntityKind {
            self.kind
        }

        async fn get(&self, id: Uuid) -> Result<DirectoryEntry, PortError> {
            self.entries
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found(self.kind.label(), id))
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryEntry>, PortError> {
            Ok(self
                .entries
                .read()
                .await
                .values()
                .find(|e| e.name == name)
                .cloned())
        }

        async fn list(&self) -> Result<Vec<DirectoryEntry>, PortError> {
            let mut entries: Vec<_> = self.entries.read().await.values().cloned().collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(entries)
        }

        async fn insert(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, PortError> {
            let mut entries = self.entries.write().await;
            if entries.values().any(|e| e.name == entry.name) {
                return Err(PortError::conflict_field(
                    format!("Name \"{}\" is already in use.", entry.name),
                    "name",
                ));
            }
            entries.insert(entry.id, entry.clone());
            Ok(entry.clone())
        }

        async fn update(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, PortError> {
            let mut entries = self.entries.write().await;
            if !entries.contains_key(&entry.id) {
                return Err(PortError::not_found(self.kind.label(), entry.id));
            }
            if entries.values().any(|e| e.id != entry.id && e.name == entry.name) {
                return Err(PortError::conflict_field(
                    format!("Name \"{}\" is already in use.", entry.name),
                    "name",
                ));
            }
            entries.insert(entry.id, entry.clone());
            Ok(entry.clone())
        }

        async fn delete(&self, id: Uuid) -> Result<(), PortError> {
            self.entries
                .write()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found(self.kind.label(), id))
        }
    }

    impl Directory {
        /// Three empty in-memory collections
        pub fn in_memory() -> Self {
            Self::new(
                Arc::new(InMemoryDirectoryPort::new(EntityKind::Clients)),
                Arc::new(InMemoryDirectoryPort::new(EntityKind::Providers)),
                Arc::new(InMemoryDirectoryPort::new(EntityKind::Hospitals)),
            )
        }
    }

    /// Case counter returning preset numbers
    #[derive(Debug, Default)]
    pub struct FixedCaseCounts {
        counts: RwLock<HashMap<(EntityKind, Uuid), u64>>,
    }

    impl FixedCaseCounts {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn set(&self, kind: EntityKind, id: Uuid, count: u64) {
            self.counts.write().await.insert((kind, id), count);
        }
    }

    #[async_trait]
    impl ActiveCaseCounter for FixedCaseCounts {
        async fn active_case_counts(
            &self,
            kind: EntityKind,
            ids: &[Uuid],
        ) -> Result<HashMap<Uuid, u64>, PortError> {
            let counts = self.counts.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| counts.get(&(kind, *id)).map(|c| (*id, *c)))
                .filter(|(_, c)| *c > 0)
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryDirectoryPort;
    use super::*;
    use crate::entry::NewEntry;

    fn entry(kind: EntityKind, name: &str) -> DirectoryEntry {
        DirectoryEntry::from_new(kind, NewEntry {
            name: name.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_resolve_dispatches_on_kind() {
        let hospital = entry(EntityKind::Hospitals, "City General");
        let directory = Directory::new(
            Arc::new(InMemoryDirectoryPort::new(EntityKind::Clients)),
            Arc::new(InMemoryDirectoryPort::new(EntityKind::Providers)),
            Arc::new(
                InMemoryDirectoryPort::with_entries(EntityKind::Hospitals, vec![hospital.clone()]).await,
            ),
        );

        let resolved = directory.resolve(hospital.entity_ref()).await.unwrap();
        assert_eq!(resolved.name, "City General");

        // Same id under a different kind does not resolve
        let as_client = EntityRef::from_parts(EntityKind::Clients, hospital.id);
        assert!(directory.resolve(as_client).await.unwrap_err().is_not_found());
        assert!(directory.lookup(as_client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_enforces_unique_names() {
        let port = InMemoryDirectoryPort::new(EntityKind::Clients);
        port.insert(&entry(EntityKind::Clients, "Acme")).await.unwrap();
        let err = port.insert(&entry(EntityKind::Clients, "Acme")).await.unwrap_err();
        assert!(err.is_conflict());
        // Exact match only
        assert!(port.insert(&entry(EntityKind::Clients, "acme")).await.is_ok());
    }
}
