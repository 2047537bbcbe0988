//! Directory application service
//!
//! CRUD over the three collections, plus the two cross-cutting rules:
//! names are unique per collection (checked before insert and again by the
//! store's unique index), and an entity with open cases cannot be deleted.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use core_kernel::PortError;

use crate::entry::{DirectoryEntry, EntityKind, EntryPatch, NewEntry};
use crate::error::DirectoryError;
use crate::ports::{ActiveCaseCounter, Directory};

/// A directory record annotated with its live caseload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryWithCaseload {
    #[serde(flatten)]
    pub entry: DirectoryEntry,
    pub active_cases: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownItem {
    pub id: Uuid,
    pub name: String,
}

/// Id/name pairs of every directory record, for form pickers
#[derive(Debug, Clone, Default, Serialize)]
pub struct DropdownData {
    pub clients: Vec<DropdownItem>,
    pub providers: Vec<DropdownItem>,
    pub hospitals: Vec<DropdownItem>,
}

#[derive(Clone)]
pub struct DirectoryService {
    directory: Directory,
    cases: Arc<dyn ActiveCaseCounter>,
}

impl DirectoryService {
    pub fn new(directory: Directory, cases: Arc<dyn ActiveCaseCounter>) -> Self {
        Self { directory, cases }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    #[instrument(skip(self))]
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<EntryWithCaseload>, DirectoryError> {
        let entries = self.directory.port(kind).list().await?;
        let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
        let counts = self.cases.active_case_counts(kind, &ids).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let active_cases = counts.get(&entry.id).copied().unwrap_or(0);
                EntryWithCaseload { entry, active_cases }
            })
            .collect())
    }

    pub async fn get(&self, kind: EntityKind, id: Uuid) -> Result<DirectoryEntry, DirectoryError> {
        self.directory
            .port(kind)
            .get(id)
            .await
            .map_err(|e| not_found_or_store(e, kind, id))
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, kind: EntityKind, new: NewEntry) -> Result<DirectoryEntry, DirectoryError> {
        new.check()?;
        let port = self.directory.port(kind);

        let name = new.name.trim();
        if port.find_by_name(name).await?.is_some() {
            return Err(DirectoryError::Duplicate {
                kind: kind.label().to_string(),
                name: name.to_string(),
            });
        }

        let entry = DirectoryEntry::from_new(kind, new);
        let created = port.insert(&entry).await.map_err(|e| duplicate_or_store(e, kind, &entry.name))?;
        info!(kind = %kind, id = %created.id, "Directory entry created");
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        kind: EntityKind,
        id: Uuid,
        patch: EntryPatch,
    ) -> Result<DirectoryEntry, DirectoryError> {
        patch.check()?;
        let port = self.directory.port(kind);
        let mut entry = self.get(kind, id).await?;

        if let Some(name) = patch.name.as_deref().map(str::trim) {
            if name != entry.name {
                if let Some(other) = port.find_by_name(name).await? {
                    if other.id != id {
                        return Err(DirectoryError::Duplicate {
                            kind: kind.label().to_string(),
                            name: name.to_string(),
                        });
                    }
                }
            }
        }

        entry.apply(patch);
        let updated = port.update(&entry).await.map_err(|e| duplicate_or_store(e, kind, &entry.name))?;
        info!(kind = %kind, id = %id, "Directory entry updated");
        Ok(updated)
    }

    /// Deletes a record unless it still has open cases
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<(), DirectoryError> {
        let entry = self.get(kind, id).await?;

        let counts = self.cases.active_case_counts(kind, &[id]).await?;
        let active_cases = counts.get(&id).copied().unwrap_or(0);
        if active_cases > 0 {
            warn!(kind = %kind, id = %id, active_cases, "Delete refused: entity has open cases");
            return Err(DirectoryError::InUse {
                name: entry.name,
                active_cases,
            });
        }

        self.directory
            .port(kind)
            .delete(id)
            .await
            .map_err(|e| not_found_or_store(e, kind, id))?;
        info!(kind = %kind, id = %id, "Directory entry deleted");
        Ok(())
    }

    pub async fn dropdown(&self) -> Result<DropdownData, DirectoryError> {
        Ok(DropdownData {
            clients: self.items(EntityKind::Clients).await?,
            providers: self.items(EntityKind::Providers).await?,
            hospitals: self.items(EntityKind::Hospitals).await?,
        })
    }

    async fn items(&self, kind: EntityKind) -> Result<Vec<DropdownItem>, DirectoryError> {
        Ok(self
            .directory
            .port(kind)
            .list()
            .await?
            .into_iter()
            .map(|e| DropdownItem { id: e.id, name: e.name })
            .collect())
    }
}

fn not_found_or_store(error: PortError, kind: EntityKind, id: Uuid) -> DirectoryError {
    if error.is_not_found() {
        DirectoryError::not_found(kind.label(), id)
    } else {
        DirectoryError::Store(error)
    }
}

// The unique index can still fire when two inserts race past the pre-check
fn duplicate_or_store(error: PortError, kind: EntityKind, name: &str) -> DirectoryError {
    match error {
        PortError::Conflict { field: Some(ref field), .. } if field == "name" => DirectoryError::Duplicate {
            kind: kind.label().to_string(),
            name: name.to_string(),
        },
        other => DirectoryError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::FixedCaseCounts;

    #[tokio::test]
    async fn test_dropdown_lists_all_kinds() {
        let service = DirectoryService::new(Directory::in_memory(), Arc::new(FixedCaseCounts::new()));
        service
            .create(EntityKind::Clients, NewEntry { name: "Acme".into(), ..Default::default() })
            .await
            .unwrap();
        service
            .create(EntityKind::Hospitals, NewEntry { name: "City General".into(), ..Default::default() })
            .await
            .unwrap();

        let data = service.dropdown().await.unwrap();
        assert_eq!(data.clients.len(), 1);
        assert!(data.providers.is_empty());
        assert_eq!(data.hospitals[0].name, "City General");
    }

    #[test]
    fn test_caseload_flattens_into_entry() {
        let entry = DirectoryEntry::from_new(EntityKind::Clients, NewEntry {
            name: "Acme".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(EntryWithCaseload { entry, active_cases: 2 }).unwrap();
        assert_eq!(json["name"], "Acme");
        assert_eq!(json["activeCases"], 2);
    }
}
