//! Directory records and the polymorphic entity reference

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClientId, HospitalId, Money, ProviderId};

use crate::error::DirectoryError;

/// The three directory collections
///
/// Serialized with the plural collection names (`clients`, `providers`,
/// `hospitals`) used as the `insuranceType` discriminator on cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Clients,
    Providers,
    Hospitals,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Clients, EntityKind::Providers, EntityKind::Hospitals];

    /// Collection name, as stored in the discriminator column
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Clients => "clients",
            EntityKind::Providers => "providers",
            EntityKind::Hospitals => "hospitals",
        }
    }

    /// Singular label for user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Clients => "Client",
            EntityKind::Providers => "Provider",
            EntityKind::Hospitals => "Hospital",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clients" => Ok(EntityKind::Clients),
            "providers" => Ok(EntityKind::Providers),
            "hospitals" => Ok(EntityKind::Hospitals),
            other => Err(DirectoryError::Validation(format!(
                "Invalid entity type '{}'. Must be one of: clients, providers, hospitals",
                other
            ))),
        }
    }
}

/// A typed reference to one directory record
///
/// Serialized as `{"type": "clients", "id": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "EntityRefRepr", from = "EntityRefRepr")]
pub enum EntityRef {
    Client(ClientId),
    Provider(ProviderId),
    Hospital(HospitalId),
}

impl EntityRef {
    /// Builds a reference from a stored (discriminator, id) pair
    pub fn from_parts(kind: EntityKind, id: Uuid) -> Self {
        match kind {
            EntityKind::Clients => EntityRef::Client(ClientId::from(id)),
            EntityKind::Providers => EntityRef::Provider(ProviderId::from(id)),
            EntityKind::Hospitals => EntityRef::Hospital(HospitalId::from(id)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Client(_) => EntityKind::Clients,
            EntityRef::Provider(_) => EntityKind::Providers,
            EntityRef::Hospital(_) => EntityKind::Hospitals,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EntityRef::Client(id) => *id.as_uuid(),
            EntityRef::Provider(id) => *id.as_uuid(),
            EntityRef::Hospital(id) => *id.as_uuid(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EntityRefRepr {
    #[serde(rename = "type")]
    kind: EntityKind,
    id: Uuid,
}

impl From<EntityRef> for EntityRefRepr {
    fn from(entity: EntityRef) -> Self {
        Self {
            kind: entity.kind(),
            id: entity.id(),
        }
    }
}

impl From<EntityRefRepr> for EntityRef {
    fn from(repr: EntityRefRepr) -> Self {
        EntityRef::from_parts(repr.kind, repr.id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Client(id) => write!(f, "{}", id),
            EntityRef::Provider(id) => write!(f, "{}", id),
            EntityRef::Hospital(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Active,
    Inactive,
}

/// Billing relation of a hospital with the intermediary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HospitalRelation {
    #[default]
    Cash,
    Cashless,
}

/// A contact person at a directory entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: Option<String>,
    #[validate(email(message = "Invalid contact email"))]
    pub email: Option<String>,
    pub designation: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contacts {
    pub primary: Option<Contact>,
    pub secondary: Option<Contact>,
}

impl Contacts {
    fn validate_all(&self) -> Result<(), DirectoryError> {
        for contact in [&self.primary, &self.secondary].into_iter().flatten() {
            contact
                .validate()
                .map_err(|e| DirectoryError::Validation(e.to_string()))?;
        }
        Ok(())
    }
}

/// A client, provider or hospital record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub kind: EntityKind,
    pub name: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub contacts: Contacts,
    /// Fee billed per case; snapshotted into finance entries
    pub case_fee: Option<Money>,
    pub coverage: Vec<String>,
    pub service_type: Option<String>,
    /// Hospitals only
    pub relation: Option<HospitalRelation>,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DirectoryEntry {
    /// Materializes a new record from validated input
    pub fn from_new(kind: EntityKind, new: NewEntry) -> Self {
        let now = Utc::now();
        let relation = match kind {
            EntityKind::Hospitals => Some(new.relation.unwrap_or_default()),
            _ => None,
        };
        Self {
            id: Uuid::now_v7(),
            kind,
            name: new.name.trim().to_string(),
            location: new.location,
            address: new.address,
            region: new.region,
            country: new.country,
            contacts: new.contacts,
            case_fee: new.case_fee,
            coverage: new.coverage,
            service_type: new.service_type,
            relation,
            status: new.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::from_parts(self.kind, self.id)
    }

    /// Applies a partial update in place
    pub fn apply(&mut self, patch: EntryPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(location) = patch.location {
            self.location = Some(location);
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(region) = patch.region {
            self.region = Some(region);
        }
        if let Some(country) = patch.country {
            self.country = Some(country);
        }
        if let Some(contacts) = patch.contacts {
            self.contacts = contacts;
        }
        if let Some(fee) = patch.case_fee {
            self.case_fee = Some(fee);
        }
        if let Some(coverage) = patch.coverage {
            self.coverage = coverage;
        }
        if let Some(service_type) = patch.service_type {
            self.service_type = Some(service_type);
        }
        if let (EntityKind::Hospitals, Some(relation)) = (self.kind, patch.relation) {
            self.relation = Some(relation);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a directory record
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub contacts: Contacts,
    pub case_fee: Option<Money>,
    #[serde(default)]
    pub coverage: Vec<String>,
    pub service_type: Option<String>,
    pub relation: Option<HospitalRelation>,
    pub status: Option<EntryStatus>,
}

impl NewEntry {
    /// Field-level checks that do not need storage access
    pub fn check(&self) -> Result<(), DirectoryError> {
        if self.name.trim().is_empty() {
            return Err(DirectoryError::Validation("Name is required".to_string()));
        }
        self.validate()
            .map_err(|e| DirectoryError::Validation(e.to_string()))?;
        self.contacts.validate_all()?;
        check_fee(self.case_fee)
    }
}

/// Partial update of a directory record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub contacts: Option<Contacts>,
    pub case_fee: Option<Money>,
    pub coverage: Option<Vec<String>>,
    pub service_type: Option<String>,
    pub relation: Option<HospitalRelation>,
    pub status: Option<EntryStatus>,
}

impl EntryPatch {
    pub fn check(&self) -> Result<(), DirectoryError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DirectoryError::Validation("Name cannot be empty".to_string()));
            }
        }
        if let Some(contacts) = &self.contacts {
            contacts.validate_all()?;
        }
        check_fee(self.case_fee)
    }
}

fn check_fee(fee: Option<Money>) -> Result<(), DirectoryError> {
    match fee {
        Some(fee) if fee.is_negative() => Err(DirectoryError::Validation(format!(
            "caseFee must not be negative, got {}",
            fee
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_round_trips_through_discriminator() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("Client".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_entity_ref_keeps_kind_and_id() {
        let id = Uuid::new_v4();
        let entity = EntityRef::from_parts(EntityKind::Providers, id);
        assert_eq!(entity.kind(), EntityKind::Providers);
        assert_eq!(entity.id(), id);
    }

    #[test]
    fn test_only_hospitals_get_a_relation() {
        let hospital = DirectoryEntry::from_new(EntityKind::Hospitals, NewEntry {
            name: "St. Mary".into(),
            ..Default::default()
        });
        let client = DirectoryEntry::from_new(EntityKind::Clients, NewEntry {
            name: "Acme Health".into(),
            relation: Some(HospitalRelation::Cashless),
            ..Default::default()
        });
        assert_eq!(hospital.relation, Some(HospitalRelation::Cash));
        assert_eq!(client.relation, None);
    }

    #[test]
    fn test_invalid_contact_email_rejected() {
        let entry = NewEntry {
            name: "Acme Health".into(),
            contacts: Contacts {
                primary: Some(Contact {
                    email: Some("not-an-email".into()),
                    ..Default::default()
                }),
                secondary: None,
            },
            ..Default::default()
        };
        assert!(matches!(entry.check(), Err(DirectoryError::Validation(_))));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let patch = EntryPatch {
            case_fee: Some(Money::new(dec!(-10))),
            ..Default::default()
        };
        assert!(patch.check().is_err());
    }
}
