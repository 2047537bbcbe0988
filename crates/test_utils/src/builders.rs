//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out the fields they
//! care about. Names default to random fake values to keep unique-name
//! constraints out of the way.

use chrono::NaiveDate;
use core_kernel::Money;
use domain_directory::{Contact, Contacts, DirectoryEntry, EntityKind, HospitalRelation, NewEntry};
use domain_cases::NewCase;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;

use crate::fixtures::{MoneyFixtures, StringFixtures};

/// Builder for directory records
pub struct DirectoryEntryBuilder {
    kind: EntityKind,
    entry: NewEntry,
}

impl DirectoryEntryBuilder {
    /// A record of `kind` with a random company name
    pub fn new(kind: EntityKind) -> Self {
        let name: String = CompanyName().fake();
        Self {
            kind,
            entry: NewEntry {
                name: format!("{} {}", name, &Uuid::new_v4().simple().to_string()[..6]),
                ..Default::default()
            },
        }
    }

    /// A client with the standard fee, region and country
    pub fn client() -> Self {
        Self::new(EntityKind::Clients)
            .with_case_fee(MoneyFixtures::case_fee())
            .with_region(StringFixtures::region())
            .with_country(StringFixtures::country())
    }

    pub fn provider() -> Self {
        Self::new(EntityKind::Providers).with_case_fee(MoneyFixtures::case_fee())
    }

    pub fn hospital() -> Self {
        Self::new(EntityKind::Hospitals).with_relation(HospitalRelation::Cash)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.entry.name = name.into();
        self
    }

    pub fn with_case_fee(mut self, fee: Money) -> Self {
        self.entry.case_fee = Some(fee);
        self
    }

    pub fn without_case_fee(mut self) -> Self {
        self.entry.case_fee = None;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.entry.region = Some(region.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.entry.country = Some(country.into());
        self
    }

    pub fn with_coverage(mut self, coverage: &[&str]) -> Self {
        self.entry.coverage = coverage.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_relation(mut self, relation: HospitalRelation) -> Self {
        self.entry.relation = Some(relation);
        self
    }

    /// Adds a primary contact with a fake person name
    pub fn with_primary_contact(mut self, email: impl Into<String>) -> Self {
        let name: String = Name().fake();
        self.entry.contacts = Contacts {
            primary: Some(Contact {
                name: Some(name),
                email: Some(email.into()),
                ..Default::default()
            }),
            secondary: self.entry.contacts.secondary,
        };
        self
    }

    /// The creation request, for service-level tests
    pub fn build_request(self) -> NewEntry {
        self.entry
    }

    /// A materialized record, for seeding stores directly
    pub fn build(self) -> DirectoryEntry {
        DirectoryEntry::from_new(self.kind, self.entry)
    }
}

/// Builder for case creation requests
pub struct NewCaseBuilder {
    request: NewCase,
}

impl NewCaseBuilder {
    /// A complete request against the given insurer and hospital
    pub fn new(insurer: &DirectoryEntry, hospital: &DirectoryEntry) -> Self {
        Self {
            request: NewCase {
                patient_name: Some(StringFixtures::patient_name().to_string()),
                insurance_type: Some(insurer.kind.as_str().to_string()),
                insurance_id: Some(insurer.id),
                hospital: Some(hospital.name.clone()),
                hospital_id: Some(hospital.id),
                claim_amount: Some(MoneyFixtures::claim_amount()),
                ..Default::default()
            },
        }
    }

    pub fn with_patient_name(mut self, name: impl Into<String>) -> Self {
        self.request.patient_name = Some(name.into());
        self
    }

    /// A random patient name
    pub fn with_fake_patient(self) -> Self {
        let name: String = Name().fake();
        self.with_patient_name(name)
    }

    pub fn with_insurance_reference(mut self, reference: impl Into<String>) -> Self {
        self.request.insurance_reference = Some(reference.into());
        self
    }

    pub fn with_claim_amount(mut self, amount: Money) -> Self {
        self.request.claim_amount = Some(amount);
        self
    }

    pub fn with_assistance_date(mut self, date: NaiveDate) -> Self {
        self.request.assistance_date = Some(date);
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.request.remarks = Some(remarks.into());
        self
    }

    pub fn without_patient_name(mut self) -> Self {
        self.request.patient_name = None;
        self
    }

    pub fn build(self) -> NewCase {
        self.request
    }
}
