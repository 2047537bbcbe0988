//! Case CRUD service

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use core_kernel::{CaseId, DateRange, MonthKey};
use domain_directory::{Directory, DirectoryEntry, EntityKind, EntityRef};

use crate::actor::Actor;
use crate::case::{Case, CasePatch, CaseStatus, NewCase};
use crate::error::CaseError;
use crate::ports::{CaseFilter, CasePort, SequencePort};

/// Formats a case number: `CMA{yy}-{mm}{seq}`, sequence padded to two digits
pub fn case_number(month: MonthKey, seq: u32) -> String {
    format!("CMA{:02}-{:02}{:02}", month.year().rem_euclid(100), month.month(), seq)
}

#[derive(Clone)]
pub struct CaseService {
    cases: Arc<dyn CasePort>,
    sequences: Arc<dyn SequencePort>,
    directory: Directory,
}

impl CaseService {
    pub fn new(cases: Arc<dyn CasePort>, sequences: Arc<dyn SequencePort>, directory: Directory) -> Self {
        Self {
            cases,
            sequences,
            directory,
        }
    }

    /// Opens a case after resolving its insurer and service location
    #[instrument(skip(self, new, actor), fields(actor = %actor.id))]
    pub async fn create(&self, new: NewCase, actor: &Actor) -> Result<Case, CaseError> {
        let valid = new.validate()?;
        let insurer = resolve_insurer(&self.directory, valid.insurer).await?;
        let location = resolve_location(&self.directory, valid.hospital_id).await?;

        let now = Utc::now();
        let month = MonthKey::of(now);
        let seq = self.sequences.next_in_month(month).await?;

        let case = Case::open(valid, &insurer, &location, case_number(month, seq), actor);
        let created = self.cases.insert(&case).await?;
        info!(case_id = %created.id, case_number = %created.case_number, "Case opened");
        Ok(created)
    }

    /// Cases created in the window; employees only see their own
    pub async fn list(
        &self,
        status: Option<CaseStatus>,
        range: DateRange,
        actor: &Actor,
    ) -> Result<Vec<Case>, CaseError> {
        let filter = CaseFilter {
            status,
            range,
            created_by: if actor.is_admin() { None } else { Some(actor.id) },
        };
        Ok(self.cases.list(&filter).await?)
    }

    pub async fn get(&self, id: CaseId, actor: &Actor) -> Result<Case, CaseError> {
        let case = self.cases.get(id).await?;
        if !actor.can_access(case.created_by_id) {
            return Err(CaseError::not_found("Case", id));
        }
        Ok(case)
    }

    #[instrument(skip(self, patch, actor))]
    pub async fn update(&self, id: CaseId, patch: CasePatch, actor: &Actor) -> Result<Case, CaseError> {
        patch.check()?;
        let mut case = self.get(id, actor).await?;
        case.apply(patch, actor);
        let saved = self.cases.save_details(&case).await?;
        info!(case_id = %id, "Case updated");
        Ok(saved)
    }

    /// Admin-only; a case waiting for finance approval cannot be deleted
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, id: CaseId, actor: &Actor) -> Result<(), CaseError> {
        if !actor.is_admin() {
            warn!(user = %actor.id, case_id = %id, "Non-admin attempted case delete");
            return Err(CaseError::Forbidden("Only admins can delete cases".to_string()));
        }
        let case = self.cases.get(id).await?;
        if case.status == CaseStatus::InReview {
            return Err(CaseError::conflict(
                "Case is in review; approve or reject its finance entry first",
            ));
        }
        self.cases.delete(id, case.status).await?;
        info!(case_id = %id, "Case deleted");
        Ok(())
    }
}

pub(crate) async fn resolve_insurer(directory: &Directory, insurer: EntityRef) -> Result<DirectoryEntry, CaseError> {
    directory.lookup(insurer).await?.ok_or_else(|| {
        CaseError::not_found(insurer.kind().label(), insurer.id())
    })
}

/// A hospital, or a provider acting as the service location
pub(crate) async fn resolve_location(directory: &Directory, id: Uuid) -> Result<DirectoryEntry, CaseError> {
    if let Some(hospital) = directory.lookup(EntityRef::from_parts(EntityKind::Hospitals, id)).await? {
        return Ok(hospital);
    }
    directory
        .lookup(EntityRef::from_parts(EntityKind::Providers, id))
        .await?
        .ok_or_else(|| CaseError::not_found("Hospital", id))
}
