//! Case aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{CaseId, Money, UserId};
use domain_directory::{DirectoryEntry, EntityKind, EntityRef};

use crate::actor::{Actor, Role};
use crate::error::CaseError;

/// Workflow status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    /// Being worked on by the desk
    Open,
    /// Waiting for finance approval
    InReview,
    /// Approved and invoiced
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InReview => "in-review",
            CaseStatus::Closed => "closed",
        }
    }

    /// The only edges of the case state machine
    pub fn can_transition_to(&self, target: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (self, target),
            (Open, InReview) | (InReview, Closed) | (InReview, Open)
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(CaseStatus::Open),
            "in-review" => Ok(CaseStatus::InReview),
            "closed" => Ok(CaseStatus::Closed),
            other => Err(CaseError::validation(format!(
                "Invalid status '{}'. Must be one of: open, in-review, closed",
                other
            ))),
        }
    }
}

/// Auxiliary flags (`invoiceStatus`, `mrStatus`), independent of the workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuxStatus {
    #[default]
    Pending,
    Completed,
}

impl AuxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuxStatus::Pending => "pending",
            AuxStatus::Completed => "completed",
        }
    }
}

/// A patient referral moving through the case workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    /// Sequence number, e.g. `CMA25-0701`
    pub case_number: String,
    /// External reference given by the insurer; unique when present
    pub insurance_reference: Option<String>,
    pub insurer: EntityRef,
    /// Insurer name at creation time
    pub insurance: String,
    /// Service location; a hospital, or a provider acting as one
    pub hospital_id: Uuid,
    pub hospital: String,
    pub patient_name: String,
    pub claim_amount: Money,
    pub service_type: Option<String>,
    pub coverage: Vec<String>,
    pub assistance_date: Option<NaiveDate>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub status: CaseStatus,
    pub invoice_status: AuxStatus,
    pub mr_status: AuxStatus,
    pub remarks: Option<String>,
    pub remark_user: Option<String>,
    pub remark_user_role: Option<Role>,
    pub created_by_id: UserId,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub rejected_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Case {
    /// Opens a new case from validated input and the resolved references
    pub fn open(
        new: ValidCase,
        insurer: &DirectoryEntry,
        location: &DirectoryEntry,
        case_number: String,
        actor: &Actor,
    ) -> Self {
        let now = Utc::now();
        let mut case = Self {
            id: CaseId::new_v7(),
            case_number,
            insurance_reference: new.insurance_reference,
            insurer: insurer.entity_ref(),
            insurance: insurer.name.clone(),
            hospital_id: location.id,
            hospital: location.name.clone(),
            patient_name: new.patient_name,
            claim_amount: new.claim_amount,
            service_type: new.service_type,
            coverage: new.coverage,
            assistance_date: new.assistance_date,
            region: new.region.or_else(|| insurer.region.clone()),
            country: new.country.or_else(|| insurer.country.clone()),
            address: new.address,
            status: CaseStatus::Open,
            invoice_status: AuxStatus::Pending,
            mr_status: AuxStatus::Pending,
            remarks: None,
            remark_user: None,
            remark_user_role: None,
            created_by_id: actor.id,
            created_by: actor.name.clone(),
            approved_by: None,
            rejected_by: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        if let Some(remark) = new.remarks {
            case.set_remark(remark, actor);
        }
        case
    }

    pub fn is_active(&self) -> bool {
        self.status == CaseStatus::Open
    }

    /// open -> in-review
    pub fn begin_review(&mut self, remark: Option<String>, actor: &Actor) -> Result<(), CaseError> {
        match self.status {
            CaseStatus::InReview => return Err(CaseError::conflict("Case is already in review")),
            CaseStatus::Closed => return Err(CaseError::conflict("Case is already closed")),
            CaseStatus::Open => {}
        }
        self.transition(CaseStatus::InReview)?;
        if let Some(remark) = remark {
            self.set_remark(remark, actor);
        }
        Ok(())
    }

    /// in-review -> closed
    pub fn approve(&mut self, actor: &Actor) -> Result<(), CaseError> {
        self.transition(CaseStatus::Closed)?;
        self.approved_by = Some(actor.name.clone());
        self.closed_at = Some(self.updated_at);
        Ok(())
    }

    /// in-review -> open
    pub fn reject(&mut self, remark: Option<String>, actor: &Actor) -> Result<(), CaseError> {
        self.transition(CaseStatus::Open)?;
        self.rejected_by = Some(actor.name.clone());
        if let Some(remark) = remark {
            self.set_remark(remark, actor);
        }
        Ok(())
    }

    /// Applies an edit that does not touch the workflow
    pub fn apply(&mut self, patch: CasePatch, actor: &Actor) {
        if let Some(patient_name) = patch.patient_name {
            self.patient_name = patient_name.trim().to_string();
        }
        if let Some(reference) = patch.insurance_reference {
            self.insurance_reference = non_blank(reference);
        }
        if let Some(amount) = patch.claim_amount {
            self.claim_amount = amount;
        }
        if let Some(service_type) = patch.service_type {
            self.service_type = Some(service_type);
        }
        if let Some(coverage) = patch.coverage {
            self.coverage = coverage;
        }
        if let Some(date) = patch.assistance_date {
            self.assistance_date = Some(date);
        }
        if let Some(region) = patch.region {
            self.region = Some(region);
        }
        if let Some(country) = patch.country {
            self.country = Some(country);
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(status) = patch.invoice_status {
            self.invoice_status = status;
        }
        if let Some(status) = patch.mr_status {
            self.mr_status = status;
        }
        if let Some(remark) = patch.remarks {
            self.set_remark(remark, actor);
        }
        self.updated_at = Utc::now();
    }

    // Latest remark wins; earlier remarks are not kept
    fn set_remark(&mut self, remark: String, actor: &Actor) {
        self.remarks = Some(remark);
        self.remark_user = Some(actor.name.clone());
        self.remark_user_role = Some(actor.role);
    }

    fn transition(&mut self, target: CaseStatus) -> Result<(), CaseError> {
        if !self.status.can_transition_to(target) {
            return Err(CaseError::conflict(format!(
                "Invalid status transition from {} to {}",
                self.status, target
            )));
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Request body for creating a case
///
/// Required fields are optional here so that a missing one is reported as a
/// validation error naming the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    pub insurance_reference: Option<String>,
    pub patient_name: Option<String>,
    pub insurance_type: Option<String>,
    pub insurance_id: Option<Uuid>,
    pub hospital: Option<String>,
    pub hospital_id: Option<Uuid>,
    pub claim_amount: Option<Money>,
    pub service_type: Option<String>,
    #[serde(default)]
    pub coverage: Vec<String>,
    pub assistance_date: Option<NaiveDate>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub remarks: Option<String>,
}

/// A [`NewCase`] whose required fields are present and well-formed
#[derive(Debug, Clone)]
pub struct ValidCase {
    pub insurance_reference: Option<String>,
    pub patient_name: String,
    pub insurer: EntityRef,
    pub hospital: String,
    pub hospital_id: Uuid,
    pub claim_amount: Money,
    pub service_type: Option<String>,
    pub coverage: Vec<String>,
    pub assistance_date: Option<NaiveDate>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub remarks: Option<String>,
}

impl NewCase {
    pub fn validate(self) -> Result<ValidCase, CaseError> {
        let mut missing = Vec::new();
        let patient_name = self.patient_name.and_then(non_blank);
        let insurance_type = self.insurance_type.and_then(non_blank);
        let hospital = self.hospital.and_then(non_blank);
        if patient_name.is_none() {
            missing.push("patientName");
        }
        if insurance_type.is_none() {
            missing.push("insuranceType");
        }
        if self.insurance_id.is_none() {
            missing.push("insuranceId");
        }
        if hospital.is_none() {
            missing.push("hospital");
        }
        if self.hospital_id.is_none() {
            missing.push("hospitalId");
        }

        match (patient_name, insurance_type, self.insurance_id, hospital, self.hospital_id) {
            (Some(patient_name), Some(insurance_type), Some(insurance_id), Some(hospital), Some(hospital_id)) => {
                let kind: EntityKind = insurance_type.parse().map_err(|_| {
                    CaseError::validation(format!(
                        "Invalid insuranceType '{}'. Must be one of: clients, providers, hospitals",
                        insurance_type
                    ))
                })?;
                let claim_amount = self
                    .claim_amount
                    .unwrap_or_default()
                    .non_negative("claimAmount")
                    .map_err(|e| CaseError::validation(e.to_string()))?;

                Ok(ValidCase {
                    insurance_reference: self.insurance_reference.and_then(non_blank),
                    patient_name,
                    insurer: EntityRef::from_parts(kind, insurance_id),
                    hospital,
                    hospital_id,
                    claim_amount,
                    service_type: self.service_type,
                    coverage: self.coverage,
                    assistance_date: self.assistance_date,
                    region: self.region,
                    country: self.country,
                    address: self.address,
                    remarks: self.remarks.and_then(non_blank),
                })
            }
            _ => Err(CaseError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Partial edit of a case
///
/// Status and the insurer/hospital references are listed only so that an
/// attempt to change them is rejected instead of silently ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePatch {
    pub patient_name: Option<String>,
    pub insurance_reference: Option<String>,
    pub claim_amount: Option<Money>,
    pub service_type: Option<String>,
    pub coverage: Option<Vec<String>>,
    pub assistance_date: Option<NaiveDate>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub invoice_status: Option<AuxStatus>,
    pub mr_status: Option<AuxStatus>,
    pub remarks: Option<String>,
    pub status: Option<CaseStatus>,
    pub insurance_type: Option<String>,
    pub insurance_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
}

impl CasePatch {
    pub fn check(&self) -> Result<(), CaseError> {
        if self.status.is_some() {
            return Err(CaseError::validation(
                "status can only be changed through the case workflow",
            ));
        }
        if self.insurance_type.is_some() || self.insurance_id.is_some() || self.hospital_id.is_some() {
            return Err(CaseError::validation(
                "insurer and hospital references cannot be changed",
            ));
        }
        if let Some(name) = &self.patient_name {
            if name.trim().is_empty() {
                return Err(CaseError::validation("patientName cannot be empty"));
            }
        }
        if let Some(amount) = self.claim_amount {
            amount
                .non_negative("claimAmount")
                .map_err(|e| CaseError::validation(e.to_string()))?;
        }
        Ok(())
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
