//! Integration tests for domain_cases, run against the in-memory store

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use core_kernel::{DateRange, Money, UserId};
use domain_cases::{
    Actor, Case, CaseError, CaseLifecycle, CasePatch, CaseService, CaseStatus, FinanceDecision,
    FinanceOutcome, InMemoryCaseStore, InvoiceStatus, LifecycleSettings, NewCase,
    ReportingService, RequestContext, Role,
};
use domain_directory::{
    ActiveCaseCounter, Directory, DirectoryEntry, DirectoryPort, EntityKind, EntryPatch, NewEntry,
};

struct Desk {
    store: Arc<InMemoryCaseStore>,
    directory: Directory,
    cases: CaseService,
    lifecycle: CaseLifecycle,
    reporting: ReportingService,
    client: DirectoryEntry,
    hospital: DirectoryEntry,
}

async fn add_entry(directory: &Directory, kind: EntityKind, new: NewEntry) -> DirectoryEntry {
    let entry = DirectoryEntry::from_new(kind, new);
    directory.port(kind).insert(&entry).await.unwrap()
}

async fn desk() -> Desk {
    let store = Arc::new(InMemoryCaseStore::new());
    let directory = Directory::in_memory();
    let client = add_entry(&directory, EntityKind::Clients, NewEntry {
        name: "C1".into(),
        case_fee: Some(Money::new(dec!(150))),
        region: Some("GCC".into()),
        country: Some("UAE".into()),
        ..Default::default()
    })
    .await;
    let hospital = add_entry(&directory, EntityKind::Hospitals, NewEntry {
        name: "H".into(),
        ..Default::default()
    })
    .await;

    Desk {
        cases: CaseService::new(store.clone(), store.clone(), directory.clone()),
        lifecycle: CaseLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            directory.clone(),
            LifecycleSettings::default(),
        ),
        reporting: ReportingService::new(store.clone()),
        store,
        directory,
        client,
        hospital,
    }
}

fn employee() -> Actor {
    Actor::new(UserId::new(), "Erin", Role::Employee)
}

fn admin() -> Actor {
    Actor::new(UserId::new(), "Ada", Role::Admin)
}

fn new_case(desk: &Desk) -> NewCase {
    NewCase {
        patient_name: Some("A".into()),
        insurance_type: Some("clients".into()),
        insurance_id: Some(desk.client.id),
        hospital: Some("H".into()),
        hospital_id: Some(desk.hospital.id),
        claim_amount: Some(Money::new(dec!(1200.50))),
        ..Default::default()
    }
}

fn window() -> DateRange {
    DateRange::resolve(None, Some(Utc::now() + Duration::minutes(1)), Utc::now()).unwrap()
}

async fn in_review(desk: &Desk, actor: &Actor) -> Case {
    let case = desk.cases.create(new_case(desk), actor).await.unwrap();
    desk.lifecycle.close_case(case.id, Some("ready".into()), actor).await.unwrap()
}

async fn finance_of(desk: &Desk, case: &Case) -> domain_cases::Finance {
    desk.lifecycle
        .list_finances(window())
        .await
        .unwrap()
        .into_iter()
        .find(|f| f.case_id == case.id)
        .unwrap()
}

// ============================================================================
// Case creation
// ============================================================================

mod creation_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_number_and_opens() {
        let desk = desk().await;
        let first = desk.cases.create(new_case(&desk), &employee()).await.unwrap();
        let second = desk.cases.create(new_case(&desk), &employee()).await.unwrap();

        assert_eq!(first.status, CaseStatus::Open);
        assert!(first.case_number.starts_with("CMA"));
        assert!(first.case_number.ends_with("01"));
        assert!(second.case_number.ends_with("02"));
        assert_eq!(first.insurance, "C1");
    }

    #[tokio::test]
    async fn test_unknown_insurer_is_not_found() {
        let desk = desk().await;
        let mut new = new_case(&desk);
        new.insurance_id = Some(Uuid::new_v4());

        let err = desk.cases.create(new, &employee()).await.unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insurer_must_match_type() {
        let desk = desk().await;
        let mut new = new_case(&desk);
        new.insurance_type = Some("providers".into());

        let err = desk.cases.create(new, &employee()).await.unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_provider_accepted_as_service_location() {
        let desk = desk().await;
        let provider = add_entry(&desk.directory, EntityKind::Providers, NewEntry {
            name: "Mobile Clinic".into(),
            ..Default::default()
        })
        .await;
        let mut new = new_case(&desk);
        new.hospital_id = Some(provider.id);

        let case = desk.cases.create(new, &employee()).await.unwrap();
        assert_eq!(case.hospital, "Mobile Clinic");
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_conflict() {
        let desk = desk().await;
        let mut new = new_case(&desk);
        new.insurance_reference = Some("REF-1".into());
        desk.cases.create(new.clone(), &employee()).await.unwrap();

        let err = desk.cases.create(new, &employee()).await.unwrap_err();
        assert!(matches!(err, CaseError::Conflict(ref m) if m.contains("REF-1")));
    }

    #[tokio::test]
    async fn test_employee_sees_only_own_cases() {
        let desk = desk().await;
        let erin = employee();
        let other = employee();
        desk.cases.create(new_case(&desk), &erin).await.unwrap();
        desk.cases.create(new_case(&desk), &other).await.unwrap();

        assert_eq!(desk.cases.list(None, window(), &erin).await.unwrap().len(), 1);
        assert_eq!(desk.cases.list(None, window(), &admin()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_patch_keeps_workflow_state() {
        let desk = desk().await;
        let erin = employee();
        let case = in_review(&desk, &erin).await;

        let updated = desk
            .cases
            .update(case.id, CasePatch {
                address: Some("Villa 12".into()),
                ..Default::default()
            }, &erin)
            .await
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("Villa 12"));
        assert_eq!(updated.status, CaseStatus::InReview);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let desk = desk().await;
        let erin = employee();
        let reviewing = in_review(&desk, &erin).await;
        let open = desk.cases.create(new_case(&desk), &erin).await.unwrap();

        assert!(matches!(desk.cases.delete(open.id, &erin).await, Err(CaseError::Forbidden(_))));
        assert!(matches!(desk.cases.delete(reviewing.id, &admin()).await, Err(CaseError::Conflict(_))));
        desk.cases.delete(open.id, &admin()).await.unwrap();
        assert!(desk.cases.get(open.id, &admin()).await.is_err());
    }
}

// ============================================================================
// Lifecycle transitions
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let desk = desk().await;
        let erin = employee();
        let case = desk.cases.create(new_case(&desk), &erin).await.unwrap();
        assert_eq!(case.status, CaseStatus::Open);

        let reviewed = desk.lifecycle.close_case(case.id, Some("ready".into()), &erin).await.unwrap();
        assert_eq!(reviewed.status, CaseStatus::InReview);
        assert_eq!(reviewed.remarks.as_deref(), Some("ready"));
        assert_eq!(desk.store.finance_count().await, 1);

        let finance = finance_of(&desk, &case).await;
        let outcome = desk
            .lifecycle
            .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin(), &RequestContext::default())
            .await
            .unwrap();

        let FinanceOutcome::Approved { case: closed, invoice } = outcome else {
            panic!("expected approval");
        };
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.case_id, case.id);
        assert_eq!(invoice.finance_id, finance.id);
        assert_eq!(closed.status, CaseStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(desk.store.finance_count().await, 0);
        assert_eq!(desk.store.invoice_count().await, 1);

        let stored = desk.cases.get(case.id, &erin).await.unwrap();
        assert_eq!(stored.status, CaseStatus::Closed);
        assert_eq!(stored.approved_by.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_finance_snapshots_current_fee() {
        let desk = desk().await;
        let erin = employee();
        let case = in_review(&desk, &erin).await;
        let finance = finance_of(&desk, &case).await;
        assert_eq!(finance.case_fee, Money::new(dec!(150)));
        assert_eq!(finance.region.as_deref(), Some("GCC"));
        assert_eq!(finance.due_date - finance.issue_date, Duration::days(30));

        // Later fee changes do not rewrite the snapshot
        let mut client = desk.client.clone();
        client.apply(EntryPatch {
            case_fee: Some(Money::new(dec!(999))),
            ..Default::default()
        });
        desk.directory.port(EntityKind::Clients).update(&client).await.unwrap();
        assert_eq!(finance_of(&desk, &case).await.case_fee, Money::new(dec!(150)));
    }

    #[tokio::test]
    async fn test_close_twice_is_conflict() {
        let desk = desk().await;
        let erin = employee();
        let case = in_review(&desk, &erin).await;

        let err = desk.lifecycle.close_case(case.id, None, &erin).await.unwrap_err();
        assert!(matches!(err, CaseError::Conflict(_)));
        assert_eq!(desk.store.finance_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_fee_keeps_case_open() {
        let desk = desk().await;
        let feeless = add_entry(&desk.directory, EntityKind::Clients, NewEntry {
            name: "No Fee".into(),
            ..Default::default()
        })
        .await;
        let mut new = new_case(&desk);
        new.insurance_id = Some(feeless.id);
        let erin = employee();
        let case = desk.cases.create(new, &erin).await.unwrap();

        let err = desk.lifecycle.close_case(case.id, None, &erin).await.unwrap_err();
        assert!(matches!(err, CaseError::Validation(_)));
        assert_eq!(desk.cases.get(case.id, &erin).await.unwrap().status, CaseStatus::Open);
        assert_eq!(desk.store.finance_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_case_untouched() {
        let desk = desk().await;
        let erin = employee();
        let case = desk.cases.create(new_case(&desk), &erin).await.unwrap();

        desk.store.fail_commits(true);
        let err = desk.lifecycle.close_case(case.id, Some("ready".into()), &erin).await.unwrap_err();
        assert!(matches!(err, CaseError::Upstream(_)));

        desk.store.fail_commits(false);
        let stored = desk.cases.get(case.id, &erin).await.unwrap();
        assert_eq!(stored.status, CaseStatus::Open);
        assert!(stored.remarks.is_none());
        assert_eq!(desk.store.finance_count().await, 0);
    }

    #[tokio::test]
    async fn test_reject_reopens_without_invoice() {
        let desk = desk().await;
        let erin = employee();
        let case = in_review(&desk, &erin).await;
        let finance = finance_of(&desk, &case).await;

        let outcome = desk
            .lifecycle
            .update_finance_status(
                finance.id,
                FinanceDecision::Reject,
                Some("missing report".into()),
                &admin(),
                &RequestContext::default(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, FinanceOutcome::Rejected { .. }));

        let stored = desk.cases.get(case.id, &erin).await.unwrap();
        assert_eq!(stored.status, CaseStatus::Open);
        assert_eq!(stored.rejected_by.as_deref(), Some("Ada"));
        assert_eq!(stored.remarks.as_deref(), Some("missing report"));
        assert_eq!(desk.store.finance_count().await, 0);
        assert_eq!(desk.store.invoice_count().await, 0);

        // The case re-enters the workflow
        desk.lifecycle.close_case(case.id, None, &erin).await.unwrap();
        assert_eq!(desk.store.finance_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_decision_is_not_found() {
        let desk = desk().await;
        let case = in_review(&desk, &employee()).await;
        let finance = finance_of(&desk, &case).await;
        let ctx = RequestContext::default();

        desk.lifecycle
            .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin(), &ctx)
            .await
            .unwrap();
        for decision in [FinanceDecision::Approve, FinanceDecision::Reject] {
            let err = desk
                .lifecycle
                .update_finance_status(finance.id, decision, None, &admin(), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, CaseError::NotFound { .. }));
        }
        assert_eq!(desk.store.invoice_count().await, 1);
    }

    #[tokio::test]
    async fn test_employee_cannot_decide() {
        let desk = desk().await;
        let erin = employee();
        let case = in_review(&desk, &erin).await;
        let finance = finance_of(&desk, &case).await;

        let err = desk
            .lifecycle
            .update_finance_status(finance.id, FinanceDecision::Approve, None, &erin, &RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_orphaned_finance_is_logged() {
        let desk = desk().await;
        let case = in_review(&desk, &employee()).await;
        let finance = finance_of(&desk, &case).await;
        desk.store.remove_case_unchecked(case.id).await;

        let ctx = RequestContext { ip: Some("10.0.0.7".into()) };
        let err = desk
            .lifecycle
            .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Integrity(_)));

        let issues = desk.store.issues().await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(issues[0].data["caseId"], case.id.to_string());
        assert_eq!(desk.store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_invoice_paid_and_unpaid() {
        let desk = desk().await;
        let case = in_review(&desk, &employee()).await;
        let finance = finance_of(&desk, &case).await;
        let outcome = desk
            .lifecycle
            .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin(), &RequestContext::default())
            .await
            .unwrap();
        let FinanceOutcome::Approved { invoice, .. } = outcome else {
            panic!("expected approval");
        };

        let paid = desk.lifecycle.update_invoice_status(invoice.id, InvoiceStatus::Paid, &admin()).await.unwrap();
        assert!(paid.paid_date.is_some());
        let err = desk.lifecycle.update_invoice_status(invoice.id, InvoiceStatus::Paid, &admin()).await.unwrap_err();
        assert!(matches!(err, CaseError::Conflict(_)));

        let unpaid = desk.lifecycle.update_invoice_status(invoice.id, InvoiceStatus::Unpaid, &admin()).await.unwrap();
        assert!(unpaid.paid_date.is_none());
        assert_eq!(desk.lifecycle.list_invoices(window()).await.unwrap().len(), 1);
    }
}

// ============================================================================
// Reporting and caseload
// ============================================================================

mod reporting_tests {
    use super::*;

    #[tokio::test]
    async fn test_monthly_counts_dense_over_window() {
        let desk = desk().await;
        let erin = employee();
        desk.cases.create(new_case(&desk), &erin).await.unwrap();
        desk.cases.create(new_case(&desk), &erin).await.unwrap();

        let range = window();
        let series = desk
            .reporting
            .monthly_counts_grouped(Some(CaseStatus::Open), EntityKind::Clients, range)
            .await
            .unwrap();
        let counts = &series["C1"];
        assert_eq!(counts.len(), range.month_count());
        assert_eq!(counts.iter().sum::<u64>(), 2);
        assert_eq!(*counts.last().unwrap(), 2);

        let by_hospital = desk
            .reporting
            .monthly_counts_grouped(None, EntityKind::Hospitals, range)
            .await
            .unwrap();
        assert!(by_hospital.contains_key("H"));
        let by_provider = desk
            .reporting
            .monthly_counts_grouped(None, EntityKind::Providers, range)
            .await
            .unwrap();
        assert!(by_provider.is_empty());
    }

    #[tokio::test]
    async fn test_closed_counts_by_user() {
        let desk = desk().await;
        let erin = employee();
        let ctx = RequestContext::default();
        for _ in 0..2 {
            let case = in_review(&desk, &erin).await;
            let finance = finance_of(&desk, &case).await;
            desk.lifecycle
                .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin(), &ctx)
                .await
                .unwrap();
        }
        in_review(&desk, &employee()).await;

        let counts = desk.reporting.closed_case_counts_by_user(window()).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].created_by_id, erin.id);
        assert_eq!(counts[0].count, 2);
    }

    #[tokio::test]
    async fn test_only_open_cases_are_active() {
        let desk = desk().await;
        let erin = employee();
        desk.cases.create(new_case(&desk), &erin).await.unwrap();
        in_review(&desk, &erin).await;

        let ids = [desk.client.id];
        let counts = desk.store.active_case_counts(EntityKind::Clients, &ids).await.unwrap();
        assert_eq!(counts.get(&desk.client.id), Some(&1));

        let hospital_ids = [desk.hospital.id];
        let by_hospital = desk.store.active_case_counts(EntityKind::Hospitals, &hospital_ids).await.unwrap();
        assert_eq!(by_hospital.get(&desk.hospital.id), Some(&1));

        let none = desk.store.active_case_counts(EntityKind::Providers, &ids).await.unwrap();
        assert!(none.is_empty());
    }
}
