//! PostgreSQL integration tests
//!
//! Each test starts its own container; run with `cargo test -- --ignored`.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;

use core_kernel::{CaseId, MonthKey};
use domain_cases::{
    case_number, CaseError, CaseLifecycle, CaseService, CaseStatus, Finance, FinanceDecision,
    FinanceOutcome, FinancePort, InvoicePort, InvoiceStatus, LifecyclePort, LifecycleSettings,
    ReportingService, RequestContext, SequencePort,
};
use domain_directory::{Directory, DirectoryEntry, DirectoryError, DirectoryPort, DirectoryService, EntityKind};
use infra_db::{PostgresCaseAdapter, PostgresDirectoryAdapter};
use test_utils::{
    assert_case_conflict, assert_case_status, assert_money_eq, assert_port_conflict, assert_series,
    assert_series_dense, db_test, ActorFixtures, DirectoryEntryBuilder, MoneyFixtures, NewCaseBuilder,
    TemporalFixtures,
};

struct Desk {
    directory: DirectoryService,
    cases: CaseService,
    lifecycle: CaseLifecycle,
    reporting: ReportingService,
    store: Arc<PostgresCaseAdapter>,
}

fn desk(pool: &PgPool) -> Desk {
    let directory = Directory::new(
        Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Clients)),
        Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Providers)),
        Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Hospitals)),
    );
    let store = Arc::new(PostgresCaseAdapter::new(pool.clone()));
    Desk {
        directory: DirectoryService::new(directory.clone(), store.clone()),
        cases: CaseService::new(store.clone(), store.clone(), directory.clone()),
        lifecycle: CaseLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            directory,
            LifecycleSettings::default(),
        ),
        reporting: ReportingService::new(store.clone()),
        store,
    }
}

async fn seed(desk: &Desk) -> (DirectoryEntry, DirectoryEntry) {
    let client = desk
        .directory
        .create(EntityKind::Clients, DirectoryEntryBuilder::client().build_request())
        .await
        .unwrap();
    let hospital = desk
        .directory
        .create(EntityKind::Hospitals, DirectoryEntryBuilder::hospital().build_request())
        .await
        .unwrap();
    (client, hospital)
}

async fn finance_of(desk: &Desk, case_id: CaseId) -> Option<Finance> {
    FinancePort::find_by_case(desk.store.as_ref(), case_id).await.unwrap()
}

// ============================================================================
// Directory
// ============================================================================

db_test!(test_directory_crud_round_trip, |pool| {
    let desk = desk(&pool);
    let created = desk
        .directory
        .create(
            EntityKind::Providers,
            DirectoryEntryBuilder::provider()
                .with_coverage(&["inpatient", "evacuation"])
                .with_primary_contact("ops@provider.test")
                .build_request(),
        )
        .await
        .unwrap();

    let loaded = desk.directory.get(EntityKind::Providers, created.id).await.unwrap();
    assert_eq!(loaded.name, created.name);
    assert_eq!(loaded.coverage, vec!["inpatient", "evacuation"]);
    assert_eq!(
        loaded.contacts.primary.and_then(|c| c.email).as_deref(),
        Some("ops@provider.test")
    );
    assert_money_eq(loaded.case_fee.unwrap(), MoneyFixtures::case_fee());

    desk.directory.delete(EntityKind::Providers, created.id).await.unwrap();
    let err = desk.directory.get(EntityKind::Providers, created.id).await.unwrap_err();
    assert!(matches!(err, DirectoryError::NotFound { .. }));
});

db_test!(test_duplicate_name_is_rejected_by_service_and_index, |pool| {
    let desk = desk(&pool);
    let first = desk
        .directory
        .create(EntityKind::Clients, DirectoryEntryBuilder::client().with_name("Acme").build_request())
        .await
        .unwrap();

    let err = desk
        .directory
        .create(EntityKind::Clients, DirectoryEntryBuilder::client().with_name("Acme").build_request())
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Duplicate { .. }));

    // Straight to the adapter, past the service pre-check
    let port = PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Clients);
    let twin = DirectoryEntryBuilder::client().with_name(first.name.clone()).build();
    let field = assert_port_conflict(port.insert(&twin).await);
    assert_eq!(field.as_deref(), Some("name"));
});

db_test!(test_same_name_allowed_across_collections, |pool| {
    let desk = desk(&pool);
    desk.directory
        .create(EntityKind::Clients, DirectoryEntryBuilder::client().with_name("Shared").build_request())
        .await
        .unwrap();
    desk.directory
        .create(EntityKind::Hospitals, DirectoryEntryBuilder::hospital().with_name("Shared").build_request())
        .await
        .unwrap();
});

db_test!(test_entity_with_open_case_cannot_be_deleted, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    desk.cases
        .create(NewCaseBuilder::new(&client, &hospital).build(), &ActorFixtures::employee())
        .await
        .unwrap();

    let listed = desk.directory.list(EntityKind::Clients).await.unwrap();
    let row = listed.iter().find(|e| e.entry.id == client.id).unwrap();
    assert_eq!(row.active_cases, 1);

    let err = desk.directory.delete(EntityKind::Clients, client.id).await.unwrap_err();
    assert!(matches!(err, DirectoryError::InUse { active_cases: 1, .. }));
});

// ============================================================================
// Cases
// ============================================================================

db_test!(test_sequence_increments_per_month, |pool| {
    let store = PostgresCaseAdapter::new(pool.clone());
    let month = MonthKey::new(2025, 7).unwrap();
    assert_eq!(store.next_in_month(month).await.unwrap(), 1);
    assert_eq!(store.next_in_month(month).await.unwrap(), 2);
    assert_eq!(store.next_in_month(month.next()).await.unwrap(), 1);
});

db_test!(test_created_cases_get_consecutive_numbers, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let actor = ActorFixtures::employee();

    let first = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &actor).await.unwrap();
    let second = desk
        .cases
        .create(NewCaseBuilder::new(&client, &hospital).with_fake_patient().build(), &actor)
        .await
        .unwrap();

    let month = MonthKey::of(Utc::now());
    assert_eq!(first.case_number, case_number(month, 1));
    assert_eq!(second.case_number, case_number(month, 2));
    assert_eq!(first.insurance, client.name);
    assert_eq!(first.region, client.region);
    assert_case_status(&first, CaseStatus::Open);

    let loaded = desk.cases.get(first.id, &actor).await.unwrap();
    assert_eq!(loaded.case_number, first.case_number);
    assert_eq!(loaded.created_by_id, actor.id);
    assert_money_eq(loaded.claim_amount, MoneyFixtures::claim_amount());
});

db_test!(test_duplicate_insurance_reference_is_conflict, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let actor = ActorFixtures::employee();

    desk.cases
        .create(NewCaseBuilder::new(&client, &hospital).with_insurance_reference("REF-1").build(), &actor)
        .await
        .unwrap();
    let message = assert_case_conflict(
        desk.cases
            .create(NewCaseBuilder::new(&client, &hospital).with_insurance_reference("REF-1").build(), &actor)
            .await,
    );
    assert_eq!(message, "InsuranceReference \"REF-1\" is already in use.");
});

db_test!(test_employee_only_lists_own_cases, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    desk.cases
        .create(NewCaseBuilder::new(&client, &hospital).build(), &ActorFixtures::employee())
        .await
        .unwrap();
    desk.cases
        .create(NewCaseBuilder::new(&client, &hospital).build(), &ActorFixtures::other_employee())
        .await
        .unwrap();

    let window = TemporalFixtures::around_now();
    let own = desk.cases.list(None, window, &ActorFixtures::employee()).await.unwrap();
    let all = desk.cases.list(None, window, &ActorFixtures::admin()).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(all.len(), 2);
});

// ============================================================================
// Lifecycle
// ============================================================================

db_test!(test_approval_closes_case_and_issues_invoice, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let employee = ActorFixtures::employee();
    let admin = ActorFixtures::admin();

    let case = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    let reviewed = desk
        .lifecycle
        .close_case(case.id, Some("docs attached".to_string()), &employee)
        .await
        .unwrap();
    assert_case_status(&reviewed, CaseStatus::InReview);

    let finance = finance_of(&desk, case.id).await.unwrap();
    assert_money_eq(finance.case_fee, MoneyFixtures::case_fee());
    assert_eq!(finance.insurance, client.name);

    let outcome = desk
        .lifecycle
        .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin, &RequestContext::default())
        .await
        .unwrap();
    let FinanceOutcome::Approved { invoice, .. } = outcome else {
        panic!("expected approval");
    };

    let closed = desk.cases.get(case.id, &admin).await.unwrap();
    assert_case_status(&closed, CaseStatus::Closed);
    assert_eq!(closed.approved_by.as_deref(), Some(admin.name.as_str()));
    assert!(finance_of(&desk, case.id).await.is_none());

    let stored = InvoicePort::get(desk.store.as_ref(), invoice.id).await.unwrap();
    assert_eq!(stored.status, InvoiceStatus::Pending);
    assert_eq!(stored.case_number, case.case_number);
    assert_money_eq(stored.case_fee, MoneyFixtures::case_fee());

    // Second decision on the consumed finance entry
    let err = desk
        .lifecycle
        .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin, &RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CaseError::NotFound { .. }));
});

db_test!(test_rejection_reopens_case, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let employee = ActorFixtures::employee();

    let case = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    desk.lifecycle.close_case(case.id, None, &employee).await.unwrap();
    let finance = finance_of(&desk, case.id).await.unwrap();

    desk.lifecycle
        .update_finance_status(
            finance.id,
            FinanceDecision::Reject,
            Some("missing report".to_string()),
            &ActorFixtures::admin(),
            &RequestContext::default(),
        )
        .await
        .unwrap();

    let reopened = desk.cases.get(case.id, &employee).await.unwrap();
    assert_case_status(&reopened, CaseStatus::Open);
    assert_eq!(reopened.remarks.as_deref(), Some("missing report"));
    assert!(finance_of(&desk, case.id).await.is_none());
    assert!(FinancePort::list(desk.store.as_ref(), &TemporalFixtures::around_now())
        .await
        .unwrap()
        .is_empty());
});

db_test!(test_stale_review_commit_is_conflict_and_rolls_back, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let employee = ActorFixtures::employee();

    let case = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();

    // Two requests that both read the case while it was open
    let mut first = case.clone();
    first.begin_review(None, &employee).unwrap();
    let mut second = case.clone();
    second.begin_review(None, &employee).unwrap();

    let now = Utc::now();
    let finance_a = Finance::snapshot(&first, &client, &employee, now, 30).unwrap();
    let finance_b = Finance::snapshot(&second, &client, &employee, now, 30).unwrap();

    desk.store.commit_review(&first, &finance_a).await.unwrap();
    let err = desk.store.commit_review(&second, &finance_b).await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");

    let stored = finance_of(&desk, case.id).await.unwrap();
    assert_eq!(stored.id, finance_a.id);
});

db_test!(test_in_review_case_cannot_be_deleted, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let employee = ActorFixtures::employee();
    let admin = ActorFixtures::admin();

    let case = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    desk.lifecycle.close_case(case.id, None, &employee).await.unwrap();

    assert_case_conflict(desk.cases.delete(case.id, &admin).await);
    assert!(finance_of(&desk, case.id).await.is_some());

    let open = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    desk.cases.delete(open.id, &admin).await.unwrap();
});

db_test!(test_invoice_status_updates_set_paid_date, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let employee = ActorFixtures::employee();
    let admin = ActorFixtures::admin();

    let case = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    desk.lifecycle.close_case(case.id, None, &employee).await.unwrap();
    let finance = finance_of(&desk, case.id).await.unwrap();
    desk.lifecycle
        .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin, &RequestContext::default())
        .await
        .unwrap();
    let invoice = InvoicePort::find_by_case(desk.store.as_ref(), case.id).await.unwrap().unwrap();

    let paid = desk.lifecycle.update_invoice_status(invoice.id, InvoiceStatus::Paid, &admin).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(paid.paid_date.is_some());
    assert_eq!(paid.updated_by.as_deref(), Some(admin.name.as_str()));

    let unpaid = desk.lifecycle.update_invoice_status(invoice.id, InvoiceStatus::Unpaid, &admin).await.unwrap();
    assert_eq!(unpaid.status, InvoiceStatus::Unpaid);
    assert!(unpaid.paid_date.is_none());
});

// ============================================================================
// Reporting
// ============================================================================

db_test!(test_monthly_counts_and_closed_counts, |pool| {
    let desk = desk(&pool);
    let (client, hospital) = seed(&desk).await;
    let employee = ActorFixtures::employee();
    let admin = ActorFixtures::admin();

    let closed = desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    desk.cases.create(NewCaseBuilder::new(&client, &hospital).build(), &employee).await.unwrap();
    desk.lifecycle.close_case(closed.id, None, &employee).await.unwrap();
    let finance = finance_of(&desk, closed.id).await.unwrap();
    desk.lifecycle
        .update_finance_status(finance.id, FinanceDecision::Approve, None, &admin, &RequestContext::default())
        .await
        .unwrap();

    let window = TemporalFixtures::around_now();
    let months = window.month_count();
    let mut expected = vec![0; months];
    let slot = window.months().iter().position(|m| *m == MonthKey::of(Utc::now())).unwrap();

    let all = desk.reporting.monthly_counts_grouped(None, EntityKind::Clients, window).await.unwrap();
    assert_series_dense(&all, &window);
    expected[slot] = 2;
    assert_series(&all, &client.name, &expected);

    let by_hospital = desk
        .reporting
        .monthly_counts_grouped(Some(CaseStatus::Closed), EntityKind::Hospitals, window)
        .await
        .unwrap();
    expected[slot] = 1;
    assert_series(&by_hospital, &hospital.name, &expected);

    let per_user = desk.reporting.closed_case_counts_by_user(window).await.unwrap();
    assert_eq!(per_user.len(), 1);
    assert_eq!(per_user[0].created_by_id, employee.id);
    assert_eq!(per_user[0].count, 1);
});

db_test!(test_health_check_reports_healthy, |pool| {
    use core_kernel::{AdapterHealth, HealthCheckable};
    let store = PostgresCaseAdapter::new(pool.clone());
    let result = store.health_check().await;
    assert_eq!(result.status, AdapterHealth::Healthy);
    assert_eq!(result.adapter_id, "postgres-cases");
});
