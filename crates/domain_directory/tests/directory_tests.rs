//! Integration tests for domain_directory

use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::Money;
use domain_directory::{
    Directory, DirectoryError, DirectoryService, EntityKind, EntryPatch, EntryStatus,
    FixedCaseCounts, NewEntry,
};

fn new_entry(name: &str) -> NewEntry {
    NewEntry {
        name: name.to_string(),
        region: Some("Middle East".into()),
        country: Some("UAE".into()),
        case_fee: Some(Money::new(dec!(150))),
        coverage: vec!["inpatient".into(), "outpatient".into()],
        ..Default::default()
    }
}

fn service() -> (DirectoryService, Arc<FixedCaseCounts>) {
    let counts = Arc::new(FixedCaseCounts::new());
    (DirectoryService::new(Directory::in_memory(), counts.clone()), counts)
}

// ============================================================================
// Create / update
// ============================================================================

mod crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let (service, _) = service();
        let created = service.create(EntityKind::Clients, new_entry("Acme Health")).await.unwrap();

        let fetched = service.get(EntityKind::Clients, created.id).await.unwrap();
        assert_eq!(fetched.name, "Acme Health");
        assert_eq!(fetched.case_fee, Some(Money::new(dec!(150.00))));
        assert_eq!(fetched.status, EntryStatus::Active);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (service, _) = service();
        let err = service.create(EntityKind::Providers, new_entry("   ")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let (service, _) = service();
        service.create(EntityKind::Providers, new_entry("Global Assist")).await.unwrap();

        let err = service.create(EntityKind::Providers, new_entry("Global Assist")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_same_name_allowed_in_other_collection() {
        let (service, _) = service();
        service.create(EntityKind::Clients, new_entry("Gulf Care")).await.unwrap();
        assert!(service.create(EntityKind::Hospitals, new_entry("Gulf Care")).await.is_ok());
    }

    #[tokio::test]
    async fn test_rename_to_taken_name_rejected() {
        let (service, _) = service();
        service.create(EntityKind::Clients, new_entry("Acme")).await.unwrap();
        let other = service.create(EntityKind::Clients, new_entry("Beta")).await.unwrap();

        let err = service
            .update(EntityKind::Clients, other.id, EntryPatch {
                name: Some("Acme".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_update_changes_fee() {
        let (service, _) = service();
        let created = service.create(EntityKind::Clients, new_entry("Acme")).await.unwrap();

        let updated = service
            .update(EntityKind::Clients, created.id, EntryPatch {
                case_fee: Some(Money::new(dec!(175.50))),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.case_fee, Some(Money::new(dec!(175.50))));
        assert_eq!(updated.name, "Acme");
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let (service, _) = service();
        let err = service.get(EntityKind::Hospitals, uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound { .. }));
    }
}

// ============================================================================
// Caseload and delete guard
// ============================================================================

mod caseload_tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_annotated_with_active_cases() {
        let (service, counts) = service();
        let busy = service.create(EntityKind::Hospitals, new_entry("Busy")).await.unwrap();
        service.create(EntityKind::Hospitals, new_entry("Quiet")).await.unwrap();
        counts.set(EntityKind::Hospitals, busy.id, 3).await;

        let listing = service.list(EntityKind::Hospitals).await.unwrap();
        assert_eq!(listing.len(), 2);
        for item in listing {
            let expected = if item.entry.id == busy.id { 3 } else { 0 };
            assert_eq!(item.active_cases, expected);
        }
    }

    #[tokio::test]
    async fn test_delete_blocked_by_open_case() {
        let (service, counts) = service();
        let client = service.create(EntityKind::Clients, new_entry("Acme")).await.unwrap();
        counts.set(EntityKind::Clients, client.id, 1).await;

        let err = service.delete(EntityKind::Clients, client.id).await.unwrap_err();
        assert!(matches!(err, DirectoryError::InUse { active_cases: 1, .. }));
        assert!(service.get(EntityKind::Clients, client.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_without_open_cases_succeeds() {
        let (service, _) = service();
        let client = service.create(EntityKind::Clients, new_entry("Acme")).await.unwrap();

        service.delete(EntityKind::Clients, client.id).await.unwrap();
        assert!(service.get(EntityKind::Clients, client.id).await.is_err());
    }

    #[tokio::test]
    async fn test_counts_are_scoped_by_kind() {
        let (service, counts) = service();
        let client = service.create(EntityKind::Clients, new_entry("Acme")).await.unwrap();
        // Open cases recorded against a different collection do not block
        counts.set(EntityKind::Providers, client.id, 4).await;

        assert!(service.delete(EntityKind::Clients, client.id).await.is_ok());
    }
}
