//! Tests for typed identifiers

use core_kernel::{CaseId, ClientId, FinanceId, InvoiceId};
use uuid::Uuid;

#[test]
fn test_prefixes_are_distinct() {
    assert_eq!(CaseId::prefix(), "CASE");
    assert_eq!(FinanceId::prefix(), "FIN");
    assert_eq!(InvoiceId::prefix(), "INV");
    assert_eq!(ClientId::prefix(), "CLI");
}

#[test]
fn test_v7_ids_carry_version() {
    assert_eq!(CaseId::new_v7().as_uuid().get_version_num(), 7);
}

#[test]
fn test_uuid_round_trip() {
    let uuid = Uuid::new_v4();
    let id = InvoiceId::from(uuid);
    let back: Uuid = id.into();
    assert_eq!(uuid, back);
}

#[test]
fn test_wrong_prefix_is_rejected() {
    let finance = FinanceId::new();
    // A finance id rendered with its prefix is not a valid case id string
    assert!(finance.to_string().parse::<CaseId>().is_err());
}

#[test]
fn test_deserialize_from_bare_uuid() {
    let uuid = Uuid::new_v4();
    let id: CaseId = serde_json::from_value(serde_json::json!(uuid.to_string())).unwrap();
    assert_eq!(id.as_uuid(), &uuid);
}
