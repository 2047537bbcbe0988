//! Property-Based Test Generators
//!
//! Proptest strategies that only produce values the domain accepts.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{DateRange, Money, MonthKey};
use domain_cases::{CaseStatus, InvoiceStatus};
use domain_directory::EntityKind;
use proptest::prelude::*;

/// Non-negative amounts in minor units, up to ten million
pub fn amount_minor_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000_000_000i64
}

/// Claim amounts and case fees
pub fn money_strategy() -> impl Strategy<Value = Money> {
    amount_minor_strategy().prop_map(Money::from_minor)
}

/// Strategy for generating negative Money, rejected everywhere on input
pub fn negative_money_strategy() -> impl Strategy<Value = Money> {
    (1i64..1_000_000i64).prop_map(|minor| Money::from_minor(-minor))
}

/// Strategy for generating timestamps between 2020 and 2030
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().timestamp();
    let end = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().timestamp();
    (start..end).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

/// Strategy for generating inclusive ranges spanning up to two years
pub fn date_range_strategy() -> impl Strategy<Value = DateRange> {
    (timestamp_strategy(), 0i64..730i64).prop_map(|(start, days)| {
        DateRange::new(start, start + Duration::days(days)).unwrap()
    })
}

pub fn month_key_strategy() -> impl Strategy<Value = MonthKey> {
    (2020i32..2030i32, 1u32..=12u32).prop_map(|(year, month)| MonthKey::new(year, month).unwrap())
}

pub fn case_status_strategy() -> impl Strategy<Value = CaseStatus> {
    prop_oneof![
        Just(CaseStatus::Open),
        Just(CaseStatus::InReview),
        Just(CaseStatus::Closed),
    ]
}

pub fn invoice_status_strategy() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Pending),
        Just(InvoiceStatus::Paid),
        Just(InvoiceStatus::Unpaid),
    ]
}

pub fn entity_kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Clients),
        Just(EntityKind::Providers),
        Just(EntityKind::Hospitals),
    ]
}

/// Pairs of (from, to) case statuses, allowed or not
pub fn status_transition_strategy() -> impl Strategy<Value = (CaseStatus, CaseStatus)> {
    (case_status_strategy(), case_status_strategy())
}
