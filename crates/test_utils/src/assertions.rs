//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than a bare `assert_eq!`.

use core_kernel::{DateRange, Money, PortError};
use domain_cases::{Case, CaseError, CaseStatus, MonthlySeries};

/// Asserts that two Money values are equal, ignoring scale
pub fn assert_money_eq(actual: Money, expected: Money) {
    assert_eq!(
        actual.amount().normalize(),
        expected.amount().normalize(),
        "Money mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that money values sum to a total
pub fn assert_money_sum(parts: &[Money], total: Money) {
    let sum = parts
        .iter()
        .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
        .expect("Money addition overflowed");
    assert_money_eq(sum, total);
}

/// Asserts a case is in `expected` and that `closedAt` agrees with it
pub fn assert_case_status(case: &Case, expected: CaseStatus) {
    assert_eq!(
        case.status, expected,
        "Case {} is {}, expected {}",
        case.case_number, case.status, expected
    );
    assert_eq!(
        case.closed_at.is_some(),
        expected == CaseStatus::Closed,
        "Case {} has closedAt={:?} while {}",
        case.case_number,
        case.closed_at,
        case.status
    );
}

/// Asserts every series has one slot per month of `range`
pub fn assert_series_dense(series: &MonthlySeries, range: &DateRange) {
    let months = range.month_count();
    for (group, counts) in series {
        assert_eq!(
            counts.len(),
            months,
            "Series for '{}' has {} slots, expected {}",
            group,
            counts.len(),
            months
        );
    }
}

/// Asserts the series of `group` equals `expected`
pub fn assert_series(series: &MonthlySeries, group: &str, expected: &[u64]) {
    let actual = series
        .get(group)
        .unwrap_or_else(|| panic!("No series for '{}', got groups {:?}", group, series.keys().collect::<Vec<_>>()));
    assert_eq!(actual.as_slice(), expected, "Series mismatch for '{}'", group);
}

/// Asserts the result failed with a conflict
pub fn assert_case_conflict<T: std::fmt::Debug>(result: Result<T, CaseError>) -> String {
    match result {
        Err(CaseError::Conflict(message)) => message,
        other => panic!("Expected conflict, got {:?}", other),
    }
}

/// Asserts the result failed because something does not exist
pub fn assert_case_not_found<T: std::fmt::Debug>(result: Result<T, CaseError>) {
    match result {
        Err(CaseError::NotFound { .. }) => {}
        other => panic!("Expected not found, got {:?}", other),
    }
}

pub fn assert_case_validation<T: std::fmt::Debug>(result: Result<T, CaseError>) -> String {
    match result {
        Err(CaseError::Validation(message)) => message,
        other => panic!("Expected validation error, got {:?}", other),
    }
}

/// Asserts a port call failed with a conflict, returning the offending field
pub fn assert_port_conflict<T: std::fmt::Debug>(result: Result<T, PortError>) -> Option<String> {
    match result {
        Err(PortError::Conflict { field, .. }) => field,
        other => panic!("Expected port conflict, got {:?}", other),
    }
}
