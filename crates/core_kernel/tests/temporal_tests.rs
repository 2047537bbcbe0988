//! Tests for calendar ranges, month keys and query boundary parsing

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{parse_boundary, DateRange, MonthKey, RangeBound, TemporalError};
use proptest::prelude::*;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

mod date_range {
    use super::*;

    #[test]
    fn test_contains_is_inclusive_on_both_ends() {
        let range = DateRange::new(at(2024, 1, 1), at(2024, 1, 31)).unwrap();
        assert!(range.contains(at(2024, 1, 1)));
        assert!(range.contains(at(2024, 1, 31)));
        assert!(!range.contains(at(2024, 2, 1)));
    }

    #[test]
    fn test_single_instant_range_is_one_month() {
        let range = DateRange::new(at(2024, 5, 10), at(2024, 5, 10)).unwrap();
        assert_eq!(range.month_count(), 1);
    }

    #[test]
    fn test_resolve_keeps_explicit_start() {
        let range = DateRange::resolve(Some(at(2023, 1, 1)), Some(at(2023, 2, 1)), at(2024, 1, 1)).unwrap();
        assert_eq!(range.start(), at(2023, 1, 1));
        assert_eq!(range.end(), at(2023, 2, 1));
    }

    #[test]
    fn test_resolve_defaults_start_relative_to_explicit_end() {
        let range = DateRange::resolve(None, Some(at(2023, 12, 31)), at(2025, 1, 1)).unwrap();
        assert_eq!(range.start(), at(2023, 6, 30));
    }

    #[test]
    fn test_resolve_rejects_start_after_end() {
        let err = DateRange::resolve(Some(at(2024, 3, 1)), Some(at(2024, 1, 1)), at(2024, 6, 1)).unwrap_err();
        assert!(matches!(err, TemporalError::InvalidRange { .. }));
    }
}

mod month_key {
    use super::*;

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(MonthKey::new(2025, 7).unwrap().to_string(), "2025-07");
    }

    #[test]
    fn test_december_rolls_over() {
        let dec = MonthKey::new(2024, 12).unwrap();
        assert_eq!(dec.next(), MonthKey::new(2025, 1).unwrap());
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(MonthKey::new(2024, 13).is_err());
        assert!(MonthKey::new(2024, 0).is_err());
    }
}

mod boundaries {
    use super::*;

    #[test]
    fn test_rfc3339_is_taken_verbatim() {
        let parsed = parse_boundary("2024-02-10T08:30:00Z", RangeBound::End).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 2, 10, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_date_only_start_is_midnight() {
        assert_eq!(parse_boundary("2024-01-01", RangeBound::Start).unwrap(), at(2024, 1, 1));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            parse_boundary("last tuesday", RangeBound::Start),
            Err(TemporalError::Unparseable(_))
        ));
    }
}

proptest! {
    #[test]
    fn month_series_length_matches_calendar_distance(
        start_year in 2000i32..2040,
        start_month in 1u32..=12,
        span in 0u32..60,
        day in 1u32..=28,
    ) {
        let start = Utc.with_ymd_and_hms(start_year, start_month, day, 0, 0, 0).unwrap();
        let end = start + chrono::Months::new(span);
        let range = DateRange::new(start, end).unwrap();

        prop_assert_eq!(range.month_count(), span as usize + 1);
        prop_assert_eq!(range.months().len(), range.month_count());
        prop_assert_eq!(range.months().first().copied(), Some(MonthKey::of(start)));
        prop_assert_eq!(range.months().last().copied(), Some(MonthKey::of(end)));
    }
}
