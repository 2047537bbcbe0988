//! Shared query parameters

use chrono::{DateTime, Utc};
use serde::Deserialize;

use core_kernel::{parse_boundary, DateRange, RangeBound};

use crate::error::ApiError;

/// `?startDate=&endDate=`, each RFC 3339 or `YYYY-MM-DD`
///
/// A missing end is now; a missing start is six months before the end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateRange, ApiError> {
        let start = non_empty(&self.start_date)
            .map(|s| parse_boundary(s, RangeBound::Start))
            .transpose()?;
        let end = non_empty(&self.end_date)
            .map(|s| parse_boundary(s, RangeBound::End))
            .transpose()?;
        Ok(DateRange::resolve(start, end, now)?)
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_only_bounds_cover_whole_days() {
        let query = RangeQuery {
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-03-31".to_string()),
        };
        let range = query.resolve(Utc::now()).unwrap();
        assert_eq!(range.start(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.month_count(), 3);
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap()));
    }

    #[test]
    fn test_missing_bounds_default_to_six_months() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let range = RangeQuery::default().resolve(now).unwrap();
        assert_eq!(range.end(), now);
        assert_eq!(range.start(), Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let query = RangeQuery {
            start_date: Some("2024-05-01".to_string()),
            end_date: Some("2024-01-01".to_string()),
        };
        assert!(matches!(query.resolve(Utc::now()), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_garbage_date_is_rejected() {
        let query = RangeQuery {
            start_date: Some("last tuesday".to_string()),
            end_date: None,
        };
        assert!(query.resolve(Utc::now()).is_err());
    }
}
