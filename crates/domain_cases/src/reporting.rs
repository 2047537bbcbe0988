//! Case reporting
//!
//! Reports read only the case store. Monthly counts come back from the store
//! as sparse (group, month, count) rows and are expanded here into one dense
//! series per group, one slot per calendar month of the requested range.

use std::collections::BTreeMap;
use std::sync::Arc;

use core_kernel::DateRange;

use crate::case::CaseStatus;
use crate::error::CaseError;
use crate::ports::{CasePort, ClosedCountByUser, MonthlyCount, ReportGroup};

/// Group name to per-month counts, oldest month first
pub type MonthlySeries = BTreeMap<String, Vec<u64>>;

/// Expands sparse monthly rows into zero-filled series over `range`
///
/// Only groups that appear in `rows` get a series; rows outside the range are
/// dropped.
pub fn densify(range: &DateRange, rows: &[MonthlyCount]) -> MonthlySeries {
    let months = range.months();
    let mut series = MonthlySeries::new();
    for row in rows {
        let Some(slot) = months.iter().position(|m| *m == row.month) else {
            continue;
        };
        let counts = series
            .entry(row.group.clone())
            .or_insert_with(|| vec![0; months.len()]);
        counts[slot] += row.count;
    }
    series
}

#[derive(Clone)]
pub struct ReportingService {
    cases: Arc<dyn CasePort>,
}

impl ReportingService {
    pub fn new(cases: Arc<dyn CasePort>) -> Self {
        Self { cases }
    }

    /// Cases per group and month; dated on `closedAt` for closed cases
    pub async fn monthly_counts_grouped(
        &self,
        status: Option<CaseStatus>,
        group: ReportGroup,
        range: DateRange,
    ) -> Result<MonthlySeries, CaseError> {
        let rows = self.cases.monthly_counts(status, group, &range).await?;
        Ok(densify(&range, &rows))
    }

    /// Closed cases per creator, most productive first
    pub async fn closed_case_counts_by_user(&self, range: DateRange) -> Result<Vec<ClosedCountByUser>, CaseError> {
        Ok(self.cases.closed_counts_by_user(&range).await?)
    }
}
