//! Fiscal periods and posting rules.
//!
//! - OPEN → entries dated inside the period can be posted
//! - CLOSED → no one can post

use chrono::NaiveDate;
use erario_shared::types::FiscalPeriodId;
use serde::{Deserialize, Serialize};

use super::error::PostingError;

/// Fiscal period status controlling posting permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Period accepts postings.
    Open,
    /// Period is closed, no posting allowed.
    Closed,
}

/// An accounting period with inclusive date bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Period identifier.
    pub id: FiscalPeriodId,
    /// Display name (e.g. "2026-03").
    pub name: String,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Posting status.
    pub status: PeriodStatus,
}

impl FiscalPeriod {
    /// Creates an open period.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodRange` if `end_date` precedes `start_date`.
    pub fn open(
        id: FiscalPeriodId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, PostingError> {
        if end_date < start_date {
            return Err(PostingError::InvalidPeriodRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            start_date,
            end_date,
            status: PeriodStatus::Open,
        })
    }

    /// Returns true if `date` falls inside the period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Returns true if the period accepts postings.
    #[must_use]
    pub const fn allows_posting(&self) -> bool {
        matches!(self.status, PeriodStatus::Open)
    }

    /// Validates that an entry dated `date` can be posted here.
    ///
    /// # Errors
    ///
    /// Returns `PeriodClosed` or `DateOutsidePeriod`.
    pub fn validate_posting(&self, date: NaiveDate) -> Result<(), PostingError> {
        if !self.allows_posting() {
            return Err(PostingError::PeriodClosed(self.id));
        }
        if !self.contains(date) {
            return Err(PostingError::DateOutsidePeriod {
                date,
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn march() -> FiscalPeriod {
        FiscalPeriod::open(
            FiscalPeriodId::new(),
            "2026-03",
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        )
        .unwrap()
    }

    #[rstest]
    #[case(1)]
    #[case(15)]
    #[case(31)]
    fn test_dates_inside_accepted(#[case] day: u32) {
        let date = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        assert!(march().validate_posting(date).is_ok());
    }

    #[test]
    fn test_date_outside_rejected() {
        let period = march();
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert!(matches!(
            period.validate_posting(date),
            Err(PostingError::DateOutsidePeriod { .. })
        ));
    }

    #[test]
    fn test_closed_period_rejects_everything() {
        let mut period = march();
        period.status = PeriodStatus::Closed;
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(
            period.validate_posting(date),
            Err(PostingError::PeriodClosed(period.id))
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = FiscalPeriod::open(
            FiscalPeriodId::new(),
            "bad",
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        );
        assert!(matches!(result, Err(PostingError::InvalidPeriodRange { .. })));
    }
}
